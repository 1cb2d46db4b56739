//! NDJSON table reader.
//!
//! Each non-empty line of a file is one record. Files ending in `.gz` or
//! `.gzip` are first decompressed into a temporary table next to the source
//! (or into a configured directory); [`TableReader::remove`] deletes it.
//!
//! # Example
//!
//! ```ignore
//! use dx_reader_ndjson::NdjsonTableReader;
//! use dx_traits::TableReader;
//!
//! let reader = NdjsonTableReader::new();
//! let table = reader.load(Path::new("data/BIRJ2204.ndjson.gz")).await?;
//! println!("{} records, {} fields", table.record_count, table.fields.len());
//! reader.remove(Path::new("data/BIRJ2204.ndjson.gz")).await?;
//! ```
//!
//! [`TableReader::remove`]: dx_traits::TableReader::remove

mod reader;

pub use reader::{Compression, NdjsonTableReader};
