//! Dataset transport over a local mirror directory.
//!
//! The mirror holds dataset files flat in one directory, as the remote
//! source publishes them. Listing selects files by the prefixes a
//! [`Subset`](dx_types::Subset) expands to; downloading copies a file into
//! the data directory unless it is already there.

mod transport;

pub use transport::LocalTransport;
