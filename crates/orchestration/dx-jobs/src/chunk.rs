//! Order-preserving partitioning of file lists.

/// Split `items` into consecutive chunks of `chunk_size`.
///
/// The last chunk may be shorter. A `chunk_size` of zero is treated as one.
pub fn partition<T: Clone>(chunk_size: usize, items: &[T]) -> Vec<Vec<T>> {
    items.chunks(chunk_size.max(1)).map(<[T]>::to_vec).collect()
}
