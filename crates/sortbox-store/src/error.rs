/// Errors that can occur while building or storing cells.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The content buffer for a new cell could not be allocated.
    #[error("out of memory allocating a {requested}-byte cell")]
    OutOfMemory { requested: usize },
}

pub type Result<T> = std::result::Result<T, StoreError>;
