use chainstore::StoreError;

/// Unified error type for the explorer crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExplorerError {
    /// A required request parameter was absent or blank.
    #[error("missing parameter: {0}")]
    MissingParameter(String),
    /// A position beyond the current count. Reads in this crate clamp
    /// positions rather than raise it; embedders' backends may, and the API
    /// serves it as `not_found`.
    #[error("out of range: {0}")]
    OutOfRange(String),
    /// A stored record could not be decoded.
    #[error("decode failure: {0}")]
    DecodeFailure(String),
    /// The parent has no children indexed yet.
    #[error("parent not indexed: {0}")]
    ParentNotIndexed(String),
    /// Storage or network is down.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("search term is empty")]
    EmptySearchTerm,
    #[error("timed out after {0} ms")]
    Timeout(u64),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ExplorerError {
    /// Errors that mean "no data at this position yet" rather than a failure.
    pub fn is_empty_result(&self) -> bool {
        matches!(
            self,
            ExplorerError::NotFound(_)
                | ExplorerError::OutOfRange(_)
                | ExplorerError::ParentNotIndexed(_)
        )
    }
}

impl From<StoreError> for ExplorerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(msg) => ExplorerError::NotFound(msg),
            StoreError::Decode(msg) => ExplorerError::DecodeFailure(msg),
            StoreError::EmptySearchTerm => ExplorerError::EmptySearchTerm,
            StoreError::InvalidInput(msg) => ExplorerError::InvalidInput(msg),
            StoreError::Io(err) => ExplorerError::BackendUnavailable(err.to_string()),
            StoreError::Write(msg) | StoreError::Serialization(msg) | StoreError::Internal(msg) => {
                ExplorerError::Internal(msg)
            }
        }
    }
}

/// Result type alias using [`ExplorerError`].
pub type ExplorerResult<T> = Result<T, ExplorerError>;
