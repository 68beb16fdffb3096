use sharecenter_types::CenterError;
use thiserror::Error;

/// Failure of a persistence backend. The center never inspects these beyond
/// reporting them; every variant surfaces as `STORAGE_FAILURE`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record the ledger expected to find is missing from the backend.
    #[error("record missing from store: {0}")]
    NotFound(String),

    #[error("store backend failed: {0}")]
    Backend(String),

    /// A stored record could not be encoded or decoded.
    #[error("record encoding failed: {0}")]
    Serialization(String),
}

impl From<StoreError> for CenterError {
    fn from(e: StoreError) -> Self {
        CenterError::Storage(e.to_string())
    }
}
