use slidereel_core::error::{StorageError, StoreError};

/// Errors from the render queue and executor.
///
/// `Clone` because a single job outcome fans out to every coalesced
/// waiter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    /// Persisting the `queued` transition failed; the job was never
    /// enqueued.
    #[error("Failed to admit render job: {0}")]
    Admission(String),

    /// A persistence call failed mid-render. Fatal for the job; status
    /// is rolled back to draft.
    #[error("Persistence error: {0}")]
    Store(String),

    /// An object-storage call failed outside the per-slide skip scope.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The render geometry could not be derived.
    #[error("Invalid render geometry: {0}")]
    Geometry(String),

    /// The drain worker dropped the job without reporting an outcome.
    #[error("Render worker terminated unexpectedly")]
    WorkerGone,
}

impl From<StoreError> for RenderError {
    fn from(e: StoreError) -> Self {
        RenderError::Store(e.to_string())
    }
}

impl From<StorageError> for RenderError {
    fn from(e: StorageError) -> Self {
        RenderError::Storage(e.to_string())
    }
}
