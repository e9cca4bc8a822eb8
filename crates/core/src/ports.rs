//! Collaborator traits for persistence and object storage.
//!
//! The render queue and executor talk to the outside world only
//! through these seams, which keeps the queue's state machine testable
//! against in-memory implementations and the production wiring free to
//! use Postgres and S3.

use async_trait::async_trait;

use crate::document::SlideDoc;
use crate::error::{StorageError, StoreError};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// RenderStore
// ---------------------------------------------------------------------------

/// Ordered slide documents plus ownership info for one render job.
#[derive(Debug, Clone)]
pub struct RenderPlan {
    pub slideshow_id: DbId,
    pub user_id: DbId,
    /// Aspect-ratio string (e.g. `"9:16"`) the canvas geometry derives
    /// from.
    pub aspect_ratio: String,
    /// Slides in ascending index order.
    pub slides: Vec<SlideDoc>,
}

/// A slideshow found in an interrupted state by the startup scan.
#[derive(Debug, Clone)]
pub struct InterruptedRender {
    pub slideshow_id: DbId,
    pub user_id: DbId,
    pub status_id: i16,
}

/// Persistence operations the render pipeline needs. Status
/// transitions here are the only writers of the status field once a
/// render has been admitted.
#[async_trait]
pub trait RenderStore: Send + Sync {
    /// Persist the `queued` transition. Called before a job becomes
    /// visible in the in-memory queue; if this fails the job must not
    /// be enqueued.
    async fn mark_queued(&self, slideshow_id: DbId) -> Result<(), StoreError>;

    /// Persist the `rendering` transition, reset the stored frame-path
    /// list to empty (the resumability marker), and return the ordered
    /// slides to render.
    async fn begin_render(&self, slideshow_id: DbId) -> Result<RenderPlan, StoreError>;

    /// Append one output path to the stored frame-path list.
    async fn append_frame_path(&self, slideshow_id: DbId, path: &str) -> Result<(), StoreError>;

    /// Persist `completed` together with the final path list.
    async fn complete_render(&self, slideshow_id: DbId, paths: &[String])
        -> Result<(), StoreError>;

    /// Roll the status back to `draft` after a failed render so the
    /// slideshow stays user-editable.
    async fn rollback_to_draft(&self, slideshow_id: DbId) -> Result<(), StoreError>;

    /// Reset the stored frame-path list without touching the status.
    /// Used by the startup resume scan before re-admission.
    async fn reset_frame_paths(&self, slideshow_id: DbId) -> Result<(), StoreError>;

    /// Usage accounting at render completion. Callers treat this as
    /// best-effort.
    async fn increment_render_usage(&self, user_id: DbId) -> Result<(), StoreError>;

    /// All slideshows whose persisted status indicates an interrupted
    /// render (`queued` or `rendering`).
    async fn find_interrupted(&self) -> Result<Vec<InterruptedRender>, StoreError>;
}

// ---------------------------------------------------------------------------
// ObjectStore
// ---------------------------------------------------------------------------

/// Content-addressable-by-path blob store used for render output and
/// collection source assets.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// List every key under `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Delete a batch of keys. Missing keys are not an error.
    async fn delete(&self, keys: &[String]) -> Result<(), StorageError>;

    /// Client-fetchable URL for a stored object.
    fn public_url(&self, key: &str) -> String;
}
