//! The slidereel render pipeline: a serialized, resumable,
//! crash-recoverable frame-rendering queue.
//!
//! [`RenderQueue`] admits per-slideshow jobs, coalesces duplicate
//! admissions, and drains them one at a time through the executor,
//! which composites, encodes, and uploads each slide frame in order.
//! The startup resume scan in [`resume`] recovers jobs interrupted by
//! a crash.

use std::future::Future;

pub mod compositor;
pub mod error;
pub mod executor;
pub mod queue;
pub mod resume;

pub use compositor::{BasicCompositor, SlideCompositor};
pub use error::RenderError;
pub use queue::{RenderProgress, RenderQueue};
pub use resume::{collect_interrupted, ResumeJob};

/// Run a fallible operation whose failure must not propagate, logging
/// instead. Marks every intentionally-ignored failure path visibly.
pub async fn best_effort<T, E>(
    operation: &str,
    fut: impl Future<Output = Result<T, E>>,
) -> Option<T>
where
    E: std::fmt::Display,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(operation, error = %e, "Best-effort operation failed");
            None
        }
    }
}
