//! Startup resume protocol.
//!
//! Runs once when the process boots, before the HTTP surface accepts
//! renders. Slideshows stuck in `rendering` were interrupted mid-job:
//! their partial output objects cannot be trusted, so they are deleted
//! and the path list reset before re-admission. Slideshows stuck in
//! `queued` died between admission and dequeue: nothing was written,
//! so they re-admit directly. Both groups merge into one resume set
//! the caller re-admits (and can surface as a "Resuming render"
//! notice).

use std::sync::Arc;

use slidereel_core::lifecycle::{resume_action, ResumeAction};
use slidereel_core::ports::{ObjectStore, RenderStore};
use slidereel_core::types::DbId;

use crate::error::RenderError;
use crate::executor::frame_prefix;

/// One interrupted slideshow scheduled for re-admission.
#[derive(Debug, Clone)]
pub struct ResumeJob {
    pub slideshow_id: DbId,
    pub user_id: DbId,
    /// Partial output objects deleted before re-admission (only
    /// non-zero for jobs interrupted mid-render).
    pub purged_objects: usize,
}

/// Scan persisted statuses for interrupted renders, purge untrusted
/// partial output, and return the merged resume set.
pub async fn collect_interrupted(
    store: &Arc<dyn RenderStore>,
    objects: &Arc<dyn ObjectStore>,
) -> Result<Vec<ResumeJob>, RenderError> {
    let interrupted = store.find_interrupted().await?;
    let mut jobs = Vec::new();

    for item in interrupted {
        let purged_objects = match resume_action(item.status_id) {
            ResumeAction::PurgeAndRequeue => {
                let prefix = frame_prefix(item.user_id, item.slideshow_id);
                let keys = objects.list(&prefix).await?;
                if !keys.is_empty() {
                    objects.delete(&keys).await?;
                }
                store.reset_frame_paths(item.slideshow_id).await?;
                tracing::info!(
                    slideshow_id = %item.slideshow_id,
                    purged = keys.len(),
                    "Purged partial render output before resume",
                );
                keys.len()
            }
            ResumeAction::Requeue => 0,
            ResumeAction::Ignore => continue,
        };

        jobs.push(ResumeJob {
            slideshow_id: item.slideshow_id,
            user_id: item.user_id,
            purged_objects,
        });
    }

    if !jobs.is_empty() {
        tracing::info!(count = jobs.len(), "Resuming interrupted renders");
    }

    Ok(jobs)
}
