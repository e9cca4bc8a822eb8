//! The render executor: one job, slide by slide.
//!
//! Each slide is composited, encoded, and uploaded before the next
//! starts, bounding memory to one in-flight frame. Per-slide failures
//! skip the slide; anything else fails the job and rolls the status
//! back to `draft`.

use image::imageops::FilterType;
use image::RgbaImage;
use slidereel_core::geometry::CanvasGeometry;
use slidereel_core::types::DbId;

use crate::best_effort;
use crate::compositor::SlideCompositor;
use crate::error::RenderError;
use crate::queue::{RenderProgress, RenderQueue};

/// Content type for uploaded frames.
const FRAME_CONTENT_TYPE: &str = "image/png";

/// Run one render job to completion.
///
/// On any error past admission the persisted status is rolled back to
/// `draft` before the error propagates to the job's waiters -- a
/// failed render must never leave a slideshow stuck.
pub(crate) async fn run_render(
    queue: &RenderQueue,
    slideshow_id: DbId,
    compositor: &dyn SlideCompositor,
) -> Result<(), RenderError> {
    match render_job(queue, slideshow_id, compositor).await {
        Ok(()) => Ok(()),
        Err(e) => {
            best_effort(
                "rollback to draft",
                queue.store.rollback_to_draft(slideshow_id),
            )
            .await;
            Err(e)
        }
    }
}

async fn render_job(
    queue: &RenderQueue,
    slideshow_id: DbId,
    compositor: &dyn SlideCompositor,
) -> Result<(), RenderError> {
    // Marks the resumability point: status `rendering`, path list
    // empty. A crash from here on is recognizable at next startup.
    let plan = queue.store.begin_render(slideshow_id).await?;
    let geometry = CanvasGeometry::from_aspect(&plan.aspect_ratio)
        .map_err(|e| RenderError::Geometry(e.to_string()))?;

    let total = plan.slides.len();
    let mut paths: Vec<String> = Vec::with_capacity(total);

    for slide in &plan.slides {
        let Some(frame) = compositor.compose(slide, &geometry).await else {
            // One bad slide must not abort the whole render.
            tracing::warn!(
                slideshow_id = %slideshow_id,
                slide_id = %slide.id,
                index = slide.index,
                "Compositor produced no canvas; skipping slide",
            );
            report(queue, slideshow_id, slide.index, &paths, total, None).await;
            continue;
        };

        let encoded = match encode_frame(frame, &geometry).await {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(
                    slideshow_id = %slideshow_id,
                    slide_id = %slide.id,
                    error = %e,
                    "Frame encode failed; skipping slide",
                );
                report(queue, slideshow_id, slide.index, &paths, total, None).await;
                continue;
            }
        };

        let key = frame_key(plan.user_id, slideshow_id, slide.id);
        if let Err(e) = queue
            .objects
            .upload(&key, encoded, FRAME_CONTENT_TYPE)
            .await
        {
            tracing::warn!(
                slideshow_id = %slideshow_id,
                slide_id = %slide.id,
                error = %e,
                "Frame upload failed; skipping slide",
            );
            report(queue, slideshow_id, slide.index, &paths, total, None).await;
            continue;
        }

        // Record the growing list as each slide lands, in slide order.
        paths.push(key.clone());
        queue.store.append_frame_path(slideshow_id, &key).await?;
        report(queue, slideshow_id, slide.index, &paths, total, Some(key)).await;
    }

    queue.store.complete_render(slideshow_id, &paths).await?;
    best_effort(
        "render usage increment",
        queue.store.increment_render_usage(plan.user_id),
    )
    .await;

    if paths.len() < total {
        tracing::warn!(
            slideshow_id = %slideshow_id,
            rendered = paths.len(),
            total,
            "Render completed with skipped slides",
        );
    }

    Ok(())
}

/// Storage key for one rendered frame.
pub fn frame_key(user_id: DbId, slideshow_id: DbId, slide_id: DbId) -> String {
    format!("{user_id}/{slideshow_id}/{slide_id}.png")
}

/// Prefix under which all of a slideshow's frames live.
pub fn frame_prefix(user_id: DbId, slideshow_id: DbId) -> String {
    format!("{user_id}/{slideshow_id}/")
}

/// Resize to the export resolution and PNG-encode on a blocking
/// thread.
async fn encode_frame(frame: RgbaImage, geometry: &CanvasGeometry) -> Result<Vec<u8>, String> {
    let (width, height) = (geometry.export_width, geometry.export_height);
    tokio::task::spawn_blocking(move || {
        let frame = if frame.dimensions() == (width, height) {
            frame
        } else {
            image::imageops::resize(&frame, width, height, FilterType::Triangle)
        };

        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(frame)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| e.to_string())?;
        Ok(buf)
    })
    .await
    .map_err(|e| e.to_string())?
}

async fn report(
    queue: &RenderQueue,
    slideshow_id: DbId,
    slide_index: i32,
    paths: &[String],
    total: usize,
    frame_path: Option<String>,
) {
    queue
        .fan_out(
            slideshow_id,
            RenderProgress {
                slideshow_id,
                slide_index,
                completed: paths.len(),
                total,
                frame_path,
            },
        )
        .await;
}
