//! In-memory test doubles for the render pipeline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgba, RgbaImage};

use slidereel_core::document::SlideDoc;
use slidereel_core::error::StoreError;
use slidereel_core::geometry::CanvasGeometry;
use slidereel_core::lifecycle::{STATUS_DRAFT, STATUS_QUEUED, STATUS_RENDERING};
use slidereel_core::ports::{InterruptedRender, RenderPlan, RenderStore};
use slidereel_core::types::DbId;
use slidereel_render::SlideCompositor;

// ---------------------------------------------------------------------------
// MemoryRenderStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MemorySlideshow {
    pub user_id: DbId,
    pub status_id: i16,
    pub aspect_ratio: String,
    pub frame_paths: Vec<String>,
    pub slides: Vec<SlideDoc>,
}

/// `RenderStore` backed by process-local maps, with failure toggles
/// for exercising the queue's error paths.
#[derive(Default)]
pub struct MemoryRenderStore {
    slideshows: Mutex<HashMap<DbId, MemorySlideshow>>,
    begin_order: Mutex<Vec<DbId>>,
    usage: Mutex<HashMap<DbId, u64>>,
    pub fail_mark_queued: AtomicBool,
    pub fail_append: AtomicBool,
}

impl MemoryRenderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_slideshow(
        &self,
        user_id: DbId,
        aspect_ratio: &str,
        slide_count: usize,
        status_id: i16,
    ) -> DbId {
        let id = uuid::Uuid::new_v4();
        let slides = (0..slide_count).map(|i| make_slide(i as i32)).collect();
        self.slideshows.lock().unwrap().insert(
            id,
            MemorySlideshow {
                user_id,
                status_id,
                aspect_ratio: aspect_ratio.to_string(),
                frame_paths: Vec::new(),
                slides,
            },
        );
        id
    }

    pub fn slideshow(&self, id: DbId) -> MemorySlideshow {
        self.slideshows.lock().unwrap()[&id].clone()
    }

    pub fn set_frame_paths(&self, id: DbId, paths: Vec<String>) {
        self.slideshows
            .lock()
            .unwrap()
            .get_mut(&id)
            .unwrap()
            .frame_paths = paths;
    }

    pub fn begin_order(&self) -> Vec<DbId> {
        self.begin_order.lock().unwrap().clone()
    }

    pub fn usage_count(&self, user_id: DbId) -> u64 {
        self.usage.lock().unwrap().get(&user_id).copied().unwrap_or(0)
    }
}

pub fn make_slide(index: i32) -> SlideDoc {
    SlideDoc {
        id: uuid::Uuid::new_v4(),
        index,
        duration_secs: 3.0,
        background: None,
        texts: Vec::new(),
        overlays: Vec::new(),
    }
}

fn forced(what: &str) -> StoreError {
    StoreError::Database(format!("forced {what} failure"))
}

#[async_trait]
impl RenderStore for MemoryRenderStore {
    async fn mark_queued(&self, slideshow_id: DbId) -> Result<(), StoreError> {
        if self.fail_mark_queued.load(Ordering::SeqCst) {
            return Err(forced("mark_queued"));
        }
        let mut slideshows = self.slideshows.lock().unwrap();
        let slideshow = slideshows.get_mut(&slideshow_id).ok_or(StoreError::NotFound {
            entity: "slideshow",
            id: slideshow_id,
        })?;
        slideshow.status_id = STATUS_QUEUED;
        Ok(())
    }

    async fn begin_render(&self, slideshow_id: DbId) -> Result<RenderPlan, StoreError> {
        self.begin_order.lock().unwrap().push(slideshow_id);
        let mut slideshows = self.slideshows.lock().unwrap();
        let slideshow = slideshows.get_mut(&slideshow_id).ok_or(StoreError::NotFound {
            entity: "slideshow",
            id: slideshow_id,
        })?;
        slideshow.status_id = STATUS_RENDERING;
        slideshow.frame_paths.clear();
        Ok(RenderPlan {
            slideshow_id,
            user_id: slideshow.user_id,
            aspect_ratio: slideshow.aspect_ratio.clone(),
            slides: slideshow.slides.clone(),
        })
    }

    async fn append_frame_path(&self, slideshow_id: DbId, path: &str) -> Result<(), StoreError> {
        if self.fail_append.load(Ordering::SeqCst) {
            return Err(forced("append_frame_path"));
        }
        let mut slideshows = self.slideshows.lock().unwrap();
        if let Some(slideshow) = slideshows.get_mut(&slideshow_id) {
            slideshow.frame_paths.push(path.to_string());
        }
        Ok(())
    }

    async fn complete_render(
        &self,
        slideshow_id: DbId,
        paths: &[String],
    ) -> Result<(), StoreError> {
        let mut slideshows = self.slideshows.lock().unwrap();
        if let Some(slideshow) = slideshows.get_mut(&slideshow_id) {
            slideshow.status_id = slidereel_core::lifecycle::STATUS_COMPLETED;
            slideshow.frame_paths = paths.to_vec();
        }
        Ok(())
    }

    async fn rollback_to_draft(&self, slideshow_id: DbId) -> Result<(), StoreError> {
        let mut slideshows = self.slideshows.lock().unwrap();
        if let Some(slideshow) = slideshows.get_mut(&slideshow_id) {
            slideshow.status_id = STATUS_DRAFT;
        }
        Ok(())
    }

    async fn reset_frame_paths(&self, slideshow_id: DbId) -> Result<(), StoreError> {
        let mut slideshows = self.slideshows.lock().unwrap();
        if let Some(slideshow) = slideshows.get_mut(&slideshow_id) {
            slideshow.frame_paths.clear();
        }
        Ok(())
    }

    async fn increment_render_usage(&self, user_id: DbId) -> Result<(), StoreError> {
        *self.usage.lock().unwrap().entry(user_id).or_insert(0) += 1;
        Ok(())
    }

    async fn find_interrupted(&self) -> Result<Vec<InterruptedRender>, StoreError> {
        Ok(self
            .slideshows
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s)| s.status_id == STATUS_QUEUED || s.status_id == STATUS_RENDERING)
            .map(|(id, s)| InterruptedRender {
                slideshow_id: *id,
                user_id: s.user_id,
                status_id: s.status_id,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// ScriptedCompositor
// ---------------------------------------------------------------------------

/// Compositor that yields a tiny solid frame, failing on configured
/// slide indices.
pub struct ScriptedCompositor {
    pub fail_indices: Vec<i32>,
    pub delay: Duration,
}

impl ScriptedCompositor {
    pub fn ok() -> Self {
        Self {
            fail_indices: Vec::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn failing_on(indices: &[i32]) -> Self {
        Self {
            fail_indices: indices.to_vec(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(delay: Duration) -> Self {
        Self {
            fail_indices: Vec::new(),
            delay,
        }
    }
}

#[async_trait]
impl SlideCompositor for ScriptedCompositor {
    async fn compose(&self, slide: &SlideDoc, _geometry: &CanvasGeometry) -> Option<RgbaImage> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_indices.contains(&slide.index) {
            None
        } else {
            Some(RgbaImage::from_pixel(8, 8, Rgba([200, 120, 40, 255])))
        }
    }
}
