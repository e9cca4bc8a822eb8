//! Compositor seam.
//!
//! The pixel-exact canvas algorithm is a collaborator, not part of
//! this crate's contract: the executor only needs `compose` to yield a
//! frame or nothing. [`BasicCompositor`] is the default
//! implementation -- background fetch/decode/cover plus scaled image
//! overlays. Text rasterization is left to richer compositors behind
//! the same trait.

use std::sync::Arc;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::{imageops, DynamicImage, Rgba, RgbaImage};
use slidereel_core::document::{AssetLocation, SlideDoc};
use slidereel_core::geometry::CanvasGeometry;
use slidereel_core::ports::ObjectStore;

/// Canvas fill used when a slide has no background image.
const CANVAS_FILL: Rgba<u8> = Rgba([24, 24, 28, 255]);

/// Produces the composited canvas for one slide.
#[async_trait]
pub trait SlideCompositor: Send + Sync {
    /// `None` means the slide cannot be composited; the render skips
    /// it and continues.
    async fn compose(&self, slide: &SlideDoc, geometry: &CanvasGeometry) -> Option<RgbaImage>;
}

/// Default compositor: covers the canvas with the slide background and
/// pastes scaled product overlays.
pub struct BasicCompositor {
    objects: Arc<dyn ObjectStore>,
    http: reqwest::Client,
}

impl BasicCompositor {
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        Self {
            objects,
            http: reqwest::Client::new(),
        }
    }

    /// Fetch an asset's bytes from wherever it lives.
    async fn fetch(&self, location: &AssetLocation) -> Option<Vec<u8>> {
        match location {
            AssetLocation::StorageKey(key) => match self.objects.download(key).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    tracing::warn!(key, error = %e, "Background fetch from storage failed");
                    None
                }
            },
            AssetLocation::Hosted(url) => {
                let response = self.http.get(url).send().await.ok()?;
                if !response.status().is_success() {
                    tracing::warn!(url, status = %response.status(), "Hosted asset fetch failed");
                    return None;
                }
                response.bytes().await.ok().map(|b| b.to_vec())
            }
        }
    }

    async fn decode(&self, location: &AssetLocation) -> Option<DynamicImage> {
        let bytes = self.fetch(location).await?;
        match image::load_from_memory(&bytes) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(error = %e, "Asset decode failed");
                None
            }
        }
    }
}

#[async_trait]
impl SlideCompositor for BasicCompositor {
    async fn compose(&self, slide: &SlideDoc, geometry: &CanvasGeometry) -> Option<RgbaImage> {
        let (width, height) = (geometry.export_width, geometry.export_height);
        let mut canvas = RgbaImage::from_pixel(width, height, CANVAS_FILL);

        if let Some(location) = &slide.background {
            // A slide with an unfetchable background cannot be
            // composited meaningfully; let the executor skip it.
            let background = self.decode(location).await?;
            let covered = background.resize_to_fill(width, height, FilterType::Triangle);
            imageops::overlay(&mut canvas, &covered.to_rgba8(), 0, 0);
        }

        // Editor coordinates scale up to export coordinates.
        let scale = width as f64 / geometry.width as f64;

        for overlay in &slide.overlays {
            let Some(location) = &overlay.image else {
                continue;
            };
            // Overlay failures degrade the frame, not the render.
            let Some(decoded) = self.decode(location).await else {
                continue;
            };

            let target_w =
                ((width as f64) * overlay.size_pct / 100.0).round().max(1.0) as u32;
            let scaled = decoded.resize(target_w, height, FilterType::Triangle);
            let (ow, oh) = (scaled.width() as i64, scaled.height() as i64);

            let center_x = (overlay.position_x * scale).round() as i64;
            let center_y = (overlay.position_y * scale).round() as i64;
            imageops::overlay(
                &mut canvas,
                &scaled.to_rgba8(),
                center_x - ow / 2,
                center_y - oh / 2,
            );
        }

        Some(canvas)
    }
}
