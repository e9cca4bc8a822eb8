//! Slide, text-overlay, and image-overlay entity models.

use serde::Serialize;
use sqlx::FromRow;
use slidereel_core::types::{DbId, Timestamp};

/// A row from the `slides` table. `idx` is dense, zero-based, and
/// unique within a slideshow; deletions renumber the remainder.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Slide {
    pub id: DbId,
    pub slideshow_id: DbId,
    pub idx: i32,
    pub duration_secs: f64,
    pub background_image_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// A row from the `slide_texts` table. Positions are center-anchored
/// editor coordinates; `font_size` belongs to the enumerated tier set.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SlideText {
    pub id: DbId,
    pub slide_id: DbId,
    pub ordinal: i32,
    pub content: String,
    pub position_x: f64,
    pub position_y: f64,
    pub font_size: i32,
    pub rotation_degs: f64,
    pub font_family: String,
}

/// A row from the `slide_overlays` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SlideOverlay {
    pub id: DbId,
    pub slide_id: DbId,
    pub ordinal: i32,
    pub image_id: Option<DbId>,
    pub position_x: f64,
    pub position_y: f64,
    pub rotation_degs: f64,
    pub size_pct: f64,
}
