//! Slideshow document models.
//!
//! [`GeneratedSlideshow`] is the document produced by the constrained
//! generation phase (token references before materialization, image
//! URLs after). [`SlideDoc`] and friends are the render-facing slide
//! documents assembled by the persistence layer and consumed by the
//! compositor.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

// ---------------------------------------------------------------------------
// Generated documents
// ---------------------------------------------------------------------------

/// Document emitted by the generation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSlideshow {
    pub caption: String,
    pub slides: Vec<GeneratedSlide>,
}

/// One generated slide.
///
/// `background_image_ref` holds a reference token (`c01`, ...) until
/// materialization replaces it with a client-fetchable URL and fills
/// `background_image_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSlide {
    pub background_image_ref: String,
    #[serde(default)]
    pub background_image_id: Option<DbId>,
    #[serde(default)]
    pub texts: Vec<GeneratedText>,
    #[serde(default)]
    pub overlays: Vec<GeneratedOverlay>,
}

/// A generated text overlay. Positions are center-anchored editor
/// coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedText {
    pub text: String,
    pub position_x: f64,
    pub position_y: f64,
    /// Font size; must be one of the enumerated tiers after repair.
    pub size: f64,
}

/// A generated image overlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedOverlay {
    pub image_ref: String,
    #[serde(default)]
    pub image_id: Option<DbId>,
    pub position_x: f64,
    pub position_y: f64,
    #[serde(default)]
    pub rotation: f64,
    /// Size as a percentage of the overlay's natural dimensions.
    pub size: f64,
}

// ---------------------------------------------------------------------------
// Render-facing documents
// ---------------------------------------------------------------------------

/// Where an asset's bytes can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLocation {
    /// Key in the service's own object store (owned user uploads).
    StorageKey(String),
    /// Publicly hosted URL (catalog images).
    Hosted(String),
}

/// A fully-loaded slide ready for compositing, ordered by `index`
/// within its slideshow.
#[derive(Debug, Clone)]
pub struct SlideDoc {
    pub id: DbId,
    pub index: i32,
    pub duration_secs: f64,
    pub background: Option<AssetLocation>,
    pub texts: Vec<TextDoc>,
    pub overlays: Vec<OverlayDoc>,
}

#[derive(Debug, Clone)]
pub struct TextDoc {
    pub content: String,
    pub position_x: f64,
    pub position_y: f64,
    pub font_size: u32,
    pub rotation_degs: f64,
    pub font_family: String,
}

#[derive(Debug, Clone)]
pub struct OverlayDoc {
    pub image: Option<AssetLocation>,
    pub position_x: f64,
    pub position_y: f64,
    pub rotation_degs: f64,
    pub size_pct: f64,
}
