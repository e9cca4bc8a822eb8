//! Example-slideshow context rows consumed by the planning tools.

use serde::Serialize;
use sqlx::FromRow;
use slidereel_core::types::{DbId, Timestamp};

/// A row from the `example_slideshows` table. Read-only context the
/// planning phase can pull in via tools.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExampleSlideshow {
    pub id: DbId,
    pub industry: String,
    pub product_type: String,
    pub summary: String,
    /// Full frame sequence as stored (opaque JSON).
    pub frames: serde_json::Value,
    pub created_at: Timestamp,
}
