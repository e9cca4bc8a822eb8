//! Slideshow entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use slidereel_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `slideshows` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Slideshow {
    pub id: DbId,
    pub user_id: DbId,
    pub caption: String,
    pub aspect_ratio: String,
    pub status_id: StatusId,
    /// Output frame keys, appended in slide order during a render.
    /// Reset to empty whenever a new render starts; equals the slide
    /// count only at `completed`.
    pub frame_paths: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a slideshow via `POST /api/v1/slideshows`.
#[derive(Debug, Deserialize)]
pub struct CreateSlideshow {
    #[serde(default)]
    pub caption: String,
    /// Aspect ratio string like `"9:16"`. Defaults to portrait.
    pub aspect_ratio: Option<String>,
}
