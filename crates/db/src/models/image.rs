//! Image asset entity model.

use serde::Serialize;
use sqlx::FromRow;
use slidereel_core::types::{DbId, Timestamp};

/// Background-eligible kind value.
pub const KIND_COLLECTION: &str = "collection";

/// Overlay-eligible kind value.
pub const KIND_PRODUCT: &str = "product";

/// A row from the `image_assets` table.
///
/// `owner_id` is the ownership marker: owned images live in the
/// service's object store under `storage_path`; catalog images with no
/// owner are fetched from `hosted_url`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ImageAsset {
    pub id: DbId,
    pub owner_id: Option<DbId>,
    pub kind: String,
    pub storage_path: Option<String>,
    pub hosted_url: Option<String>,
    pub brief: String,
    pub category: Option<String>,
    pub object_tags: Vec<String>,
    pub long_description: Option<String>,
    pub created_at: Timestamp,
}
