//! Repository for the `image_assets` table.

use sqlx::PgPool;
use slidereel_core::types::DbId;

use crate::models::image::{ImageAsset, KIND_COLLECTION, KIND_PRODUCT};

/// Column list for `image_assets` queries.
const COLUMNS: &str = "\
    id, owner_id, kind, storage_path, hosted_url, brief, category, \
    object_tags, long_description, created_at";

/// Maximum candidates returned per pool.
const POOL_LIMIT: i64 = 99;

/// Provides reads over candidate image pools and briefs.
pub struct ImageRepo;

impl ImageRepo {
    /// Background-eligible candidates for a user: their own collection
    /// images plus ownerless catalog images, oldest first so tokens
    /// stay stable across a session.
    pub async fn list_backgrounds(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<ImageAsset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM image_assets \
             WHERE kind = $1 AND (owner_id = $2 OR owner_id IS NULL) \
             ORDER BY created_at ASC \
             LIMIT $3"
        );
        sqlx::query_as::<_, ImageAsset>(&query)
            .bind(KIND_COLLECTION)
            .bind(user_id)
            .bind(POOL_LIMIT)
            .fetch_all(pool)
            .await
    }

    /// Overlay-eligible candidates: the user's product images.
    pub async fn list_products(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<ImageAsset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM image_assets \
             WHERE kind = $1 AND owner_id = $2 \
             ORDER BY created_at ASC \
             LIMIT $3"
        );
        sqlx::query_as::<_, ImageAsset>(&query)
            .bind(KIND_PRODUCT)
            .bind(user_id)
            .bind(POOL_LIMIT)
            .fetch_all(pool)
            .await
    }

    /// Briefs visible to a user, optionally filtered by category and/or
    /// object tag. Serves the planning phase's brief-listing tool.
    pub async fn list_briefs(
        pool: &PgPool,
        user_id: DbId,
        category: Option<&str>,
        object_tag: Option<&str>,
    ) -> Result<Vec<ImageAsset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM image_assets \
             WHERE (owner_id = $1 OR owner_id IS NULL) \
               AND ($2::TEXT IS NULL OR category = $2) \
               AND ($3::TEXT IS NULL OR $3 = ANY(object_tags)) \
             ORDER BY created_at ASC \
             LIMIT $4"
        );
        sqlx::query_as::<_, ImageAsset>(&query)
            .bind(user_id)
            .bind(category)
            .bind(object_tag)
            .bind(POOL_LIMIT)
            .fetch_all(pool)
            .await
    }

    /// Fetch a single asset by id.
    pub async fn find_by_id(
        pool: &PgPool,
        image_id: DbId,
    ) -> Result<Option<ImageAsset>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM image_assets WHERE id = $1");
        sqlx::query_as::<_, ImageAsset>(&query)
            .bind(image_id)
            .fetch_optional(pool)
            .await
    }
}
