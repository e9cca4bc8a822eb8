//! Postgres-backed implementation of the core `RenderStore` trait.
//!
//! Composes the slideshow/slide/image repositories into the seam the
//! render queue and executor consume. Database errors are stringified
//! at this boundary.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use slidereel_core::document::{AssetLocation, OverlayDoc, SlideDoc, TextDoc};
use slidereel_core::error::StoreError;
use slidereel_core::ports::{InterruptedRender, RenderPlan, RenderStore};
use slidereel_core::types::DbId;

use crate::models::image::ImageAsset;
use crate::models::status::SlideshowStatus;
use crate::repositories::slide_repo::LoadedSlide;
use crate::repositories::slideshow_repo::TransitionError;
use crate::repositories::{ImageRepo, SlideRepo, SlideshowRepo, UsageRepo};

/// `RenderStore` over a Postgres pool.
pub struct PgRenderStore {
    pool: PgPool,
}

impl PgRenderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn transition(
        &self,
        slideshow_id: DbId,
        to: SlideshowStatus,
    ) -> Result<(), StoreError> {
        match SlideshowRepo::transition_status(&self.pool, slideshow_id, to).await {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(StoreError::NotFound {
                entity: "slideshow",
                id: slideshow_id,
            }),
            Err(TransitionError::Invalid(msg)) => Err(StoreError::Database(msg)),
            Err(TransitionError::Database(e)) => Err(StoreError::Database(e.to_string())),
        }
    }

    /// Resolve the asset locations referenced by a set of loaded
    /// slides in one query.
    async fn load_asset_locations(
        &self,
        slides: &[LoadedSlide],
    ) -> Result<HashMap<DbId, AssetLocation>, StoreError> {
        let mut ids: Vec<DbId> = Vec::new();
        for loaded in slides {
            ids.extend(loaded.slide.background_image_id);
            ids.extend(loaded.overlays.iter().filter_map(|o| o.image_id));
        }
        ids.sort_unstable();
        ids.dedup();

        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let assets: Vec<ImageAsset> = sqlx::query_as(
            "SELECT id, owner_id, kind, storage_path, hosted_url, brief, category, \
                    object_tags, long_description, created_at \
             FROM image_assets WHERE id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(assets
            .into_iter()
            .filter_map(|asset| asset_location(&asset).map(|loc| (asset.id, loc)))
            .collect())
    }
}

/// Owned assets resolve to their object-store key; ownerless catalog
/// assets to their hosted URL.
fn asset_location(asset: &ImageAsset) -> Option<AssetLocation> {
    if asset.owner_id.is_some() {
        asset.storage_path.clone().map(AssetLocation::StorageKey)
    } else {
        asset.hosted_url.clone().map(AssetLocation::Hosted)
    }
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

#[async_trait]
impl RenderStore for PgRenderStore {
    async fn mark_queued(&self, slideshow_id: DbId) -> Result<(), StoreError> {
        self.transition(slideshow_id, SlideshowStatus::Queued).await
    }

    async fn begin_render(&self, slideshow_id: DbId) -> Result<RenderPlan, StoreError> {
        let slideshow = SlideshowRepo::find_by_id(&self.pool, slideshow_id)
            .await
            .map_err(db_err)?
            .ok_or(StoreError::NotFound {
                entity: "slideshow",
                id: slideshow_id,
            })?;

        self.transition(slideshow_id, SlideshowStatus::Rendering)
            .await?;
        SlideshowRepo::reset_frame_paths(&self.pool, slideshow_id)
            .await
            .map_err(db_err)?;

        let loaded = SlideRepo::load_for_slideshow(&self.pool, slideshow_id)
            .await
            .map_err(db_err)?;
        let locations = self.load_asset_locations(&loaded).await?;

        let slides = loaded
            .into_iter()
            .map(|loaded| SlideDoc {
                id: loaded.slide.id,
                index: loaded.slide.idx,
                duration_secs: loaded.slide.duration_secs,
                background: loaded
                    .slide
                    .background_image_id
                    .and_then(|id| locations.get(&id).cloned()),
                texts: loaded
                    .texts
                    .into_iter()
                    .map(|t| TextDoc {
                        content: t.content,
                        position_x: t.position_x,
                        position_y: t.position_y,
                        font_size: t.font_size as u32,
                        rotation_degs: t.rotation_degs,
                        font_family: t.font_family,
                    })
                    .collect(),
                overlays: loaded
                    .overlays
                    .into_iter()
                    .map(|o| OverlayDoc {
                        image: o.image_id.and_then(|id| locations.get(&id).cloned()),
                        position_x: o.position_x,
                        position_y: o.position_y,
                        rotation_degs: o.rotation_degs,
                        size_pct: o.size_pct,
                    })
                    .collect(),
            })
            .collect();

        Ok(RenderPlan {
            slideshow_id,
            user_id: slideshow.user_id,
            aspect_ratio: slideshow.aspect_ratio,
            slides,
        })
    }

    async fn append_frame_path(&self, slideshow_id: DbId, path: &str) -> Result<(), StoreError> {
        SlideshowRepo::append_frame_path(&self.pool, slideshow_id, path)
            .await
            .map_err(db_err)
    }

    async fn complete_render(
        &self,
        slideshow_id: DbId,
        paths: &[String],
    ) -> Result<(), StoreError> {
        SlideshowRepo::complete(&self.pool, slideshow_id, paths)
            .await
            .map_err(db_err)
    }

    async fn rollback_to_draft(&self, slideshow_id: DbId) -> Result<(), StoreError> {
        self.transition(slideshow_id, SlideshowStatus::Draft).await
    }

    async fn reset_frame_paths(&self, slideshow_id: DbId) -> Result<(), StoreError> {
        SlideshowRepo::reset_frame_paths(&self.pool, slideshow_id)
            .await
            .map_err(db_err)
    }

    async fn increment_render_usage(&self, user_id: DbId) -> Result<(), StoreError> {
        UsageRepo::increment_renders(&self.pool, user_id)
            .await
            .map_err(db_err)
    }

    async fn find_interrupted(&self) -> Result<Vec<InterruptedRender>, StoreError> {
        let rows = SlideshowRepo::find_interrupted(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows
            .into_iter()
            .map(|(slideshow_id, user_id, status_id)| InterruptedRender {
                slideshow_id,
                user_id,
                status_id,
            })
            .collect())
    }
}
