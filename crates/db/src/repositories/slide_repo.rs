//! Repository for the `slides`, `slide_texts`, and `slide_overlays`
//! tables.

use std::collections::HashMap;

use sqlx::PgPool;
use slidereel_core::error::CoreError;
use slidereel_core::types::DbId;

use crate::models::slide::{Slide, SlideOverlay, SlideText};

/// Column list for `slides` queries.
const SLIDE_COLUMNS: &str = "\
    id, slideshow_id, idx, duration_secs, background_image_id, created_at";

/// Column list for `slide_texts` queries.
const TEXT_COLUMNS: &str = "\
    id, slide_id, ordinal, content, position_x, position_y, \
    font_size, rotation_degs, font_family";

/// Column list for `slide_overlays` queries.
const OVERLAY_COLUMNS: &str = "\
    id, slide_id, ordinal, image_id, position_x, position_y, \
    rotation_degs, size_pct";

/// A slide with its ordered text and image overlays.
#[derive(Debug, Clone)]
pub struct LoadedSlide {
    pub slide: Slide,
    pub texts: Vec<SlideText>,
    pub overlays: Vec<SlideOverlay>,
}

/// Provides CRUD operations for slides and their overlays.
pub struct SlideRepo;

impl SlideRepo {
    /// Load a slideshow's slides in index order, with texts and
    /// overlays attached.
    pub async fn load_for_slideshow(
        pool: &PgPool,
        slideshow_id: DbId,
    ) -> Result<Vec<LoadedSlide>, sqlx::Error> {
        let query = format!(
            "SELECT {SLIDE_COLUMNS} FROM slides WHERE slideshow_id = $1 ORDER BY idx ASC"
        );
        let slides = sqlx::query_as::<_, Slide>(&query)
            .bind(slideshow_id)
            .fetch_all(pool)
            .await?;

        let slide_ids: Vec<DbId> = slides.iter().map(|s| s.id).collect();

        let query = format!(
            "SELECT {TEXT_COLUMNS} FROM slide_texts \
             WHERE slide_id = ANY($1) ORDER BY ordinal ASC"
        );
        let texts = sqlx::query_as::<_, SlideText>(&query)
            .bind(&slide_ids)
            .fetch_all(pool)
            .await?;

        let query = format!(
            "SELECT {OVERLAY_COLUMNS} FROM slide_overlays \
             WHERE slide_id = ANY($1) ORDER BY ordinal ASC"
        );
        let overlays = sqlx::query_as::<_, SlideOverlay>(&query)
            .bind(&slide_ids)
            .fetch_all(pool)
            .await?;

        let mut texts_by_slide: HashMap<DbId, Vec<SlideText>> = HashMap::new();
        for text in texts {
            texts_by_slide.entry(text.slide_id).or_default().push(text);
        }
        let mut overlays_by_slide: HashMap<DbId, Vec<SlideOverlay>> = HashMap::new();
        for overlay in overlays {
            overlays_by_slide
                .entry(overlay.slide_id)
                .or_default()
                .push(overlay);
        }

        Ok(slides
            .into_iter()
            .map(|slide| LoadedSlide {
                texts: texts_by_slide.remove(&slide.id).unwrap_or_default(),
                overlays: overlays_by_slide.remove(&slide.id).unwrap_or_default(),
                slide,
            })
            .collect())
    }

    /// Delete a slide and renumber the remainder so indices stay
    /// dense. Deleting the last remaining slide is rejected.
    pub async fn delete_slide(
        pool: &PgPool,
        slideshow_id: DbId,
        slide_id: DbId,
    ) -> Result<(), SlideRepoError> {
        let mut tx = pool.begin().await?;

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM slides WHERE slideshow_id = $1")
                .bind(slideshow_id)
                .fetch_one(&mut *tx)
                .await?;
        if count <= 1 {
            return Err(SlideRepoError::Core(CoreError::Validation(
                "A slideshow must keep at least one slide".to_string(),
            )));
        }

        let deleted_idx: Option<i32> = sqlx::query_scalar(
            "DELETE FROM slides WHERE id = $1 AND slideshow_id = $2 RETURNING idx",
        )
        .bind(slide_id)
        .bind(slideshow_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(deleted_idx) = deleted_idx else {
            return Err(SlideRepoError::Core(CoreError::NotFound {
                entity: "slide",
                id: slide_id,
            }));
        };

        sqlx::query(
            "UPDATE slides SET idx = idx - 1 WHERE slideshow_id = $1 AND idx > $2",
        )
        .bind(slideshow_id)
        .bind(deleted_idx)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Replace a slideshow's slides with a generated document's
    /// content. Used when the user accepts a generation result.
    pub async fn replace_all(
        pool: &PgPool,
        slideshow_id: DbId,
        slides: &[NewSlide],
    ) -> Result<(), SlideRepoError> {
        if slides.is_empty() {
            return Err(SlideRepoError::Core(CoreError::Validation(
                "A slideshow must keep at least one slide".to_string(),
            )));
        }

        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM slides WHERE slideshow_id = $1")
            .bind(slideshow_id)
            .execute(&mut *tx)
            .await?;

        for (idx, slide) in slides.iter().enumerate() {
            let slide_id = uuid::Uuid::now_v7();
            sqlx::query(
                "INSERT INTO slides (id, slideshow_id, idx, duration_secs, background_image_id) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(slide_id)
            .bind(slideshow_id)
            .bind(idx as i32)
            .bind(slide.duration_secs)
            .bind(slide.background_image_id)
            .execute(&mut *tx)
            .await?;

            for (ordinal, text) in slide.texts.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO slide_texts \
                     (id, slide_id, ordinal, content, position_x, position_y, font_size) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7)",
                )
                .bind(uuid::Uuid::now_v7())
                .bind(slide_id)
                .bind(ordinal as i32)
                .bind(&text.content)
                .bind(text.position_x)
                .bind(text.position_y)
                .bind(text.font_size)
                .execute(&mut *tx)
                .await?;
            }

            for (ordinal, overlay) in slide.overlays.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO slide_overlays \
                     (id, slide_id, ordinal, image_id, position_x, position_y, \
                      rotation_degs, size_pct) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                )
                .bind(uuid::Uuid::now_v7())
                .bind(slide_id)
                .bind(ordinal as i32)
                .bind(overlay.image_id)
                .bind(overlay.position_x)
                .bind(overlay.position_y)
                .bind(overlay.rotation_degs)
                .bind(overlay.size_pct)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Insert payload for [`SlideRepo::replace_all`].
#[derive(Debug, Clone)]
pub struct NewSlide {
    pub duration_secs: f64,
    pub background_image_id: Option<DbId>,
    pub texts: Vec<NewSlideText>,
    pub overlays: Vec<NewSlideOverlay>,
}

#[derive(Debug, Clone)]
pub struct NewSlideText {
    pub content: String,
    pub position_x: f64,
    pub position_y: f64,
    pub font_size: i32,
}

#[derive(Debug, Clone)]
pub struct NewSlideOverlay {
    pub image_id: Option<DbId>,
    pub position_x: f64,
    pub position_y: f64,
    pub rotation_degs: f64,
    pub size_pct: f64,
}

/// Errors from slide mutations.
#[derive(Debug, thiserror::Error)]
pub enum SlideRepoError {
    #[error(transparent)]
    Core(CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
