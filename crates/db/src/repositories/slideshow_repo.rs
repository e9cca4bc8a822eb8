//! Repository for the `slideshows` table.
//!
//! Status transitions go through [`SlideshowRepo::transition_status`],
//! which validates against the core lifecycle state machine before
//! writing. No magic numbers -- every status literal is a named enum
//! variant.

use sqlx::PgPool;
use slidereel_core::lifecycle;
use slidereel_core::types::DbId;

use crate::models::slideshow::{CreateSlideshow, Slideshow};
use crate::models::status::SlideshowStatus;

/// Column list for `slideshows` queries.
const COLUMNS: &str = "\
    id, user_id, caption, aspect_ratio, status_id, frame_paths, \
    created_at, updated_at";

/// Default aspect ratio for new slideshows.
const DEFAULT_ASPECT: &str = "9:16";

/// Provides CRUD operations and status transitions for slideshows.
pub struct SlideshowRepo;

impl SlideshowRepo {
    /// Create a draft slideshow with one default slide.
    ///
    /// A slideshow must always have at least one slide, so the initial
    /// slide is inserted in the same transaction.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        input: &CreateSlideshow,
    ) -> Result<Slideshow, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO slideshows (id, user_id, caption, aspect_ratio, status_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        let slideshow = sqlx::query_as::<_, Slideshow>(&query)
            .bind(uuid::Uuid::now_v7())
            .bind(user_id)
            .bind(&input.caption)
            .bind(input.aspect_ratio.as_deref().unwrap_or(DEFAULT_ASPECT))
            .bind(SlideshowStatus::Draft.id())
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO slides (id, slideshow_id, idx) VALUES ($1, $2, 0)")
            .bind(uuid::Uuid::now_v7())
            .bind(slideshow.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(slideshow)
    }

    /// Fetch a slideshow by id.
    pub async fn find_by_id(
        pool: &PgPool,
        slideshow_id: DbId,
    ) -> Result<Option<Slideshow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM slideshows WHERE id = $1");
        sqlx::query_as::<_, Slideshow>(&query)
            .bind(slideshow_id)
            .fetch_optional(pool)
            .await
    }

    /// Transition a slideshow's status, validating the edge against
    /// the lifecycle state machine.
    ///
    /// Returns the new status on success; `Ok(None)` when the
    /// slideshow does not exist. Invalid transitions surface as a
    /// protocol violation error string.
    pub async fn transition_status(
        pool: &PgPool,
        slideshow_id: DbId,
        to: SlideshowStatus,
    ) -> Result<Option<SlideshowStatus>, TransitionError> {
        let current: Option<i16> =
            sqlx::query_scalar("SELECT status_id FROM slideshows WHERE id = $1")
                .bind(slideshow_id)
                .fetch_optional(pool)
                .await?;

        let Some(current) = current else {
            return Ok(None);
        };

        lifecycle::validate_transition(current, to.id()).map_err(TransitionError::Invalid)?;

        sqlx::query("UPDATE slideshows SET status_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(slideshow_id)
            .bind(to.id())
            .execute(pool)
            .await?;

        Ok(Some(to))
    }

    /// Reset the frame-path list to empty.
    pub async fn reset_frame_paths(pool: &PgPool, slideshow_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE slideshows SET frame_paths = '{}', updated_at = NOW() WHERE id = $1",
        )
        .bind(slideshow_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Append one output path to the frame-path list.
    pub async fn append_frame_path(
        pool: &PgPool,
        slideshow_id: DbId,
        path: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE slideshows \
             SET frame_paths = array_append(frame_paths, $2), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(slideshow_id)
        .bind(path)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Persist `completed` together with the final path list.
    pub async fn complete(
        pool: &PgPool,
        slideshow_id: DbId,
        frame_paths: &[String],
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE slideshows \
             SET status_id = $2, frame_paths = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(slideshow_id)
        .bind(SlideshowStatus::Completed.id())
        .bind(frame_paths)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// All slideshows sitting in an interrupted status (`queued` or
    /// `rendering`). Consulted once at process start by the resume
    /// scan.
    pub async fn find_interrupted(
        pool: &PgPool,
    ) -> Result<Vec<(DbId, DbId, i16)>, sqlx::Error> {
        let rows: Vec<(DbId, DbId, i16)> = sqlx::query_as(
            "SELECT id, user_id, status_id FROM slideshows \
             WHERE status_id IN ($1, $2) \
             ORDER BY updated_at ASC",
        )
        .bind(SlideshowStatus::Queued.id())
        .bind(SlideshowStatus::Rendering.id())
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Update the caption after a generation pass.
    pub async fn set_caption(
        pool: &PgPool,
        slideshow_id: DbId,
        caption: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE slideshows SET caption = $2, updated_at = NOW() WHERE id = $1")
            .bind(slideshow_id)
            .bind(caption)
            .execute(pool)
            .await?;
        Ok(())
    }
}

/// Errors from validated status transitions.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    /// The requested edge is not in the lifecycle state machine.
    #[error("{0}")]
    Invalid(String),

    /// A database query failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
