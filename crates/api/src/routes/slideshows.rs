//! Slideshow CRUD-lite and render endpoints.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::Stream;
use futures::StreamExt;
use serde::Serialize;
use serde_json::json;
use tokio_stream::wrappers::UnboundedReceiverStream;

use slidereel_core::document::GeneratedSlideshow;
use slidereel_core::error::CoreError;
use slidereel_core::geometry::CanvasGeometry;
use slidereel_core::types::DbId;
use slidereel_db::models::slide::{Slide, SlideOverlay, SlideText};
use slidereel_db::models::slideshow::{CreateSlideshow, Slideshow};
use slidereel_db::models::status::SlideshowStatus;
use slidereel_db::repositories::slide_repo::{
    NewSlide, NewSlideOverlay, NewSlideText, SlideRepoError,
};
use slidereel_db::repositories::{SlideRepo, SlideshowRepo};

use crate::error::{AppError, AppResult};
use crate::identity::UserId;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct SlideshowDetail {
    #[serde(flatten)]
    slideshow: Slideshow,
    /// Lowercase status name resolved from `status_id`.
    status: &'static str,
    slides: Vec<SlideDetail>,
}

#[derive(Serialize)]
pub struct SlideDetail {
    #[serde(flatten)]
    slide: Slide,
    texts: Vec<SlideText>,
    overlays: Vec<SlideOverlay>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `POST /api/v1/slideshows` -- create a draft with one default slide.
pub async fn create(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(input): Json<CreateSlideshow>,
) -> AppResult<(StatusCode, Json<Slideshow>)> {
    if let Some(aspect) = &input.aspect_ratio {
        // Validate before touching the database.
        CanvasGeometry::from_aspect(aspect)?;
    }

    let slideshow = SlideshowRepo::create(&state.pool, user_id, &input).await?;
    Ok((StatusCode::CREATED, Json(slideshow)))
}

/// `GET /api/v1/slideshows/{id}` -- fetch with slides.
pub async fn get(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(slideshow_id): Path<DbId>,
) -> AppResult<Json<SlideshowDetail>> {
    let slideshow = load_owned(&state, slideshow_id, user_id).await?;
    let slides = SlideRepo::load_for_slideshow(&state.pool, slideshow_id).await?;

    let status = SlideshowStatus::from_id(slideshow.status_id)
        .map(SlideshowStatus::name)
        .unwrap_or("unknown");

    Ok(Json(SlideshowDetail {
        status,
        slideshow,
        slides: slides
            .into_iter()
            .map(|loaded| SlideDetail {
                slide: loaded.slide,
                texts: loaded.texts,
                overlays: loaded.overlays,
            })
            .collect(),
    }))
}

/// `DELETE /api/v1/slideshows/{id}/slides/{slide_id}` -- delete and
/// renumber. Deleting the last slide is rejected.
pub async fn delete_slide(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path((slideshow_id, slide_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    load_owned(&state, slideshow_id, user_id).await?;

    SlideRepo::delete_slide(&state.pool, slideshow_id, slide_id)
        .await
        .map_err(|e| match e {
            SlideRepoError::Core(core) => AppError::Core(core),
            SlideRepoError::Database(db) => AppError::Database(db),
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Duration given to slides created from a generated document.
const DEFAULT_SLIDE_DURATION_SECS: f64 = 3.0;

/// `PUT /api/v1/slideshows/{id}/document` -- replace the slide set
/// with an accepted generation result (or a bulk editor save).
///
/// Draft edits are owned by the editor; a slideshow that is queued or
/// rendering belongs to the render queue and rejects edits.
pub async fn apply_document(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(slideshow_id): Path<DbId>,
    Json(document): Json<GeneratedSlideshow>,
) -> AppResult<StatusCode> {
    let slideshow = load_owned(&state, slideshow_id, user_id).await?;

    if matches!(
        SlideshowStatus::from_id(slideshow.status_id),
        Some(SlideshowStatus::Queued) | Some(SlideshowStatus::Rendering)
    ) {
        return Err(AppError::Core(CoreError::Conflict(
            "Slideshow is being rendered; edits are locked".to_string(),
        )));
    }

    let slides: Vec<NewSlide> = document
        .slides
        .iter()
        .map(|slide| NewSlide {
            duration_secs: DEFAULT_SLIDE_DURATION_SECS,
            background_image_id: slide.background_image_id,
            texts: slide
                .texts
                .iter()
                .map(|t| NewSlideText {
                    content: t.text.clone(),
                    position_x: t.position_x,
                    position_y: t.position_y,
                    font_size: t.size.round() as i32,
                })
                .collect(),
            overlays: slide
                .overlays
                .iter()
                .filter(|o| o.image_id.is_some())
                .map(|o| NewSlideOverlay {
                    image_id: o.image_id,
                    position_x: o.position_x,
                    position_y: o.position_y,
                    rotation_degs: o.rotation,
                    size_pct: o.size,
                })
                .collect(),
        })
        .collect();

    SlideRepo::replace_all(&state.pool, slideshow_id, &slides)
        .await
        .map_err(|e| match e {
            SlideRepoError::Core(core) => AppError::Core(core),
            SlideRepoError::Database(db) => AppError::Database(db),
        })?;
    SlideshowRepo::set_caption(&state.pool, slideshow_id, &document.caption).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/v1/slideshows/{id}/render` -- admit into the render
/// queue. Returns 202; progress and completion are observable via the
/// events stream and the persisted status.
pub async fn render(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(slideshow_id): Path<DbId>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    load_owned(&state, slideshow_id, user_id).await?;

    state
        .queue
        .admit_detached(slideshow_id, Arc::clone(&state.compositor), None)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "status": SlideshowStatus::Queued.name() })),
    ))
}

/// `GET /api/v1/slideshows/{id}/render/events` -- SSE progress stream
/// attached to the outstanding render job.
pub async fn render_events(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(slideshow_id): Path<DbId>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    load_owned(&state, slideshow_id, user_id).await?;

    let receiver = state
        .queue
        .attach_listener(slideshow_id)
        .await
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "render job",
            id: slideshow_id,
        }))?;

    let stream = UnboundedReceiverStream::new(receiver).map(|progress| {
        let event = Event::default()
            .event("progress")
            .json_data(&progress)
            .unwrap_or_default();
        Ok(event)
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a slideshow and verify ownership. Foreign slideshows read as
/// not found.
pub(crate) async fn load_owned(
    state: &AppState,
    slideshow_id: DbId,
    user_id: DbId,
) -> AppResult<Slideshow> {
    let slideshow = SlideshowRepo::find_by_id(&state.pool, slideshow_id)
        .await?
        .filter(|s| s.user_id == user_id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "slideshow",
            id: slideshow_id,
        }))?;
    Ok(slideshow)
}
