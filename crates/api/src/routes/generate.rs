//! The generation endpoint: a single duplex SSE stream running the
//! two-phase protocol.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::Stream;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use validator::Validate;

use slidereel_core::types::DbId;
use slidereel_db::models::image::ImageAsset;
use slidereel_db::repositories::ImageRepo;
use slidereel_gen::context::PgPlanningContext;
use slidereel_gen::{CandidateImage, GenerationRequest, Orchestrator, ProductBrief};

use crate::error::{AppError, AppResult};
use crate::identity::UserId;
use crate::routes::slideshows::load_owned;
use crate::state::AppState;

/// Request body for `POST /api/v1/slideshows/{id}/generate`.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateRequest {
    /// Free-text user prompt; the slide count is extracted from it.
    #[validate(length(min = 1, max = 2000))]
    pub prompt: String,
    #[validate(length(min = 1, max = 200))]
    pub product_name: String,
    #[serde(default)]
    pub product_description: String,
    pub industry: Option<String>,
    pub product_type: Option<String>,
}

/// `POST /api/v1/slideshows/{id}/generate` -- stream the generation
/// protocol: zero or more `thought`/`thoughtln` frames, then exactly
/// one `json` frame or an `ERROR:`-prefixed `thoughtln` frame.
pub async fn generate(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(slideshow_id): Path<DbId>,
    Json(request): Json<GenerateRequest>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let slideshow = load_owned(&state, slideshow_id, user_id).await?;

    let backgrounds = ImageRepo::list_backgrounds(&state.pool, user_id).await?;
    let products = ImageRepo::list_products(&state.pool, user_id).await?;

    let generation = GenerationRequest {
        slideshow_id,
        user_prompt: request.prompt,
        product: ProductBrief {
            name: request.product_name,
            description: request.product_description,
            industry: request.industry,
            product_type: request.product_type,
        },
        aspect_ratio: slideshow.aspect_ratio,
        backgrounds: candidates(&state, &backgrounds),
        overlays: candidates(&state, &products),
    };

    let orchestrator = Orchestrator::new(
        Arc::clone(&state.transport),
        Arc::new(PgPlanningContext::new(state.pool.clone(), user_id)),
    );

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        orchestrator.run(generation, tx).await;
    });

    let stream = UnboundedReceiverStream::new(rx).map(|event| {
        let (name, payload) = event.wire_parts();
        Ok(Event::default().event(name).data(payload))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Resolve a pool of image assets into candidates with fetchable
/// URLs. Assets with no resolvable URL are dropped (and logged) rather
/// than failing the request.
fn candidates(state: &AppState, assets: &[ImageAsset]) -> Vec<CandidateImage> {
    assets
        .iter()
        .filter_map(|asset| {
            let url = resolve_url(state, asset);
            if url.is_none() {
                tracing::warn!(image_id = %asset.id, "Image asset has no resolvable URL");
            }
            url.map(|url| CandidateImage {
                id: asset.id,
                url,
                brief: asset.brief.clone(),
            })
        })
        .collect()
}

/// Owned assets serve from the object store; ownerless catalog assets
/// from their hosted URL.
fn resolve_url(state: &AppState, asset: &ImageAsset) -> Option<String> {
    if asset.owner_id.is_some() {
        asset
            .storage_path
            .as_deref()
            .map(|key| state.objects.public_url(key))
    } else {
        asset.hosted_url.clone()
    }
}
