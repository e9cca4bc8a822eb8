use std::time::Duration;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::timeout::TimeoutLayer;

use crate::routes;
use crate::state::AppState;

/// Assemble the application router.
///
/// Request/response endpoints sit behind the request timeout; the SSE
/// endpoints (generation, render progress) do not, since they hold
/// their connection for the lifetime of the operation.
pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    let timed = Router::new()
        .route("/slideshows", post(routes::slideshows::create))
        .route("/slideshows/{id}", get(routes::slideshows::get))
        .route(
            "/slideshows/{id}/slides/{slide_id}",
            delete(routes::slideshows::delete_slide),
        )
        .route(
            "/slideshows/{id}/document",
            put(routes::slideshows::apply_document),
        )
        .route("/slideshows/{id}/render", post(routes::slideshows::render))
        .route("/usage", get(routes::usage::usage))
        .layer(TimeoutLayer::new(timeout));

    let streaming = Router::new()
        .route("/slideshows/{id}/generate", post(routes::generate::generate))
        .route(
            "/slideshows/{id}/render/events",
            get(routes::slideshows::render_events),
        );

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", timed.merge(streaming))
        .with_state(state)
}
