use std::sync::Arc;

use slidereel_core::ports::ObjectStore;
use slidereel_gen::ChatTransport;
use slidereel_render::{RenderQueue, SlideCompositor};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc` or is already
/// `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: slidereel_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Object storage backend (render output + owned source assets).
    pub objects: Arc<dyn ObjectStore>,
    /// The per-process render queue.
    pub queue: Arc<RenderQueue>,
    /// Model API transport for the generation pipeline.
    pub transport: Arc<dyn ChatTransport>,
    /// Compositor handed to admitted render jobs.
    pub compositor: Arc<dyn SlideCompositor>,
}
