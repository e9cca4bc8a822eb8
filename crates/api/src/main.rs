use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slidereel_api::config::{ServerConfig, StorageConfig};
use slidereel_api::{router, state};
use slidereel_core::ports::{ObjectStore, RenderStore};
use slidereel_gen::{ChatTransport, OpenAiTransport};
use slidereel_render::{collect_interrupted, BasicCompositor, RenderQueue, SlideCompositor};
use slidereel_storage::{MemoryObjectStore, S3ObjectStore};

use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "slidereel_api=debug,slidereel_render=debug,slidereel_gen=debug,tower_http=debug"
                        .into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = slidereel_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    slidereel_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    slidereel_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Object storage ---
    let objects: Arc<dyn ObjectStore> = match &config.storage {
        StorageConfig::S3 {
            bucket,
            public_base,
        } => {
            tracing::info!(bucket = %bucket, "Using S3 object storage");
            Arc::new(S3ObjectStore::from_env(bucket.clone(), public_base.clone()).await)
        }
        StorageConfig::Memory { public_base } => {
            tracing::warn!("Using in-memory object storage (development only)");
            Arc::new(MemoryObjectStore::new(public_base.clone()))
        }
    };

    // --- Render queue ---
    let store: Arc<dyn RenderStore> =
        Arc::new(slidereel_db::PgRenderStore::new(pool.clone()));
    let queue = RenderQueue::new(Arc::clone(&store), Arc::clone(&objects));
    let compositor: Arc<dyn SlideCompositor> =
        Arc::new(BasicCompositor::new(Arc::clone(&objects)));

    // --- Startup resume scan ---
    // Interrupted renders are purged/reset and re-admitted before the
    // server accepts traffic.
    match collect_interrupted(&store, &objects).await {
        Ok(resume_set) => {
            for job in resume_set {
                tracing::info!(
                    slideshow_id = %job.slideshow_id,
                    purged = job.purged_objects,
                    "Resuming render...",
                );
                if let Err(e) = queue
                    .admit_detached(job.slideshow_id, Arc::clone(&compositor), None)
                    .await
                {
                    tracing::error!(
                        slideshow_id = %job.slideshow_id,
                        error = %e,
                        "Failed to re-admit interrupted render",
                    );
                }
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Startup resume scan failed");
        }
    }

    // --- Model transport ---
    let transport: Arc<dyn ChatTransport> = Arc::new(OpenAiTransport::new(
        config.model.base_url.clone(),
        config.model.api_key.clone(),
        config.model.model.clone(),
    ));

    // --- Router ---
    let cors = build_cors_layer(&config);
    let x_request_id = HeaderName::from_static("x-request-id");

    let app_state = AppState {
        pool,
        config: Arc::new(config.clone()),
        objects,
        queue,
        transport,
        compositor,
    };

    let app = router::build_router(app_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(CatchPanicLayer::new());

    // --- Serve ---
    let addr = SocketAddr::new(config.host.parse().expect("Invalid HOST"), config.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static("x-user-id")])
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
