/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`). SSE endpoints
    /// are mounted outside the timeout layer.
    pub request_timeout_secs: u64,
    /// Object storage backend selection.
    pub storage: StorageConfig,
    /// Model API configuration for the generation pipeline.
    pub model: ModelConfig,
}

/// Which object-storage backend to run against.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// S3 bucket with a public serving base URL.
    S3 { bucket: String, public_base: String },
    /// Process-local store for development and tests.
    Memory { public_base: String },
}

/// OpenAI-compatible model API settings.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// API base, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `STORAGE_BACKEND`      | `memory`                   |
    /// | `STORAGE_BUCKET`       | (required for `s3`)        |
    /// | `STORAGE_PUBLIC_BASE`  | `http://localhost:3000/media` |
    /// | `MODEL_API_BASE`       | `https://api.openai.com/v1` |
    /// | `MODEL_API_KEY`        | (empty)                    |
    /// | `MODEL_NAME`           | `gpt-4o`                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let public_base = std::env::var("STORAGE_PUBLIC_BASE")
            .unwrap_or_else(|_| "http://localhost:3000/media".into());

        let storage = match std::env::var("STORAGE_BACKEND").as_deref() {
            Ok("s3") => StorageConfig::S3 {
                bucket: std::env::var("STORAGE_BUCKET")
                    .expect("STORAGE_BUCKET must be set for the s3 backend"),
                public_base,
            },
            _ => StorageConfig::Memory { public_base },
        };

        let model = ModelConfig {
            base_url: std::env::var("MODEL_API_BASE")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            api_key: std::env::var("MODEL_API_KEY").unwrap_or_default(),
            model: std::env::var("MODEL_NAME").unwrap_or_else(|_| "gpt-4o".into()),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            storage,
            model,
        }
    }
}
