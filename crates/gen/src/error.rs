/// Errors from the generation pipeline.
#[derive(Debug, thiserror::Error)]
pub enum GenError {
    /// The request was rejected before any external call.
    #[error("Invalid generation request: {0}")]
    InvalidRequest(String),

    /// The HTTP request to the model API itself failed.
    #[error("Model API request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The model API returned a non-2xx status code.
    #[error("Model API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The structured-generation call produced no well-formed object
    /// after its retry budget. Terminal for the request -- there is no
    /// fallback slide generation.
    #[error("Model produced no structured object after {attempts} attempts")]
    NoObject { attempts: u32 },

    /// A planning-context (database) lookup failed.
    #[error("Planning context error: {0}")]
    Context(String),
}
