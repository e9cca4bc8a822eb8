//! Identity extraction.
//!
//! Authentication and session management are an upstream collaborator:
//! the gateway terminates the session and forwards the stable user id
//! in the `x-user-id` header. This extractor is the only place the
//! header name appears.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use slidereel_core::types::DbId;

use crate::error::AppError;

/// Header set by the upstream session gateway.
const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user's id, for scoping storage paths and
/// ownership checks.
#[derive(Debug, Clone, Copy)]
pub struct UserId(pub DbId);

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing user identity".to_string()))?;

        raw.parse::<DbId>()
            .map(UserId)
            .map_err(|_| AppError::Unauthorized("Malformed user identity".to_string()))
    }
}
