//! Requester extraction.
//!
//! Authentication happens in the identity gateway in front of this service. The
//! gateway forwards the authenticated principal id in [`PRINCIPAL_HEADER`]; a request
//! without the header is anonymous.

use super::error::ApiError;
use crate::core::Requester;
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Header carrying the authenticated principal id.
pub const PRINCIPAL_HEADER: &str = "x-principal-id";

impl<S: Send + Sync> FromRequestParts<S> for Requester {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(PRINCIPAL_HEADER) else {
            return Ok(Self::Anonymous);
        };
        let raw = value
            .to_str()
            .map_err(|_| ApiError::BadRequest(format!("{PRINCIPAL_HEADER} is not text")))?;
        Uuid::parse_str(raw.trim())
            .map(Self::Principal)
            .map_err(|_| ApiError::BadRequest(format!("{PRINCIPAL_HEADER} is not a UUID")))
    }
}
