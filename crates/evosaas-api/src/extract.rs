use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use evosaas_types::api::Claims;

use crate::AppState;
use crate::error::ApiError;

/// Authenticated caller identity. Verified from the `Authorization: Bearer`
/// header and handed to handlers as an explicit parameter rather than an
/// ambient request extension.
pub struct AuthUser(pub Claims);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::NoToken)?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or(ApiError::NoToken)?;

        let claims = state
            .tokens
            .verify(token)
            .map_err(|_| ApiError::InvalidToken)?;

        Ok(AuthUser(claims))
    }
}
