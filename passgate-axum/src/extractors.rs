use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};

use passgate_core::AccessClaims;

use crate::error::ApiError;

/// The validated claims the credential bridge attached to this request.
/// Rejects with 401 when no valid session accompanied the request.
pub struct CurrentUser(pub AccessClaims);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessClaims>()
            .cloned()
            .map(CurrentUser)
            .ok_or(ApiError::Unauthorized)
    }
}

/// Like [`CurrentUser`] but absent instead of rejecting.
pub struct OptionalCurrentUser(pub Option<AccessClaims>);

impl<S> FromRequestParts<S> for OptionalCurrentUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalCurrentUser(
            parts.extensions.get::<AccessClaims>().cloned(),
        ))
    }
}
