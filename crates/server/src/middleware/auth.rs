//! Requester extractors.
//!
//! The service sits behind an auth gateway that validates credentials and
//! forwards the caller's identity as two headers. Handlers use [`RequireAuth`]
//! for protected routes and [`OptionalAuth`] where anonymous access is fine.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use rately_core::{Role, UserId};

use crate::error::AppError;
use crate::services::policy::Requester;

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the authenticated user's role.
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Extractor that requires an authenticated requester.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(requester): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("hello, user {}", requester.id)
/// }
/// ```
pub struct RequireAuth(pub Requester);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        requester_from_headers(&parts.headers)
            .map(Self)
            .map_err(|reason| AppError::Unauthorized(reason.to_string()))
    }
}

/// Extractor that picks up the requester when the identity headers are
/// present and valid, without rejecting anonymous requests.
pub struct OptionalAuth(pub Option<Requester>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(requester_from_headers(&parts.headers).ok()))
    }
}

fn requester_from_headers(headers: &HeaderMap) -> Result<Requester, &'static str> {
    let id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or("missing user identity header")?
        .parse::<i32>()
        .map_err(|_| "malformed user identity header")?;

    let role = headers
        .get(USER_ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or("missing user role header")?
        .parse::<Role>()
        .map_err(|_| "unknown user role")?;

    Ok(Requester::new(UserId::new(id), role))
}
