use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use super::{cookie::read_cookie, dto::Identity, services::verify_session};
use crate::{auth::dto::JwtKeys, error::AppError, state::AppState};

/// Runs the session gate on the request's cookie and yields the caller's
/// identity. Handlers that take this never see unauthenticated requests.
pub struct AuthUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let raw = read_cookie(&parts.headers, &state.config.cookie.name);
        let identity = verify_session(&keys, state.users.as_ref(), raw).await?;
        Ok(AuthUser(identity))
    }
}
