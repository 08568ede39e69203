use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};

use super::{repo_types::User, services::resolve_current_user};
use crate::{error::AppError, state::AppState};

/// Extracts the bearer token and resolves it to a stored user.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Read Authorization header
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

        let user = resolve_current_user(state.users.as_ref(), &state.jwt, token.trim()).await?;
        Ok(CurrentUser(user))
    }
}
