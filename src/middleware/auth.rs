use crate::db::StoreError;
use crate::error::ApiError;
use crate::state::AppState;
use crate::utils::auth::{AuthError, extract_token};
use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use uuid::Uuid;

/// The caller behind a valid token.
///
/// Add `user: AuthenticatedUser` to a handler and axum will:
/// 1. Pull the token out of `Authorization: <scheme> <token>`
/// 2. Verify signature and expiry
/// 3. Load the user again from the store by id
///
/// If any step fails the handler never runs and the client gets a 401.
///
/// Step 3 costs one lookup per request. The alternative is trusting the
/// claim as-is, which is free but keeps a deleted account usable until its
/// token expires. We pay for the lookup.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub user_name: String,
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::Missing)?;

        let token = extract_token(header, &state.auth_scheme)?;
        let claims = state.tokens.verify(token)?;

        let user = state.store.find_by_id(claims.id).await.map_err(|e| match e {
            StoreError::NotFound => {
                tracing::debug!(user_id = %claims.id, "token for a user that no longer exists");
                ApiError::Unauthenticated("Invalid token")
            }
            other => ApiError::from(other),
        })?;

        Ok(AuthenticatedUser {
            user_id: user.id,
            user_name: user.user_name,
        })
    }
}
