//! Per-user favourites and history.
//!
//! Both lists share one implementation; the route decides which column it
//! touches. Every handler is scoped to the authenticated caller, so there is
//! no way to read or edit somebody else's lists.

use crate::db::{Collection, StoreError};
use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::state::AppState;
use crate::utils::validation::validate_item_id;
use axum::{
    Json,
    extract::{Path, State},
};

/// A user that vanished between the auth check and the query is treated
/// like a bad token, not like a failed login.
fn map_store(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound => ApiError::Unauthenticated("Invalid token"),
        other => other.into(),
    }
}

async fn list(
    state: &AppState,
    user: &AuthenticatedUser,
    collection: Collection,
) -> ApiResult<Json<Vec<String>>> {
    let items = state
        .store
        .list(user.user_id, collection)
        .await
        .map_err(map_store)?;
    Ok(Json(items))
}

async fn add(
    state: &AppState,
    user: &AuthenticatedUser,
    collection: Collection,
    id: &str,
) -> ApiResult<Json<Vec<String>>> {
    validate_item_id(id).map_err(ApiError::InvalidInput)?;
    let items = state
        .store
        .add(user.user_id, collection, id)
        .await
        .map_err(map_store)?;
    Ok(Json(items))
}

async fn remove(
    state: &AppState,
    user: &AuthenticatedUser,
    collection: Collection,
    id: &str,
) -> ApiResult<Json<Vec<String>>> {
    validate_item_id(id).map_err(ApiError::InvalidInput)?;
    let items = state
        .store
        .remove(user.user_id, collection, id)
        .await
        .map_err(map_store)?;
    Ok(Json(items))
}

pub async fn get_favourites(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<Vec<String>>> {
    list(&state, &user, Collection::Favourites).await
}

pub async fn add_favourite(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    add(&state, &user, Collection::Favourites, &id).await
}

pub async fn remove_favourite(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    remove(&state, &user, Collection::Favourites, &id).await
}

pub async fn get_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<Vec<String>>> {
    list(&state, &user, Collection::History).await
}

pub async fn add_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    add(&state, &user, Collection::History, &id).await
}

pub async fn remove_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    remove(&state, &user, Collection::History, &id).await
}
