use crate::error::{ApiError, ApiResult};
use crate::models::user::{LoginRequest, LoginResponse, MessageResponse, RegisterRequest};
use crate::state::AppState;
use crate::utils::validation::validate_user_name;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

/// Turns a missing or blank field into a 422.
fn required(value: Option<String>, what: &str) -> ApiResult<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::InvalidInput(format!("{what} is required"))),
    }
}

/// Malformed JSON gets the same envelope as every other client error.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))
}

/// Creates an account.
///
/// The password confirmation is checked here, once, before the store sees
/// anything. The store only ever gets a user name and a password.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let payload = body(payload)?;

    // 1. Presence and shape
    let user_name = required(payload.user_name, "User name")?;
    let password = required(payload.password, "Password")?;
    let confirm = required(payload.password_confirm, "Password confirmation")?;
    validate_user_name(&user_name).map_err(ApiError::InvalidInput)?;

    // 2. Confirmation
    if password != confirm {
        return Err(ApiError::InvalidInput("Passwords do not match".to_string()));
    }

    // 3. Create. Duplicates come back as StoreError::DuplicateUsername -> 409.
    let user = state.store.register(&user_name, &password).await?;
    tracing::info!(user_id = %user.id, "registered new user");

    Ok(Json(MessageResponse {
        message: format!("User {} successfully registered", user.user_name),
    }))
}

/// Checks credentials and hands back a signed token.
///
/// Unknown user and wrong password produce the exact same 401. Telling them
/// apart would let anyone probe which user names exist.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let payload = body(payload)?;

    let (Some(user_name), Some(password)) = (payload.user_name, payload.password) else {
        return Err(ApiError::BadCredentials);
    };

    let user = state
        .store
        .check_credentials(&user_name, &password)
        .await?;

    let token = state.tokens.issue(user.id, &user.user_name)?;
    tracing::debug!(user_id = %user.id, "login successful");

    Ok(Json(LoginResponse {
        message: "login successful".to_string(),
        token,
    }))
}
