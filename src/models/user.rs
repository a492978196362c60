use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored account.
///
/// `password_hash` is skipped on serialization so a `User` can never leak the
/// credential into a response body by accident.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(default)]
    pub favourites: Vec<String>,
    #[serde(default)]
    pub history: Vec<String>,
}

/// Register body. Every field is optional at the serde level so missing
/// fields turn into a 422 with our own message instead of axum's rejection.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default, rename = "userName", alias = "username")]
    pub user_name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, rename = "passwordConfirm", alias = "password2")]
    pub password_confirm: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default, rename = "userName", alias = "username")]
    pub user_name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
}

/// Token payload. Exactly the identity, the user name and the expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "userName")]
    pub user_name: String,
    pub exp: i64,
}
