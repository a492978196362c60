use crate::db::StoreError;
use crate::utils::auth::AuthError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Every way a request can fail, as seen by a client.
///
/// All variants render the same envelope: `{"message": "..."}`. Server-side
/// failures are logged in full and reported to the client as a bare
/// "internal server error". Store error text never leaves the process.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("User name already taken")]
    DuplicateUsername,
    /// Deliberately vague: unknown user and wrong password look identical.
    #[error("Incorrect user name or password")]
    BadCredentials,
    #[error("{0}")]
    Unauthenticated(&'static str),
    #[error("internal server error")]
    Upstream(anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::DuplicateUsername => StatusCode::CONFLICT,
            ApiError::BadCredentials | ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername => ApiError::DuplicateUsername,
            StoreError::NotFound | StoreError::BadCredentials => ApiError::BadCredentials,
            StoreError::Hashing(_) | StoreError::Backend(_) => ApiError::Upstream(err.into()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Missing => ApiError::Unauthenticated("Missing Authorization header"),
            AuthError::Invalid => ApiError::Unauthenticated("Invalid token"),
            AuthError::Expired => ApiError::Unauthenticated("Token expired"),
            AuthError::Signing(_) => ApiError::Upstream(err.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Upstream(source) = &self {
            tracing::error!(error = ?source, "request failed upstream");
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rstest::rstest;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[rstest]
    #[case(ApiError::InvalidInput("Passwords do not match".into()), StatusCode::UNPROCESSABLE_ENTITY)]
    #[case(ApiError::DuplicateUsername, StatusCode::CONFLICT)]
    #[case(ApiError::BadCredentials, StatusCode::UNAUTHORIZED)]
    #[case(ApiError::Unauthenticated("Invalid token"), StatusCode::UNAUTHORIZED)]
    #[tokio::test]
    async fn every_error_uses_the_message_envelope(
        #[case] err: ApiError,
        #[case] expected: StatusCode,
    ) {
        let (status, body) = body_of(err).await;
        assert_eq!(status, expected);
        let object = body.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert!(object["message"].is_string());
    }

    #[tokio::test]
    async fn upstream_failures_hide_their_details() {
        let err = ApiError::from(StoreError::Hashing("argon2 blew up at 0xdeadbeef".into()));
        let (status, body) = body_of(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "internal server error");
    }

    #[test]
    fn not_found_and_wrong_password_collapse_to_one_error() {
        let a = ApiError::from(StoreError::NotFound);
        let b = ApiError::from(StoreError::BadCredentials);
        assert_eq!(a.status(), b.status());
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn expired_tokens_are_unauthenticated() {
        assert_eq!(ApiError::from(AuthError::Expired).status(), StatusCode::UNAUTHORIZED);
    }
}
