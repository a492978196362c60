use crate::config::Config;
use crate::db::CredentialStore;
use crate::utils::auth::TokenService;
use std::sync::Arc;

/// Shared by every handler. Built once in `main` after the store connects.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub tokens: TokenService,
    pub auth_scheme: Arc<str>,
}

impl AppState {
    pub fn new(store: Arc<dyn CredentialStore>, config: &Config) -> Self {
        Self {
            store,
            tokens: TokenService::new(
                &config.jwt_secret,
                chrono::Duration::hours(config.token_ttl_hours),
            ),
            auth_scheme: config.auth_scheme.as_str().into(),
        }
    }
}
