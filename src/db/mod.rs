use crate::config::Config;
use crate::models::user::User;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// The two per-user lists. They behave identically; only the column differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Favourites,
    History,
}

impl Collection {
    pub fn column(self) -> &'static str {
        match self {
            Collection::Favourites => "favourites",
            Collection::History => "history",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user name already taken")]
    DuplicateUsername,
    #[error("user not found")]
    NotFound,
    #[error("incorrect password")]
    BadCredentials,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("database error: {0}")]
    Backend(#[from] sqlx::Error),
}

/// Everything the HTTP layer needs from user persistence.
///
/// Collection semantics are the same for every implementation:
/// - `add` is idempotent. An id already in the list is not added again and
///   the list keeps insertion order.
/// - `remove` of an id that isn't there succeeds and returns the list unchanged.
/// - Unknown user ids fail with `StoreError::NotFound`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Creates a user. Only the Argon2 hash of `password` is kept.
    async fn register(&self, user_name: &str, password: &str) -> Result<User, StoreError>;

    /// Looks up `user_name` and verifies `password` against the stored hash.
    async fn check_credentials(&self, user_name: &str, password: &str)
    -> Result<User, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<User, StoreError>;

    async fn list(&self, id: Uuid, collection: Collection) -> Result<Vec<String>, StoreError>;

    async fn add(
        &self,
        id: Uuid,
        collection: Collection,
        item: &str,
    ) -> Result<Vec<String>, StoreError>;

    async fn remove(
        &self,
        id: Uuid,
        collection: Collection,
        item: &str,
    ) -> Result<Vec<String>, StoreError>;

    /// Cheap liveness probe for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Releases the backing connection(s). Called once during shutdown.
    async fn close(&self);
}

/// Opens the store named by `DATABASE_URL`.
///
/// `memory://` gives the in-process store (handy for local runs and tests).
/// Anything else is treated as a Postgres URL: we open a pool and run the
/// embedded migrations before handing it back, so the server never starts
/// against a half-initialised schema.
pub async fn connect(config: &Config) -> Result<Arc<dyn CredentialStore>> {
    if config.database_url.starts_with("memory://") {
        tracing::warn!("Using the in-memory store. Nothing survives a restart.");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = PgStore::connect(&config.database_url, config.db_max_connections).await?;
    Ok(Arc::new(store))
}
