use super::{Collection, CredentialStore, StoreError};
use crate::models::user::User;
use crate::utils::auth::{check_password, hash_password};
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, user_name, password_hash, favourites, history";

/// Postgres-backed store. The pool is cloned into every request; sqlx
/// hands out connections as needed.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        // 1. Open the pool
        // `connect` (not `connect_lazy`) so a bad URL or a dead server fails here,
        // at startup, instead of on the first request.
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        // 2. Bring the schema up to date
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Every collection mutation is a single `UPDATE ... RETURNING`, so
    /// concurrent requests for the same user are serialized by Postgres row
    /// locking and we never read-modify-write in Rust.
    async fn update_collection(
        &self,
        sql: String,
        id: Uuid,
        item: &str,
    ) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar::<_, Vec<String>>(&sql)
            .bind(id)
            .bind(item)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn register(&self, user_name: &str, password: &str) -> Result<User, StoreError> {
        let password_hash =
            hash_password(password).map_err(|e| StoreError::Hashing(e.to_string()))?;

        // We rely on the UNIQUE(user_name) constraint to catch duplicates.
        // Checking first and inserting second would race.
        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, user_name, password_hash, created_at) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_name)
        .bind(password_hash)
        .bind(chrono::Utc::now().timestamp())
        .fetch_one(&self.pool)
        .await;

        match created {
            Ok(user) => Ok(user),
            Err(e) => {
                // Unique constraint violation is Postgres code 23505
                if let Some(db_err) = e.as_database_error() {
                    if db_err.code() == Some("23505".into()) {
                        return Err(StoreError::DuplicateUsername);
                    }
                }
                Err(StoreError::Backend(e))
            }
        }
    }

    async fn check_credentials(
        &self,
        user_name: &str,
        password: &str,
    ) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_name = $1"
        ))
        .bind(user_name)
        .fetch_optional(&self.pool)
        .await?;

        // Runs Argon2 even for unknown names so timing doesn't give them away.
        let matches = check_password(password, user.as_ref().map(|u| u.password_hash.as_str()));
        match user {
            None => Err(StoreError::NotFound),
            Some(user) if matches => Ok(user),
            Some(_) => Err(StoreError::BadCredentials),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self, id: Uuid, collection: Collection) -> Result<Vec<String>, StoreError> {
        let col = collection.column();
        sqlx::query_scalar::<_, Vec<String>>(&format!("SELECT {col} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn add(
        &self,
        id: Uuid,
        collection: Collection,
        item: &str,
    ) -> Result<Vec<String>, StoreError> {
        let col = collection.column();
        let sql = format!(
            "UPDATE users SET {col} = CASE WHEN $2 = ANY({col}) THEN {col} \
             ELSE array_append({col}, $2) END \
             WHERE id = $1 RETURNING {col}"
        );
        self.update_collection(sql, id, item).await
    }

    async fn remove(
        &self,
        id: Uuid,
        collection: Collection,
        item: &str,
    ) -> Result<Vec<String>, StoreError> {
        let col = collection.column();
        let sql = format!(
            "UPDATE users SET {col} = array_remove({col}, $2) WHERE id = $1 RETURNING {col}"
        );
        self.update_collection(sql, id, item).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        // `SELECT 1` is the fastest way to check the pool can still reach the server.
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

// These need a reachable Postgres: `#[sqlx::test]` reads DATABASE_URL, creates
// a throwaway database per test and applies `./migrations` to it.
#[cfg(test)]
mod tests {
    use super::*;

    fn store(pool: PgPool) -> PgStore {
        PgStore { pool }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn duplicate_register_is_rejected(pool: PgPool) {
        let store = store(pool);
        let first = store.register("alice", "p1").await.unwrap();

        let err = store.register("alice", "p2").await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUsername));

        let user = store.check_credentials("alice", "p1").await.unwrap();
        assert_eq!(user.id, first.id);
        assert_ne!(user.password_hash, "p1");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn wrong_password_and_unknown_user_fail(pool: PgPool) {
        let store = store(pool);
        store.register("alice", "p1").await.unwrap();

        assert!(matches!(
            store.check_credentials("alice", "wrong").await,
            Err(StoreError::BadCredentials)
        ));
        assert!(matches!(
            store.check_credentials("bob", "p1").await,
            Err(StoreError::NotFound)
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn add_twice_keeps_one_copy_in_order(pool: PgPool) {
        let store = store(pool);
        let id = store.register("alice", "p1").await.unwrap().id;

        for collection in [Collection::Favourites, Collection::History] {
            store.add(id, collection, "42").await.unwrap();
            store.add(id, collection, "7").await.unwrap();
            let list = store.add(id, collection, "42").await.unwrap();

            assert_eq!(list, vec!["42".to_string(), "7".to_string()]);
            assert_eq!(store.list(id, collection).await.unwrap(), list);
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn removing_an_absent_item_leaves_the_list_alone(pool: PgPool) {
        let store = store(pool);
        let id = store.register("alice", "p1").await.unwrap().id;

        for collection in [Collection::Favourites, Collection::History] {
            store.add(id, collection, "42").await.unwrap();

            let list = store.remove(id, collection, "99").await.unwrap();
            assert_eq!(list, vec!["42".to_string()]);

            let list = store.remove(id, collection, "42").await.unwrap();
            assert!(list.is_empty());
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn unknown_user_id_is_not_found(pool: PgPool) {
        let store = store(pool);
        let id = Uuid::new_v4();

        assert!(matches!(store.find_by_id(id).await, Err(StoreError::NotFound)));
        assert!(matches!(
            store.list(id, Collection::Favourites).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.add(id, Collection::History, "1").await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.remove(id, Collection::Favourites, "1").await,
            Err(StoreError::NotFound)
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn ping_reaches_the_server(pool: PgPool) {
        assert!(store(pool).ping().await.is_ok());
    }
}
