use super::{Collection, CredentialStore, StoreError};
use crate::models::user::User;
use crate::utils::auth::{check_password, hash_password};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    by_name: HashMap<String, Uuid>,
}

impl Inner {
    fn collection_mut(
        &mut self,
        id: Uuid,
        collection: Collection,
    ) -> Result<&mut Vec<String>, StoreError> {
        let user = self.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        Ok(match collection {
            Collection::Favourites => &mut user.favourites,
            Collection::History => &mut user.history,
        })
    }
}

/// In-process store used by tests and `DATABASE_URL=memory://`.
///
/// One `RwLock` guards everything. Writers hold it only for a HashMap
/// update, so contention isn't worth optimising for here.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops a user outright. Accounts are never deleted over HTTP; this
    /// exists so tests can check what happens to tokens of vanished users.
    pub async fn delete_user(&self, id: Uuid) -> bool {
        let mut inner = self.inner.write().await;
        match inner.users.remove(&id) {
            Some(user) => {
                inner.by_name.remove(&user.user_name);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn register(&self, user_name: &str, password: &str) -> Result<User, StoreError> {
        // Hash before taking the lock. Argon2 is deliberately slow.
        let password_hash =
            hash_password(password).map_err(|e| StoreError::Hashing(e.to_string()))?;

        let mut inner = self.inner.write().await;
        if inner.by_name.contains_key(user_name) {
            return Err(StoreError::DuplicateUsername);
        }

        let user = User {
            id: Uuid::new_v4(),
            user_name: user_name.to_string(),
            password_hash,
            favourites: Vec::new(),
            history: Vec::new(),
        };
        inner.by_name.insert(user.user_name.clone(), user.id);
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn check_credentials(
        &self,
        user_name: &str,
        password: &str,
    ) -> Result<User, StoreError> {
        let user = {
            let inner = self.inner.read().await;
            inner
                .by_name
                .get(user_name)
                .and_then(|id| inner.users.get(id))
                .cloned()
        };

        // Runs Argon2 even for unknown names so timing doesn't give them away.
        let matches = check_password(password, user.as_ref().map(|u| u.password_hash.as_str()));
        match user {
            None => Err(StoreError::NotFound),
            Some(user) if matches => Ok(user),
            Some(_) => Err(StoreError::BadCredentials),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        self.inner
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self, id: Uuid, collection: Collection) -> Result<Vec<String>, StoreError> {
        let user = self.find_by_id(id).await?;
        Ok(match collection {
            Collection::Favourites => user.favourites,
            Collection::History => user.history,
        })
    }

    async fn add(
        &self,
        id: Uuid,
        collection: Collection,
        item: &str,
    ) -> Result<Vec<String>, StoreError> {
        let mut inner = self.inner.write().await;
        let list = inner.collection_mut(id, collection)?;
        if !list.iter().any(|existing| existing == item) {
            list.push(item.to_string());
        }
        Ok(list.clone())
    }

    async fn remove(
        &self,
        id: Uuid,
        collection: Collection,
        item: &str,
    ) -> Result<Vec<String>, StoreError> {
        let mut inner = self.inner.write().await;
        let list = inner.collection_mut(id, collection)?;
        list.retain(|existing| existing != item);
        Ok(list.clone())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::{Duration, Instant};

    async fn store_with_alice() -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let user = store.register("alice", "p1").await.unwrap();
        (store, user.id)
    }

    #[tokio::test]
    async fn duplicate_register_fails_and_keeps_the_first_account() {
        let (store, id) = store_with_alice().await;

        let err = store.register("alice", "other").await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUsername));

        // The original password still works; the second one never got stored.
        let user = store.check_credentials("alice", "p1").await.unwrap();
        assert_eq!(user.id, id);
        assert!(matches!(
            store.check_credentials("alice", "other").await,
            Err(StoreError::BadCredentials)
        ));
    }

    #[tokio::test]
    async fn unknown_user_costs_as_much_as_a_wrong_password() {
        let (store, _) = store_with_alice().await;
        // Warm up so the one-off dummy hash isn't counted.
        let _ = store.check_credentials("nobody", "wrong").await;

        let mut known = Duration::ZERO;
        let mut unknown = Duration::ZERO;
        for _ in 0..3 {
            let started = Instant::now();
            let _ = store.check_credentials("alice", "wrong").await;
            known += started.elapsed();

            let started = Instant::now();
            let _ = store.check_credentials("nobody", "wrong").await;
            unknown += started.elapsed();
        }

        // Both paths do one Argon2 verification. Generous bound for noisy CI.
        assert!(
            unknown * 4 >= known,
            "unknown user took {unknown:?}, known user with wrong password {known:?}"
        );
    }

    #[tokio::test]
    async fn user_names_are_case_sensitive() {
        let (store, _) = store_with_alice().await;
        assert!(store.register("Alice", "p1").await.is_ok());
    }

    #[tokio::test]
    async fn plaintext_password_is_never_stored() {
        let (store, id) = store_with_alice().await;
        let user = store.find_by_id(id).await.unwrap();
        assert_ne!(user.password_hash, "p1");
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.check_credentials("nobody", "p1").await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.list(Uuid::new_v4(), Collection::History).await,
            Err(StoreError::NotFound)
        ));
    }

    #[rstest]
    #[case(Collection::Favourites)]
    #[case(Collection::History)]
    #[tokio::test]
    async fn add_is_idempotent(#[case] collection: Collection) {
        let (store, id) = store_with_alice().await;

        store.add(id, collection, "42").await.unwrap();
        store.add(id, collection, "7").await.unwrap();
        let list = store.add(id, collection, "42").await.unwrap();

        assert_eq!(list, vec!["42".to_string(), "7".to_string()]);
        assert_eq!(store.list(id, collection).await.unwrap(), list);
    }

    #[rstest]
    #[case(Collection::Favourites)]
    #[case(Collection::History)]
    #[tokio::test]
    async fn removing_an_absent_item_is_a_no_op(#[case] collection: Collection) {
        let (store, id) = store_with_alice().await;
        store.add(id, collection, "42").await.unwrap();

        let list = store.remove(id, collection, "99").await.unwrap();
        assert_eq!(list, vec!["42".to_string()]);

        let list = store.remove(id, collection, "42").await.unwrap();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn collections_are_independent() {
        let (store, id) = store_with_alice().await;
        store.add(id, Collection::Favourites, "1").await.unwrap();

        assert!(store.list(id, Collection::History).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleted_user_disappears() {
        let (store, id) = store_with_alice().await;
        assert!(store.delete_user(id).await);
        assert!(matches!(store.find_by_id(id).await, Err(StoreError::NotFound)));
        assert!(store.register("alice", "again").await.is_ok());
    }
}
