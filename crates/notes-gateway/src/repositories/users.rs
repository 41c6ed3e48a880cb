//! Credential store.
//!
//! Holds registered principals. The request pipeline only ever calls
//! [`CredentialStore::find_by_subject`]; registration and login use the
//! username lookups.

use crate::repositories::StoreError;
use common::types::UserId;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;
use tracing::instrument;

/// A registered principal.
#[derive(Clone)]
pub struct UserRecord {
    /// Stable user key, the token subject.
    pub id: UserId,

    /// Unique login name.
    pub username: String,

    /// Password hash produced by the configured `PasswordHasher`.
    pub password_hash: String,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

/// Lookup and registration of principals.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find a principal by token subject (the user key as a string).
    ///
    /// Subjects that are not a valid user key resolve to `None`.
    async fn find_by_subject(&self, subject: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Find a principal by login name.
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Insert a new principal.
    ///
    /// Fails with `StoreError::Duplicate` if the username is taken.
    async fn insert(&self, record: UserRecord) -> Result<(), StoreError>;

    /// Remove a principal. Returns whether it existed.
    async fn remove(&self, id: UserId) -> Result<bool, StoreError>;
}

/// Process-local credential store.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<UserId, UserRecord>>,
}

impl InMemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered principals.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Whether no principal is registered.
    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl CredentialStore for InMemoryCredentialStore {
    #[instrument(skip_all, name = "gateway.repositories.users.find_by_subject")]
    async fn find_by_subject(&self, subject: &str) -> Result<Option<UserRecord>, StoreError> {
        let Ok(id) = subject.parse::<UserId>() else {
            return Ok(None);
        };
        Ok(self.users.read().await.get(&id).cloned())
    }

    #[instrument(skip_all, name = "gateway.repositories.users.find_by_username")]
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    #[instrument(skip_all, name = "gateway.repositories.users.insert")]
    async fn insert(&self, record: UserRecord) -> Result<(), StoreError> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.username == record.username) {
            return Err(StoreError::Duplicate("User already exists".to_string()));
        }

        users.insert(record.id, record);
        Ok(())
    }

    #[instrument(skip_all, name = "gateway.repositories.users.remove")]
    async fn remove(&self, id: UserId) -> Result<bool, StoreError> {
        Ok(self.users.write().await.remove(&id).is_some())
    }
}
