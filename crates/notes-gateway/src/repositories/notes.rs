//! Note store.

use crate::repositories::StoreError;
use chrono::{DateTime, Utc};
use common::types::NoteId;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::instrument;

/// Maximum number of notes returned by the latest-notes query.
pub const LATEST_NOTES_LIMIT: usize = 1000;

/// A stored note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: NoteId,
    /// Subject of the owning principal.
    pub owner: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Note {
    /// A note is live while it has no expiry or `now < expires_at`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires_at| now < expires_at)
    }
}

/// Note persistence.
///
/// Ownership is part of every lookup: a note owned by someone else is
/// indistinguishable from an absent one.
#[async_trait::async_trait]
pub trait NoteStore: Send + Sync {
    /// Store a new note.
    async fn insert(&self, note: Note) -> Result<(), StoreError>;

    /// Fetch a note owned by `owner`.
    async fn find_owned(&self, owner: &str, id: NoteId) -> Result<Option<Note>, StoreError>;

    /// Replace an owned note. Returns `false` if it is absent or not owned.
    async fn update_owned(&self, owner: &str, note: Note) -> Result<bool, StoreError>;

    /// Delete an owned note. Returns `false` if it is absent or not owned.
    async fn delete_owned(&self, owner: &str, id: NoteId) -> Result<bool, StoreError>;

    /// Live notes of `owner` at `now`, newest first, at most `limit`.
    async fn latest_for_owner(
        &self,
        owner: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Note>, StoreError>;
}

/// Process-local note store.
#[derive(Debug, Default)]
pub struct InMemoryNoteStore {
    notes: RwLock<HashMap<NoteId, Note>>,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl NoteStore for InMemoryNoteStore {
    #[instrument(skip_all, name = "gateway.repositories.notes.insert")]
    async fn insert(&self, note: Note) -> Result<(), StoreError> {
        let mut notes = self.notes.write().await;
        if notes.contains_key(&note.id) {
            return Err(StoreError::Duplicate("Note already exists".to_string()));
        }
        notes.insert(note.id, note);
        Ok(())
    }

    #[instrument(skip_all, name = "gateway.repositories.notes.find_owned")]
    async fn find_owned(&self, owner: &str, id: NoteId) -> Result<Option<Note>, StoreError> {
        Ok(self
            .notes
            .read()
            .await
            .get(&id)
            .filter(|n| n.owner == owner)
            .cloned())
    }

    #[instrument(skip_all, name = "gateway.repositories.notes.update_owned")]
    async fn update_owned(&self, owner: &str, note: Note) -> Result<bool, StoreError> {
        let mut notes = self.notes.write().await;
        match notes.get_mut(&note.id) {
            Some(existing) if existing.owner == owner && note.owner == owner => {
                *existing = note;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    #[instrument(skip_all, name = "gateway.repositories.notes.delete_owned")]
    async fn delete_owned(&self, owner: &str, id: NoteId) -> Result<bool, StoreError> {
        let mut notes = self.notes.write().await;
        if notes.get(&id).is_some_and(|n| n.owner == owner) {
            notes.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    #[instrument(skip_all, name = "gateway.repositories.notes.latest_for_owner")]
    async fn latest_for_owner(
        &self,
        owner: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Note>, StoreError> {
        let mut live: Vec<Note> = self
            .notes
            .read()
            .await
            .values()
            .filter(|n| n.owner == owner && n.is_live_at(now))
            .cloned()
            .collect();

        live.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        live.truncate(limit);
        Ok(live)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn note(owner: &str, title: &str, created: i64, expires: Option<i64>) -> Note {
        Note {
            id: NoteId::new(),
            owner: owner.to_string(),
            title: title.to_string(),
            content: String::new(),
            created_at: at(created),
            expires_at: expires.map(at),
        }
    }

    #[tokio::test]
    async fn test_find_owned_hides_foreign_notes() {
        let store = InMemoryNoteStore::new();
        let n = note("alice", "t", 0, None);
        store.insert(n.clone()).await.unwrap();

        assert_eq!(store.find_owned("alice", n.id).await.unwrap(), Some(n.clone()));
        assert!(store.find_owned("bob", n.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_and_delete_require_ownership() {
        let store = InMemoryNoteStore::new();
        let n = note("alice", "t", 0, None);
        store.insert(n.clone()).await.unwrap();

        let mut stolen = n.clone();
        stolen.owner = "bob".to_string();
        assert!(!store.update_owned("bob", stolen).await.unwrap());
        assert!(!store.delete_owned("bob", n.id).await.unwrap());

        let mut edited = n.clone();
        edited.title = "edited".to_string();
        assert!(store.update_owned("alice", edited).await.unwrap());
        assert_eq!(store.find_owned("alice", n.id).await.unwrap().unwrap().title, "edited");

        assert!(store.delete_owned("alice", n.id).await.unwrap());
        assert!(store.find_owned("alice", n.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_filters_expired_and_orders_newest_first() {
        let store = InMemoryNoteStore::new();
        store.insert(note("alice", "old", 10, None)).await.unwrap();
        store.insert(note("alice", "new", 20, Some(1_000))).await.unwrap();
        store.insert(note("alice", "expired", 30, Some(50))).await.unwrap();
        store.insert(note("bob", "other", 40, None)).await.unwrap();

        let latest = store.latest_for_owner("alice", at(100), LATEST_NOTES_LIMIT).await.unwrap();
        let titles: Vec<_> = latest.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn test_latest_respects_limit() {
        let store = InMemoryNoteStore::new();
        for i in 0..5 {
            store.insert(note("alice", "t", i, None)).await.unwrap();
        }
        let latest = store.latest_for_owner("alice", at(100), 3).await.unwrap();
        assert_eq!(latest.len(), 3);
        assert_eq!(latest[0].created_at, at(4));
    }

    #[test]
    fn test_expiry_boundary() {
        let n = note("alice", "t", 0, Some(60));
        assert!(n.is_live_at(at(59)));
        assert!(!n.is_live_at(at(60)));
        assert!(note("alice", "t", 0, None).is_live_at(at(0) + Duration::days(10_000)));
    }
}
