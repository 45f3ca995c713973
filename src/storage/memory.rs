use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::{
    Note, NoteStore, ShareLink, ShareLinkStore, Store, StoreError, UserId, UserRecord, UserStore,
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<UserRecord>,
    notes: Vec<Note>,
    share_links: HashMap<String, ShareLink>,
    next_user_id: i64,
    next_note_id: i64,
}

/// In-process store for tests and local experiments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store set to fail".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<UserId, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        if tables.users.iter().any(|user| user.username == username) {
            return Err(StoreError::Conflict(format!(
                "username {username} already exists"
            )));
        }
        tables.next_user_id += 1;
        let id = UserId::new(tables.next_user_id);
        tables.users.push(UserRecord {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        });
        Ok(id)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn list_notes(&self, owner: UserId) -> Result<Vec<Note>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().await;
        let mut notes: Vec<Note> = tables
            .notes
            .iter()
            .filter(|note| note.user_id == owner)
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(notes)
    }

    async fn create_note(
        &self,
        owner: UserId,
        title: &str,
        content: &str,
    ) -> Result<Note, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        tables.next_note_id += 1;
        let note = Note {
            id: tables.next_note_id,
            user_id: owner,
            title: title.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        tables.notes.push(note.clone());
        Ok(note)
    }

    async fn get_note(&self, owner: UserId, id: i64) -> Result<Option<Note>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .notes
            .iter()
            .find(|note| note.id == id && note.user_id == owner)
            .cloned())
    }

    async fn update_note(
        &self,
        owner: UserId,
        id: i64,
        title: &str,
        content: &str,
    ) -> Result<Option<Note>, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        let Some(note) = tables
            .notes
            .iter_mut()
            .find(|note| note.id == id && note.user_id == owner)
        else {
            return Ok(None);
        };
        note.title = title.to_string();
        note.content = content.to_string();
        Ok(Some(note.clone()))
    }
}

#[async_trait]
impl ShareLinkStore for MemoryStore {
    async fn create_share_link(&self, link: &ShareLink) -> Result<(), StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        if tables.share_links.contains_key(&link.id) {
            return Err(StoreError::Conflict(format!(
                "share link {} already exists",
                link.id
            )));
        }
        tables.share_links.insert(link.id.clone(), link.clone());
        Ok(())
    }

    async fn get_share_link(&self, id: &str) -> Result<Option<ShareLink>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables.share_links.get(id).cloned())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check()
    }
}
