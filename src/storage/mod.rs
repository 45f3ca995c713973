//! Persistence ports and their adapters.
//!
//! Handlers only see the traits below through [`SharedStore`]. Production wires
//! [`PgStore`]; tests use [`MemoryStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fmt, sync::Arc};
use thiserror::Error;
use utoipa::ToSchema;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Database id of a registered user.
#[derive(ToSchema, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stored credentials. The hash is an opaque PHC string.
#[derive(Clone)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(ToSchema, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: i64,
    pub user_id: UserId,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Public snapshot of a note, detached from its author.
#[derive(ToSchema, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub id: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. A taken username yields [`StoreError::Conflict`].
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<UserId, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;
}

/// Notes are always addressed through their owner; other users' notes do not exist.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Newest first.
    async fn list_notes(&self, owner: UserId) -> Result<Vec<Note>, StoreError>;

    async fn create_note(
        &self,
        owner: UserId,
        title: &str,
        content: &str,
    ) -> Result<Note, StoreError>;

    async fn get_note(&self, owner: UserId, id: i64) -> Result<Option<Note>, StoreError>;

    /// Returns `None` when no note with `id` belongs to `owner`.
    async fn update_note(
        &self,
        owner: UserId,
        id: i64,
        title: &str,
        content: &str,
    ) -> Result<Option<Note>, StoreError>;
}

#[async_trait]
pub trait ShareLinkStore: Send + Sync {
    async fn create_share_link(&self, link: &ShareLink) -> Result<(), StoreError>;

    async fn get_share_link(&self, id: &str) -> Result<Option<ShareLink>, StoreError>;
}

#[async_trait]
pub trait Store: UserStore + NoteStore + ShareLinkStore {
    /// Round-trip to the backing store.
    async fn ping(&self) -> Result<(), StoreError>;
}

pub type SharedStore = Arc<dyn Store>;
