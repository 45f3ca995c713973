use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Connection, PgPool};
use tracing::{info_span, Instrument};

use super::{
    Note, NoteStore, ShareLink, ShareLinkStore, Store, StoreError, UserId, UserRecord, UserStore,
};

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
}

#[derive(sqlx::FromRow)]
struct NoteRow {
    id: i64,
    user_id: i64,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<NoteRow> for Note {
    fn from(row: NoteRow) -> Self {
        Self {
            id: row.id,
            user_id: UserId::new(row.user_id),
            title: row.title,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ShareLinkRow {
    id: String,
    title: String,
    content: String,
}

fn db_span(operation: &'static str) -> tracing::Span {
    info_span!("db.query", db.system = "postgresql", db.operation = operation)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<UserId, StoreError> {
        let query = "INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING id";
        let id: i64 = sqlx::query_scalar(query)
            .bind(username)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT"))
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StoreError::Conflict(format!("username {username} already exists"))
                } else {
                    StoreError::Database(err)
                }
            })?;

        Ok(UserId::new(id))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let query = "SELECT id, username, password_hash FROM users WHERE username = $1";
        let row = sqlx::query_as::<_, UserRow>(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT"))
            .await?;

        Ok(row.map(|row| UserRecord {
            id: UserId::new(row.id),
            username: row.username,
            password_hash: row.password_hash,
        }))
    }
}

#[async_trait]
impl NoteStore for PgStore {
    async fn list_notes(&self, owner: UserId) -> Result<Vec<Note>, StoreError> {
        let query = r"
            SELECT id, user_id, title, content, created_at
            FROM notes
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
        ";
        let rows = sqlx::query_as::<_, NoteRow>(query)
            .bind(owner.get())
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT"))
            .await?;

        Ok(rows.into_iter().map(Note::from).collect())
    }

    async fn create_note(
        &self,
        owner: UserId,
        title: &str,
        content: &str,
    ) -> Result<Note, StoreError> {
        let query = r"
            INSERT INTO notes (user_id, title, content)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, title, content, created_at
        ";
        let row = sqlx::query_as::<_, NoteRow>(query)
            .bind(owner.get())
            .bind(title)
            .bind(content)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT"))
            .await?;

        Ok(row.into())
    }

    async fn get_note(&self, owner: UserId, id: i64) -> Result<Option<Note>, StoreError> {
        let query = r"
            SELECT id, user_id, title, content, created_at
            FROM notes
            WHERE id = $1 AND user_id = $2
        ";
        let row = sqlx::query_as::<_, NoteRow>(query)
            .bind(id)
            .bind(owner.get())
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT"))
            .await?;

        Ok(row.map(Note::from))
    }

    async fn update_note(
        &self,
        owner: UserId,
        id: i64,
        title: &str,
        content: &str,
    ) -> Result<Option<Note>, StoreError> {
        let query = r"
            UPDATE notes
            SET title = $3, content = $4
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, content, created_at
        ";
        let row = sqlx::query_as::<_, NoteRow>(query)
            .bind(id)
            .bind(owner.get())
            .bind(title)
            .bind(content)
            .fetch_optional(&self.pool)
            .instrument(db_span("UPDATE"))
            .await?;

        Ok(row.map(Note::from))
    }
}

#[async_trait]
impl ShareLinkStore for PgStore {
    async fn create_share_link(&self, link: &ShareLink) -> Result<(), StoreError> {
        let query = "INSERT INTO share_links (id, title, content) VALUES ($1, $2, $3)";
        sqlx::query(query)
            .bind(&link.id)
            .bind(&link.title)
            .bind(&link.content)
            .execute(&self.pool)
            .instrument(db_span("INSERT"))
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StoreError::Conflict(format!("share link {} already exists", link.id))
                } else {
                    StoreError::Database(err)
                }
            })?;

        Ok(())
    }

    async fn get_share_link(&self, id: &str) -> Result<Option<ShareLink>, StoreError> {
        let query = "SELECT id, title, content FROM share_links WHERE id = $1";
        let row = sqlx::query_as::<_, ShareLinkRow>(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT"))
            .await?;

        Ok(row.map(|row| ShareLink {
            id: row.id,
            title: row.title,
            content: row.content,
        }))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;

        Ok(())
    }
}
