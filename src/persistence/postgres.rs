//! PostgreSQL storage engine
//!
//! Schema lives in `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::models::{NewUser, RefreshTokenRecord, User, UserId};
use crate::auth::repository::{RefreshTokenRepository, UserRepository};
use crate::error::AppError;
use crate::notes::{Note, NoteId, NoteRepository};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id.into(),
            email: row.email,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    user_id: Uuid,
    token_hash: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshTokenRecord {
    fn from(row: RefreshTokenRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id.into(),
            token_hash: row.token_hash,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct NoteRow {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    content: String,
    color: i64,
    created_at: DateTime<Utc>,
}

impl From<NoteRow> for Note {
    fn from(row: NoteRow) -> Self {
        Self {
            id: row.id.into(),
            owner_id: row.owner_id.into(),
            title: row.title,
            content: row.content,
            color: row.color,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn save(&self, user: NewUser) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(UserId::generate().as_uuid())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }
}

#[derive(Clone)]
pub struct PgRefreshTokenRepository {
    pool: PgPool,
}

impl PgRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const DELETE_LIVE_TOKEN: &str = r#"
    DELETE FROM refresh_tokens
    WHERE user_id = $1 AND token_hash = $2 AND expires_at > $3
    RETURNING id, user_id, token_hash, expires_at, created_at
"#;

const INSERT_TOKEN: &str = r#"
    INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at)
    VALUES ($1, $2, $3, $4, $5)
"#;

#[async_trait]
impl RefreshTokenRepository for PgRefreshTokenRepository {
    async fn save(&self, record: RefreshTokenRecord) -> Result<(), AppError> {
        sqlx::query(INSERT_TOKEN)
            .bind(record.id)
            .bind(record.user_id.as_uuid())
            .bind(&record.token_hash)
            .bind(record.expires_at)
            .bind(record.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_by_user_id_and_hash(
        &self,
        user_id: &UserId,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT id, user_id, token_hash, expires_at, created_at
            FROM refresh_tokens
            WHERE user_id = $1 AND token_hash = $2 AND expires_at > $3
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RefreshTokenRecord::from))
    }

    async fn delete_by_user_id_and_hash(
        &self,
        user_id: &UserId,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(DELETE_LIVE_TOKEN)
            .bind(user_id.as_uuid())
            .bind(token_hash)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(RefreshTokenRecord::from))
    }

    async fn rotate(
        &self,
        user_id: &UserId,
        old_hash: &str,
        replacement: RefreshTokenRecord,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let consumed = sqlx::query_as::<_, RefreshTokenRow>(DELETE_LIVE_TOKEN)
            .bind(user_id.as_uuid())
            .bind(old_hash)
            .bind(now)
            .fetch_optional(&mut tx)
            .await?;

        if consumed.is_none() {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(INSERT_TOKEN)
            .bind(replacement.id)
            .bind(replacement.user_id.as_uuid())
            .bind(&replacement.token_hash)
            .bind(replacement.expires_at)
            .bind(replacement.created_at)
            .execute(&mut tx)
            .await?;

        tx.commit().await?;

        Ok(true)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[derive(Clone)]
pub struct PgNoteRepository {
    pool: PgPool,
}

impl PgNoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn save(&self, note: Note) -> Result<Option<Note>, AppError> {
        // No row comes back when the id exists under another owner
        let row = sqlx::query_as::<_, NoteRow>(
            r#"
            INSERT INTO notes (id, owner_id, title, content, color, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
                SET title = EXCLUDED.title,
                    content = EXCLUDED.content,
                    color = EXCLUDED.color
                WHERE notes.owner_id = EXCLUDED.owner_id
            RETURNING id, owner_id, title, content, color, created_at
            "#,
        )
        .bind(note.id.as_uuid())
        .bind(note.owner_id.as_uuid())
        .bind(&note.title)
        .bind(&note.content)
        .bind(note.color)
        .bind(note.created_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Note::from))
    }

    async fn find_by_id(&self, id: &NoteId) -> Result<Option<Note>, AppError> {
        let row = sqlx::query_as::<_, NoteRow>(
            "SELECT id, owner_id, title, content, color, created_at FROM notes WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Note::from))
    }

    async fn find_by_owner_id(&self, owner_id: &UserId) -> Result<Vec<Note>, AppError> {
        let rows = sqlx::query_as::<_, NoteRow>(
            r#"
            SELECT id, owner_id, title, content, color, created_at
            FROM notes
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Note::from).collect())
    }

    async fn delete_by_id(&self, id: &NoteId) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
