//! Notes owned by users

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::models::UserId;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteId(Uuid);

impl NoteId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(value).map(Self)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for NoteId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for NoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: NoteId,
    pub owner_id: UserId,
    pub title: String,
    pub content: String,
    /// ARGB color value
    pub color: i64,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait NoteRepository: Send + Sync + 'static {
    /// Insert the note, or update it if it exists and has the same owner
    ///
    /// Returns `None` when a note with this id belongs to someone else.
    async fn save(&self, note: Note) -> Result<Option<Note>, AppError>;

    async fn find_by_id(&self, id: &NoteId) -> Result<Option<Note>, AppError>;

    /// Newest first
    async fn find_by_owner_id(&self, owner_id: &UserId) -> Result<Vec<Note>, AppError>;

    /// Returns whether a note was removed
    async fn delete_by_id(&self, id: &NoteId) -> Result<bool, AppError>;
}
