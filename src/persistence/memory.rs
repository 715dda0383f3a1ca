//! In-process storage engine
//!
//! Backs the integration tests and `storage: memory` runs. Each repository
//! keeps its rows behind one mutex, which also makes the refresh-token
//! delete-and-insert atomic.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::auth::models::{NewUser, RefreshTokenRecord, User, UserId};
use crate::auth::repository::{RefreshTokenRepository, UserRepository};
use crate::error::{AppError, DatabaseError};
use crate::notes::{Note, NoteId, NoteRepository};

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, AppError> {
    mutex
        .lock()
        .map_err(|_| AppError::Internal(format!("{} store lock poisoned", name)))
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<UserId, User>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn save(&self, user: NewUser) -> Result<User, AppError> {
        let mut users = lock(&self.users, "user")?;

        if users.values().any(|existing| existing.email == user.email) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "Email already registered".to_string(),
            )
            .into());
        }

        let created = User {
            id: UserId::generate(),
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        users.insert(created.id, created.clone());

        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = lock(&self.users, "user")?;
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AppError> {
        let users = lock(&self.users, "user")?;
        Ok(users.get(id).cloned())
    }
}

/// Refresh token fingerprints keyed by hash
#[derive(Default)]
pub struct InMemoryRefreshTokenRepository {
    records: Mutex<HashMap<String, RefreshTokenRecord>>,
}

impl InMemoryRefreshTokenRepository {
    fn take_live(
        records: &mut HashMap<String, RefreshTokenRecord>,
        user_id: &UserId,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Option<RefreshTokenRecord> {
        let matches = records
            .get(token_hash)
            .map_or(false, |record| record.user_id == *user_id && record.is_live_at(now));

        if matches {
            records.remove(token_hash)
        } else {
            None
        }
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    async fn save(&self, record: RefreshTokenRecord) -> Result<(), AppError> {
        let mut records = lock(&self.records, "refresh token")?;
        records.insert(record.token_hash.clone(), record);
        Ok(())
    }

    async fn find_by_user_id_and_hash(
        &self,
        user_id: &UserId,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let records = lock(&self.records, "refresh token")?;
        Ok(records
            .get(token_hash)
            .filter(|record| record.user_id == *user_id && record.is_live_at(now))
            .cloned())
    }

    async fn delete_by_user_id_and_hash(
        &self,
        user_id: &UserId,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let mut records = lock(&self.records, "refresh token")?;
        Ok(Self::take_live(&mut records, user_id, token_hash, now))
    }

    async fn rotate(
        &self,
        user_id: &UserId,
        old_hash: &str,
        replacement: RefreshTokenRecord,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut records = lock(&self.records, "refresh token")?;

        if Self::take_live(&mut records, user_id, old_hash, now).is_none() {
            return Ok(false);
        }
        records.insert(replacement.token_hash.clone(), replacement);

        Ok(true)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut records = lock(&self.records, "refresh token")?;
        let before = records.len();
        records.retain(|_, record| record.is_live_at(now));
        Ok((before - records.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemoryNoteRepository {
    notes: Mutex<HashMap<NoteId, Note>>,
}

#[async_trait]
impl NoteRepository for InMemoryNoteRepository {
    async fn save(&self, note: Note) -> Result<Option<Note>, AppError> {
        let mut notes = lock(&self.notes, "note")?;

        let saved = match notes.get(&note.id) {
            Some(existing) if existing.owner_id != note.owner_id => return Ok(None),
            Some(existing) => Note {
                created_at: existing.created_at,
                ..note
            },
            None => note,
        };
        notes.insert(saved.id, saved.clone());

        Ok(Some(saved))
    }

    async fn find_by_id(&self, id: &NoteId) -> Result<Option<Note>, AppError> {
        let notes = lock(&self.notes, "note")?;
        Ok(notes.get(id).cloned())
    }

    async fn find_by_owner_id(&self, owner_id: &UserId) -> Result<Vec<Note>, AppError> {
        let notes = lock(&self.notes, "note")?;
        let mut owned: Vec<Note> = notes
            .values()
            .filter(|note| note.owner_id == *owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn delete_by_id(&self, id: &NoteId) -> Result<bool, AppError> {
        let mut notes = lock(&self.notes, "note")?;
        Ok(notes.remove(id).is_some())
    }
}
