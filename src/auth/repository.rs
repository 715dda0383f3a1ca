//! Persistence ports for the authentication core
//!
//! Implemented by `persistence::postgres` and `persistence::memory`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::auth::models::{NewUser, RefreshTokenRecord, User, UserId};
use crate::error::AppError;

/// Storage for user accounts
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist a new user
    ///
    /// # Errors
    /// * `DatabaseError::UniqueConstraintViolation` - email already registered
    /// * `DatabaseError::Unavailable` / `Query` - storage failure
    async fn save(&self, user: NewUser) -> Result<User, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AppError>;
}

/// Storage for refresh token fingerprints
///
/// Every lookup takes `now` and ignores records with `expires_at <= now`.
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync + 'static {
    async fn save(&self, record: RefreshTokenRecord) -> Result<(), AppError>;

    async fn find_by_user_id_and_hash(
        &self,
        user_id: &UserId,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>, AppError>;

    /// Delete the live matching record and return it, as one atomic step
    ///
    /// Of several concurrent callers at most one gets `Some`.
    async fn delete_by_user_id_and_hash(
        &self,
        user_id: &UserId,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>, AppError>;

    /// Delete the live record matching `old_hash` and store `replacement`
    ///
    /// Both effects apply or neither does. Returns `false` (and stores
    /// nothing) when no live record matched.
    async fn rotate(
        &self,
        user_id: &UserId,
        old_hash: &str,
        replacement: RefreshTokenRecord,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// Physically remove records with `expires_at <= now`
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}
