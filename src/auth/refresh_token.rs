/// Refresh Token Store
///
/// Refresh tokens are stored only as fingerprints:
/// - base64(SHA-256(raw token)), never the plaintext
/// - keyed by owning user, with an expiry
/// - single-use: consumed on rotation, so a replayed token finds nothing

use std::sync::Arc;

use base64::Engine;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::auth::models::{RefreshTokenRecord, UserId};
use crate::auth::repository::RefreshTokenRepository;
use crate::error::AppError;

/// Fingerprint a raw refresh token
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(digest)
}

#[derive(Clone)]
pub struct RefreshTokenStore {
    repository: Arc<dyn RefreshTokenRepository>,
}

impl RefreshTokenStore {
    pub fn new(repository: Arc<dyn RefreshTokenRepository>) -> Self {
        Self { repository }
    }

    /// Store the fingerprint of a freshly issued token
    ///
    /// # Errors
    /// Returns error if the database operation fails
    pub async fn persist(
        &self,
        user_id: &UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let record = RefreshTokenRecord::new(*user_id, hash_token(token), expires_at);
        self.repository.save(record).await
    }

    /// Look up the live record for a token
    pub async fn find(
        &self,
        user_id: &UserId,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        self.repository
            .find_by_user_id_and_hash(user_id, &hash_token(token), Utc::now())
            .await
    }

    /// Atomically find and delete the live record for a token
    ///
    /// `None` means the token was already used, expired, or never issued here.
    pub async fn consume(
        &self,
        user_id: &UserId,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let consumed = self
            .repository
            .delete_by_user_id_and_hash(user_id, &hash_token(token), Utc::now())
            .await?;

        if consumed.is_none() {
            tracing::warn!(user_id = %user_id, "Refresh token not recognized");
        }

        Ok(consumed)
    }

    /// Consume `old_token` and persist `new_token` as one unit
    ///
    /// Returns `false` when `old_token` has no live record; nothing is
    /// persisted in that case.
    pub async fn rotate(
        &self,
        user_id: &UserId,
        old_token: &str,
        new_token: &str,
        new_expires_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let replacement = RefreshTokenRecord::new(*user_id, hash_token(new_token), new_expires_at);

        let rotated = self
            .repository
            .rotate(user_id, &hash_token(old_token), replacement, Utc::now())
            .await?;

        if !rotated {
            tracing::warn!(user_id = %user_id, "Refresh token reuse or unknown token");
        }

        Ok(rotated)
    }

    /// Remove expired fingerprints
    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        let purged = self.repository.delete_expired(Utc::now()).await?;
        tracing::debug!(purged, "Expired refresh tokens purged");
        Ok(purged)
    }
}
