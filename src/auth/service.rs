//! Authentication service
//!
//! Registration, login, refresh-token rotation and logout. Handlers only talk
//! to this type; it owns the codec, the hasher and both repositories.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::auth::claims::TokenKind;
use crate::auth::jwt::TokenCodec;
use crate::auth::models::{NewUser, TokenPair, User, UserId};
use crate::auth::password::{validate_password_strength, PasswordHasher};
use crate::auth::refresh_token::RefreshTokenStore;
use crate::auth::repository::{RefreshTokenRepository, UserRepository};
use crate::error::{AppError, AuthError};
use crate::validators::is_valid_email;

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    refresh_tokens: RefreshTokenStore,
    codec: Arc<TokenCodec>,
    hasher: Arc<PasswordHasher>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        codec: Arc<TokenCodec>,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            users,
            refresh_tokens: RefreshTokenStore::new(refresh_tokens),
            codec,
            hasher: Arc::new(hasher),
        }
    }

    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    pub fn refresh_tokens(&self) -> &RefreshTokenStore {
        &self.refresh_tokens
    }

    /// Create an account
    ///
    /// The password is hashed before it reaches storage.
    ///
    /// # Errors
    /// * `Validation` - malformed email or password below policy
    /// * `DatabaseError::UniqueConstraintViolation` - email already registered
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AppError> {
        let email = is_valid_email(email)?;
        validate_password_strength(password)?;

        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        let password_hash = run_blocking(move || hasher.encode(&password)).await??;
        let user = self
            .users
            .save(NewUser {
                email,
                password_hash,
            })
            .await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Exchange email and password for a token pair
    ///
    /// Unknown email and wrong password fail identically, and both run one
    /// bcrypt comparison.
    ///
    /// # Errors
    /// * `AuthError::BadCredentials` - unknown email or wrong password
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AppError> {
        let user = self.users.find_by_email(email.trim()).await?;

        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
        let matched = run_blocking(move || match stored_hash {
            Some(hash) => hasher.matches(&password, &hash),
            None => {
                hasher.burn_decoy(&password);
                false
            }
        })
        .await?;

        let user = match user {
            Some(user) if matched => user,
            _ => return Err(AuthError::BadCredentials.into()),
        };

        let (pair, refresh_expires_at) = self.issue_pair(&user.id)?;
        self.refresh_tokens
            .persist(&user.id, &pair.refresh_token, refresh_expires_at)
            .await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(pair)
    }

    /// Rotate a refresh token into a new token pair
    ///
    /// # Errors
    /// * `AuthError::InvalidToken` - bad signature, wrong type, expired, or
    ///   the subject no longer exists
    /// * `AuthError::RefreshNotRecognized` - no live stored record (replay or
    ///   a token this server never persisted)
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let user = self.authenticate_refresh_token(refresh_token).await?;

        let (pair, refresh_expires_at) = self.issue_pair(&user.id)?;
        let rotated = self
            .refresh_tokens
            .rotate(&user.id, refresh_token, &pair.refresh_token, refresh_expires_at)
            .await?;

        if !rotated {
            return Err(AuthError::RefreshNotRecognized.into());
        }

        tracing::info!(user_id = %user.id, "Token refreshed");
        Ok(pair)
    }

    /// End the session behind a refresh token
    ///
    /// # Errors
    /// Same conditions as [`AuthService::refresh`]
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        let user = self.authenticate_refresh_token(refresh_token).await?;

        if self.refresh_tokens.consume(&user.id, refresh_token).await?.is_none() {
            return Err(AuthError::RefreshNotRecognized.into());
        }

        tracing::info!(user_id = %user.id, "User logged out");
        Ok(())
    }

    /// Signature, type and expiry gate, then the owning user
    async fn authenticate_refresh_token(&self, refresh_token: &str) -> Result<User, AppError> {
        if self.codec.verify(refresh_token, TokenKind::Refresh).is_none() {
            return Err(AuthError::InvalidToken.into());
        }

        let subject = self.codec.extract_subject(refresh_token)?;
        let user_id = UserId::parse(&subject).map_err(|_| {
            tracing::warn!("Refresh token subject is not a user id");
            AuthError::InvalidToken
        })?;

        self.users.find_by_id(&user_id).await?.ok_or_else(|| {
            tracing::warn!(user_id = %user_id, "Refresh token for unknown user");
            AuthError::InvalidToken.into()
        })
    }

    fn issue_pair(&self, user_id: &UserId) -> Result<(TokenPair, DateTime<Utc>), AppError> {
        let subject = user_id.to_string();
        let access_token = self.codec.issue_access_token(&subject)?;
        let refresh_token = self.codec.issue_refresh_token(&subject)?;
        let refresh_expires_at = Utc::now() + self.codec.refresh_token_validity();

        Ok((
            TokenPair {
                access_token,
                refresh_token,
            },
            refresh_expires_at,
        ))
    }
}

/// Run bcrypt work off the async worker threads
async fn run_blocking<F, T>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))
}
