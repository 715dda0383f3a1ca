/// JWT Token Generation and Validation
///
/// `TokenCodec` issues and verifies HS256-signed access and refresh tokens.
/// The signing key is handed in at construction; nothing here reads global
/// state.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::{Claims, TokenKind};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// Scheme label accepted in front of a token
pub const BEARER_PREFIX: &str = "Bearer ";

pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_validity: Duration,
    refresh_token_validity: Duration,
}

impl TokenCodec {
    /// Create a codec signing with the raw `key` bytes
    pub fn new(key: &[u8], access_token_validity: Duration, refresh_token_validity: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
            access_token_validity,
            refresh_token_validity,
        }
    }

    /// Create a shared codec from configuration
    ///
    /// # Errors
    /// Returns error if the configured secret is not a usable key or a token
    /// lifetime is out of range
    pub fn from_settings(settings: &JwtSettings) -> Result<Arc<Self>, AppError> {
        let key = settings.signing_key()?;
        let access_token_validity = settings.access_token_validity()?;
        let refresh_token_validity = settings.refresh_token_validity()?;

        Ok(Arc::new(Self::new(&key, access_token_validity, refresh_token_validity)))
    }

    pub fn access_token_validity(&self) -> Duration {
        self.access_token_validity
    }

    pub fn refresh_token_validity(&self) -> Duration {
        self.refresh_token_validity
    }

    /// Sign a token of the given kind for `subject`, expiring after `validity`
    ///
    /// # Errors
    /// Returns error if token encoding fails
    pub fn issue(&self, subject: &str, kind: TokenKind, validity: Duration) -> Result<String, AppError> {
        let claims = Claims::new(subject, kind, validity);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    pub fn issue_access_token(&self, subject: &str) -> Result<String, AppError> {
        self.issue(subject, TokenKind::Access, self.access_token_validity)
    }

    pub fn issue_refresh_token(&self, subject: &str) -> Result<String, AppError> {
        self.issue(subject, TokenKind::Refresh, self.refresh_token_validity)
    }

    /// Check signature, expiry and type tag; returns the subject on success
    ///
    /// Never fails loudly: any problem with the token yields `None`.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Option<String> {
        let claims = match self.decode_claims(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, expected = %expected, "Token rejected");
                return None;
            }
        };

        if claims.is_expired_at(Utc::now().timestamp()) {
            tracing::debug!(expected = %expected, "Token rejected: expired");
            return None;
        }

        if claims.kind != expected {
            tracing::warn!(
                expected = %expected,
                presented = %claims.kind,
                "Token rejected: wrong token type"
            );
            return None;
        }

        Some(claims.sub)
    }

    /// Parse and signature-check a token without a type constraint
    ///
    /// # Errors
    /// Returns `AuthError::InvalidToken` if the token cannot be parsed or
    /// its signature does not match
    pub fn extract_subject(&self, token: &str) -> Result<String, AuthError> {
        self.decode_claims(token)
            .map(|claims| claims.sub)
            .map_err(|e| {
                tracing::debug!(error = %e, "Subject extraction failed");
                AuthError::InvalidToken
            })
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(strip_scheme(token), &self.decoding_key, &validation).map(|data| data.claims)
    }
}

fn strip_scheme(token: &str) -> &str {
    token.strip_prefix(BEARER_PREFIX).unwrap_or(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &[u8] = b"test-secret-key-at-least-32-bytes-long";

    fn test_codec() -> TokenCodec {
        TokenCodec::new(TEST_KEY, Duration::minutes(15), Duration::days(30))
    }

    /// Replace the first character of the signature segment
    fn tamper_signature(token: &str) -> String {
        let dot = token.rfind('.').expect("token has three segments");
        let (head, signature) = token.split_at(dot + 1);
        let mut chars: Vec<char> = signature.chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        format!("{}{}", head, chars.into_iter().collect::<String>())
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let codec = test_codec();
        let token = codec.issue_access_token("5f1d7c2a9b3e4d6f8a0b1c2d3e4f5a6b").unwrap();

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(
            codec.verify(&token, TokenKind::Access).as_deref(),
            Some("5f1d7c2a9b3e4d6f8a0b1c2d3e4f5a6b")
        );
    }

    #[test]
    fn test_verify_accepts_bearer_prefix() {
        let codec = test_codec();
        let token = codec.issue_access_token("user-1").unwrap();

        let prefixed = format!("{}{}", BEARER_PREFIX, token);
        assert_eq!(codec.verify(&prefixed, TokenKind::Access).as_deref(), Some("user-1"));
    }

    #[test]
    fn test_access_token_is_not_a_refresh_token() {
        let codec = test_codec();
        let access = codec.issue_access_token("user-1").unwrap();
        let refresh = codec.issue_refresh_token("user-1").unwrap();

        assert!(codec.verify(&access, TokenKind::Refresh).is_none());
        assert!(codec.verify(&refresh, TokenKind::Access).is_none());
        assert!(codec.verify(&refresh, TokenKind::Refresh).is_some());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let codec = test_codec();
        let token = codec
            .issue("user-1", TokenKind::Refresh, Duration::seconds(-10))
            .unwrap();

        assert!(codec.verify(&token, TokenKind::Refresh).is_none());
        assert_eq!(codec.extract_subject(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_tampered_signature_is_rejected() {
        let codec = test_codec();
        let token = codec.issue_access_token("user-1").unwrap();

        let tampered = tamper_signature(&token);
        assert_ne!(tampered, token);
        assert!(codec.verify(&tampered, TokenKind::Access).is_none());
        assert!(codec.extract_subject(&tampered).is_err());
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let codec = test_codec();
        let other = TokenCodec::new(
            b"another-secret-key-at-least-32-bytes!!",
            Duration::minutes(15),
            Duration::days(30),
        );
        let token = other.issue_access_token("user-1").unwrap();

        assert!(codec.verify(&token, TokenKind::Access).is_none());
    }

    #[test]
    fn test_garbage_is_rejected() {
        let codec = test_codec();

        assert!(codec.verify("invalid.token.here", TokenKind::Access).is_none());
        assert!(codec.verify("", TokenKind::Access).is_none());
        assert_eq!(codec.extract_subject("Bearer nope"), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_extract_subject_ignores_type() {
        let codec = test_codec();
        let refresh = codec.issue_refresh_token("user-9").unwrap();

        assert_eq!(codec.extract_subject(&refresh).unwrap(), "user-9");
    }

    #[test]
    fn test_from_settings_uses_configured_validity() {
        use base64::Engine;

        let settings = JwtSettings {
            secret: base64::engine::general_purpose::STANDARD.encode(TEST_KEY),
            access_token_expiry: 60,
            refresh_token_expiry: 120,
        };
        let codec = TokenCodec::from_settings(&settings).unwrap();

        assert_eq!(codec.access_token_validity(), Duration::seconds(60));
        assert_eq!(codec.refresh_token_validity(), Duration::seconds(120));
        let token = codec.issue_access_token("user-1").unwrap();
        assert!(test_codec().verify(&token, TokenKind::Access).is_some());
    }

    #[test]
    fn test_from_settings_rejects_unusable_expiry() {
        use crate::error::ConfigError;
        use base64::Engine;

        let secret = base64::engine::general_purpose::STANDARD.encode(TEST_KEY);
        for (access, refresh) in [(0, 120), (60, -1), (60, 10_000_000_000_000)] {
            let settings = JwtSettings {
                secret: secret.clone(),
                access_token_expiry: access,
                refresh_token_expiry: refresh,
            };

            assert!(matches!(
                TokenCodec::from_settings(&settings),
                Err(AppError::Config(ConfigError::InvalidValue(_)))
            ));
        }
    }
}
