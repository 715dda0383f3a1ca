/// JWT Claims structure
///
/// The payload carried by both access and refresh tokens. The two are told
/// apart only by the `type` claim, so every check of a token's purpose goes
/// through `TokenKind`.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Purpose of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID, lowercase hex)
    pub sub: String,
    /// Token type tag
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Unique token ID
    pub jti: String,
}

impl Claims {
    /// Create claims valid from now for `validity`
    pub fn new(subject: &str, kind: TokenKind, validity: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: subject.to_string(),
            kind,
            iat: now.timestamp(),
            exp: (now + validity).timestamp(),
            jti: Uuid::new_v4().simple().to_string(),
        }
    }

    /// A token is usable only while `exp > now`
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp <= now
    }
}
