/// Authentication module
///
/// Token issuing and verification, password hashing, refresh token
/// fingerprints and the register/login/refresh/logout flows.

pub mod claims;
pub mod jwt;
pub mod models;
pub mod password;
pub mod refresh_token;
pub mod repository;
pub mod service;

pub use claims::{Claims, TokenKind};
pub use jwt::{TokenCodec, BEARER_PREFIX};
pub use models::{NewUser, RefreshTokenRecord, TokenPair, User, UserId};
pub use password::PasswordHasher;
pub use refresh_token::RefreshTokenStore;
pub use repository::{RefreshTokenRepository, UserRepository};
pub use service::AuthService;
