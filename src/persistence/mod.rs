//! Storage engines for users, refresh token fingerprints and notes

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryNoteRepository, InMemoryRefreshTokenRepository, InMemoryUserRepository};
pub use postgres::{PgNoteRepository, PgRefreshTokenRepository, PgUserRepository};
