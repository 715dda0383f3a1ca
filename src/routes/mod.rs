mod auth;
mod health_check;
mod notes;

pub use auth::{login, logout, refresh, register, AuthResponse, UserResponse};
pub use health_check::health_check;
pub use notes::{delete_note, list_notes, save_note, NoteRequest, NoteResponse};
