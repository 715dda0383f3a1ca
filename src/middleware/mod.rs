/// Middleware module
///
/// Request identity binding for authenticated routes.

mod identity;

pub use identity::{bearer_token, AuthenticatedUser, IdentityMiddleware, CREDENTIAL_HEADER};
