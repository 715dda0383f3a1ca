/// Authentication Routes
///
/// Registration, login, token refresh and logout. All logic lives in
/// `AuthService`; handlers only translate JSON bodies.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::models::{TokenPair, User};
use crate::auth::service::AuthService;
use crate::error::AppError;

/// Registration and login body
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Body of refresh and logout
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token pair handed to the client
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

impl AuthResponse {
    fn new(pair: TokenPair, service: &AuthService) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: service.codec().access_token_validity().num_seconds(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// POST /auth/register
///
/// # Errors
/// - 400: invalid email or password below policy
/// - 409: email already registered
pub async fn register(
    body: web::Json<CredentialsRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let user = service.register(&body.email, &body.password).await?;
    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// POST /auth/login
///
/// Unknown email and wrong password produce the same 401 body.
pub async fn login(
    body: web::Json<CredentialsRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let pair = service.login(&body.email, &body.password).await?;
    Ok(HttpResponse::Ok().json(AuthResponse::new(pair, &service)))
}

/// POST /auth/refresh
///
/// The presented refresh token is consumed; reuse answers 401.
pub async fn refresh(
    body: web::Json<RefreshRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let pair = service.refresh(&body.refresh_token).await?;
    Ok(HttpResponse::Ok().json(AuthResponse::new(pair, &service)))
}

/// POST /auth/logout
pub async fn logout(
    body: web::Json<RefreshRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    service.logout(&body.refresh_token).await?;
    Ok(HttpResponse::NoContent().finish())
}
