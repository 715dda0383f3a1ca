use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::repository::{RefreshTokenRepository, UserRepository};
use crate::auth::service::AuthService;
use crate::configuration::DatabaseSettings;
use crate::error::AppError;
use crate::logger::RequestLogger;
use crate::middleware::IdentityMiddleware;
use crate::notes::NoteRepository;
use crate::persistence::{
    InMemoryNoteRepository, InMemoryRefreshTokenRepository, InMemoryUserRepository,
    PgNoteRepository, PgRefreshTokenRepository, PgUserRepository,
};
use crate::routes::{delete_note, health_check, list_notes, login, logout, refresh, register, save_note};

/// The storage engine chosen at start-up
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
    pub notes: Arc<dyn NoteRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::default()),
            refresh_tokens: Arc::new(InMemoryRefreshTokenRepository::default()),
            notes: Arc::new(InMemoryNoteRepository::default()),
        }
    }

    /// Connect to PostgreSQL and apply pending migrations
    pub async fn postgres(settings: &DatabaseSettings) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&settings.connection_string())
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;

        tracing::info!("Database connection pool created and migrations applied");

        Ok(Self::from_pool(pool))
    }

    /// Repositories over an already migrated pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            refresh_tokens: Arc::new(PgRefreshTokenRepository::new(pool.clone())),
            notes: Arc::new(PgNoteRepository::new(pool)),
        }
    }
}

pub fn run(
    listener: TcpListener,
    auth_service: Arc<AuthService>,
    notes: Arc<dyn NoteRepository>,
) -> Result<Server, std::io::Error> {
    let codec = auth_service.codec().clone();
    let auth_service = web::Data::from(auth_service);
    let notes = web::Data::from(notes);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(IdentityMiddleware::new(codec.clone()))
            .wrap(RequestLogger)
            .app_data(auth_service.clone())
            .app_data(notes.clone())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/logout", web::post().to(logout)),
            )
            .service(
                web::scope("/notes")
                    .route("", web::get().to(list_notes))
                    .route("", web::post().to(save_note))
                    .route("/{id}", web::delete().to(delete_note)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}

/// Periodically purge expired refresh token fingerprints
pub fn spawn_refresh_token_sweep(
    auth_service: Arc<AuthService>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if let Err(e) = auth_service.refresh_tokens().purge_expired().await {
                tracing::error!(error = %e, "Refresh token sweep failed");
            }
        }
    })
}
