use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use notekeeper::auth::{AuthService, PasswordHasher, TokenCodec};
use notekeeper::configuration::{get_configuration, StorageBackend};
use notekeeper::startup::{run, spawn_refresh_token_sweep, Repositories};
use notekeeper::telemetry::init_telemetry;

fn startup_error(kind: std::io::ErrorKind, context: &str, e: impl std::fmt::Display) -> std::io::Error {
    tracing::error!(error = %e, "{}", context);
    std::io::Error::new(kind, format!("{}: {}", context, e))
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = get_configuration()
        .map_err(|e| startup_error(std::io::ErrorKind::InvalidInput, "Failed to read configuration", e))?;

    let repositories = match configuration.application.storage {
        StorageBackend::Postgres => Repositories::postgres(&configuration.database)
            .await
            .map_err(|e| startup_error(std::io::ErrorKind::ConnectionRefused, "Database setup failed", e))?,
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Repositories::in_memory()
        }
    };

    let codec = TokenCodec::from_settings(&configuration.jwt)
        .map_err(|e| startup_error(std::io::ErrorKind::InvalidInput, "Invalid JWT settings", e))?;
    let hasher = PasswordHasher::new(configuration.password.bcrypt_cost)
        .map_err(|e| startup_error(std::io::ErrorKind::InvalidInput, "Invalid password settings", e))?;

    let auth_service = Arc::new(AuthService::new(
        repositories.users,
        repositories.refresh_tokens,
        codec,
        hasher,
    ));

    let sweep_secs = configuration.application.refresh_token_sweep_secs;
    if sweep_secs > 0 {
        spawn_refresh_token_sweep(auth_service.clone(), Duration::from_secs(sweep_secs));
    }

    let address = configuration.application.address();
    let listener = TcpListener::bind(&address)?;
    tracing::info!(address = %address, "Server listening");

    run(listener, auth_service, repositories.notes)?.await
}
