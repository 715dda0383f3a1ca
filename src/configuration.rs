use base64::Engine;

use crate::error::ConfigError;

/// Smallest accepted signing key, in decoded bytes (HS256 key size)
const MIN_SIGNING_KEY_BYTES: usize = 32;

/// Longest accepted token lifetime (10 years)
pub const MAX_TOKEN_EXPIRY_SECS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub password: PasswordSettings,
}

/// Where users, refresh tokens and notes are kept
#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub storage: StorageBackend,
    /// Interval of the expired refresh token sweep; 0 disables it
    pub refresh_token_sweep_secs: u64,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!("{}/{}", self.connection_string_without_db(), self.database_name)
    }

    /// Server-level connection, used to create databases
    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// JWT signing settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    /// Base64-encoded HMAC key
    pub secret: String,
    pub access_token_expiry: i64,  // seconds (900 = 15 minutes)
    pub refresh_token_expiry: i64, // seconds (2592000 = 30 days)
}

impl JwtSettings {
    /// Decode the configured secret into raw key bytes
    ///
    /// # Errors
    /// Returns error if the secret is not valid Base64 or decodes to fewer
    /// than 32 bytes
    pub fn signing_key(&self) -> Result<Vec<u8>, ConfigError> {
        let key = base64::engine::general_purpose::STANDARD
            .decode(self.secret.trim())
            .map_err(|e| ConfigError::InvalidValue(format!("jwt.secret is not Base64: {}", e)))?;

        if key.len() < MIN_SIGNING_KEY_BYTES {
            return Err(ConfigError::InvalidValue(format!(
                "jwt.secret must decode to at least {} bytes",
                MIN_SIGNING_KEY_BYTES
            )));
        }

        Ok(key)
    }

    /// # Errors
    /// Returns error if `access_token_expiry` is outside `1..=MAX_TOKEN_EXPIRY_SECS`
    pub fn access_token_validity(&self) -> Result<chrono::Duration, ConfigError> {
        token_validity("jwt.access_token_expiry", self.access_token_expiry)
    }

    /// # Errors
    /// Returns error if `refresh_token_expiry` is outside `1..=MAX_TOKEN_EXPIRY_SECS`
    pub fn refresh_token_validity(&self) -> Result<chrono::Duration, ConfigError> {
        token_validity("jwt.refresh_token_expiry", self.refresh_token_expiry)
    }
}

fn token_validity(key: &str, seconds: i64) -> Result<chrono::Duration, ConfigError> {
    if !(1..=MAX_TOKEN_EXPIRY_SECS).contains(&seconds) {
        return Err(ConfigError::InvalidValue(format!(
            "{} must be between 1 and {} seconds, got {}",
            key, MAX_TOKEN_EXPIRY_SECS, seconds
        )));
    }

    Ok(chrono::Duration::seconds(seconds))
}

#[derive(serde::Deserialize, Clone)]
pub struct PasswordSettings {
    pub bcrypt_cost: u32,
}

/// Load settings from `configuration.yaml` (optional) and `APP_` environment
/// variables, e.g. `APP_JWT__SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", 8080_i64)?
        .set_default("application.storage", "postgres")?
        .set_default("application.refresh_token_sweep_secs", 3600_i64)?
        .set_default("database.username", "postgres")?
        .set_default("database.password", "password")?
        .set_default("database.host", "127.0.0.1")?
        .set_default("database.port", 5432_i64)?
        .set_default("database.database_name", "notekeeper")?
        .set_default("jwt.access_token_expiry", 900_i64)?
        .set_default("jwt.refresh_token_expiry", 2_592_000_i64)?
        .set_default("password.bcrypt_cost", i64::from(bcrypt::DEFAULT_COST))?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize::<Settings>()?)
}
