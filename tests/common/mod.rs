#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;

use chrono::Duration;
use serde_json::{json, Value};

use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;

use notekeeper::auth::{AuthService, PasswordHasher, TokenCodec};
use notekeeper::configuration::{get_configuration, DatabaseSettings};
use notekeeper::startup::{run, Repositories};

pub const TEST_KEY: &[u8] = b"integration-test-signing-key-32-bytes!!";
pub const PASSWORD: &str = "SecurePass123";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub codec: Arc<TokenCodec>,
}

/// Start the server on a random port with in-memory storage
pub fn spawn_app() -> TestApp {
    spawn_app_with_validity(Duration::minutes(15), Duration::days(30))
}

pub fn spawn_app_with_validity(access: Duration, refresh: Duration) -> TestApp {
    spawn_app_with(Repositories::in_memory(), access, refresh)
}

/// Start the server against a fresh, migrated PostgreSQL database
///
/// Connection settings come from `configuration.yaml` and `APP_DATABASE__*`.
pub async fn spawn_postgres_app() -> (TestApp, PgPool) {
    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = format!("notekeeper_test_{}", Uuid::new_v4().simple());
    let pool = configure_database(&configuration.database).await;

    let app = spawn_app_with(
        Repositories::from_pool(pool.clone()),
        Duration::minutes(15),
        Duration::days(30),
    );
    (app, pool)
}

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.database_name).as_str())
        .await
        .expect("Failed to create database.");

    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

pub fn spawn_app_with(repositories: Repositories, access: Duration, refresh: Duration) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let codec = Arc::new(TokenCodec::new(TEST_KEY, access, refresh));
    let auth_service = Arc::new(AuthService::new(
        repositories.users,
        repositories.refresh_tokens,
        codec.clone(),
        PasswordHasher::new(4).expect("valid bcrypt cost"),
    ));

    let server = run(listener, auth_service, repositories.notes).expect("Failed to create server");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        codec,
    }
}

impl TestApp {
    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn register(&self, email: &str) -> reqwest::Response {
        self.post_json("/auth/register", &json!({ "email": email, "password": PASSWORD }))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_json("/auth/login", &json!({ "email": email, "password": password }))
            .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> reqwest::Response {
        self.post_json("/auth/refresh", &json!({ "refresh_token": refresh_token }))
            .await
    }

    /// Register and log in; returns the login body
    pub async fn signed_in_user(&self, email: &str) -> Value {
        assert_eq!(self.register(email).await.status().as_u16(), 201);
        let response = self.login(email, PASSWORD).await;
        assert_eq!(response.status().as_u16(), 200);
        response.json().await.expect("Failed to parse response")
    }

    pub fn authorized(&self, builder: reqwest::RequestBuilder, access_token: &str) -> reqwest::RequestBuilder {
        builder.header("X-Authorization", format!("Bearer {}", access_token))
    }
}

pub fn token(body: &Value, field: &str) -> String {
    body[field].as_str().expect("token field").to_string()
}
