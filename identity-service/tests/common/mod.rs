use std::sync::Arc;

use auth::HashCost;
use auth::JwtIssuer;
use identity_service::domain::user::service::UserService;
use identity_service::inbound::http::router::create_router;
use identity_service::outbound::hashing::Argon2PasswordHasher;
use identity_service::outbound::repositories::InMemoryCredentialRepository;
use identity_service::outbound::repositories::InMemoryUserRepository;
use identity_service::outbound::tokens::JwtTokenIssuer;
use serde_json::json;
use sqlx::postgres::PgConnectOptions;
use sqlx::postgres::PgPoolOptions;
use sqlx::Connection;
use sqlx::Executor;
use sqlx::PgConnection;
use sqlx::PgPool;

pub const TEST_JWT_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";
pub const TEST_JWT_ISSUER: &str = "identity-service";
pub const TEST_JWT_AUDIENCE: &str = "identity-clients";

/// Test application that spawns a real server backed by in-memory stores
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub api_client: reqwest::Client,
    pub jwt_issuer: JwtIssuer,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        // Low Argon2 cost keeps the suite fast
        let password_hasher = Arc::new(Argon2PasswordHasher::new(HashCost {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }));
        let token_issuer = Arc::new(JwtTokenIssuer::new(
            TEST_JWT_SECRET,
            TEST_JWT_ISSUER,
            vec![TEST_JWT_AUDIENCE.to_string()],
        ));

        let user_service = Arc::new(UserService::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryCredentialRepository::new()),
            password_hasher,
            Arc::clone(&token_issuer),
        ));

        let router = create_router(user_service, token_issuer);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            port,
            api_client: reqwest::Client::new(),
            jwt_issuer: JwtIssuer::new(
                TEST_JWT_SECRET,
                TEST_JWT_ISSUER,
                vec![TEST_JWT_AUDIENCE.to_string()],
            ),
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Helper to make POST request with Bearer token
    pub fn post_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.post(path).bearer_auth(token)
    }

    /// Helper to make PUT request with Bearer token
    pub fn put_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.api_client
            .put(format!("{}{}", self.address, path))
            .bearer_auth(token)
    }

    /// Register an account and return the response body
    pub async fn register(&self, display_name: &str, email: &str, password: &str) -> reqwest::Response {
        self.post("/api/register")
            .json(&json!({
                "display_name": display_name,
                "email": email,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Log in and return the response
    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/api/login")
            .json(&json!({
                "email": email,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Register then log in, returning (user_id, token)
    pub async fn register_and_login(&self, email: &str, password: &str) -> (String, String) {
        let body: serde_json::Value = self
            .register("Test User", email, password)
            .await
            .json()
            .await
            .expect("Failed to parse response");
        let user_id = body["data"]["id"].as_str().unwrap().to_string();

        let body: serde_json::Value = self
            .login(email, password)
            .await
            .json()
            .await
            .expect("Failed to parse response");
        let token = body["data"]["token"].as_str().unwrap().to_string();

        (user_id, token)
    }
}

/// Throwaway PostgreSQL database with migrations applied
pub struct TestDb {
    pub pool: PgPool,
    pub db_name: String,
    admin_url: String,
}

impl TestDb {
    /// Create a new test database with a unique name.
    ///
    /// Returns `None` when `DATABASE__URL` is unset, so Postgres-backed tests
    /// are skipped on machines without a database.
    pub async fn new() -> Option<Self> {
        let Ok(admin_url) = std::env::var("DATABASE__URL") else {
            eprintln!("DATABASE__URL not set, skipping PostgreSQL test");
            return None;
        };

        let db_name = format!(
            "test_identity_service_{}",
            uuid::Uuid::new_v4().to_string().replace('-', "_")
        );

        let mut conn = PgConnection::connect(&admin_url)
            .await
            .expect("Failed to connect to Postgres");

        conn.execute(format!(r#"CREATE DATABASE "{}";"#, db_name).as_str())
            .await
            .expect("Failed to create test database");

        // Connect to the new test database
        let options = admin_url
            .parse::<PgConnectOptions>()
            .expect("Failed to parse DATABASE__URL")
            .database(&db_name);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        Some(Self {
            pool,
            db_name,
            admin_url,
        })
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        // The test runtime is shutting down, so cleanup runs on its own
        let db_name = self.db_name.clone();
        let admin_url = self.admin_url.clone();

        let cleanup = std::thread::spawn(move || {
            let Ok(runtime) = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            else {
                return;
            };

            runtime.block_on(async move {
                if let Ok(mut conn) = PgConnection::connect(&admin_url).await {
                    // Terminate existing connections
                    let _ = conn
                        .execute(
                            format!(
                                r#"SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{}';"#,
                                db_name
                            )
                            .as_str(),
                        )
                        .await;

                    let _ = conn
                        .execute(format!(r#"DROP DATABASE IF EXISTS "{}";"#, db_name).as_str())
                        .await;
                }
            });
        });

        let _ = cleanup.join();
    }
}
