use std::sync::Arc;

use auth::HashCost;
use identity_service::config::Config;
use identity_service::domain::user::ports::TokenIssuer;
use identity_service::domain::user::ports::UserServicePort;
use identity_service::domain::user::service::UserService;
use identity_service::inbound::http::router::create_router;
use identity_service::outbound::hashing::Argon2PasswordHasher;
use identity_service::outbound::repositories::InMemoryCredentialRepository;
use identity_service::outbound::repositories::InMemoryUserRepository;
use identity_service::outbound::repositories::PostgresCredentialRepository;
use identity_service::outbound::repositories::PostgresUserRepository;
use identity_service::outbound::tokens::JwtTokenIssuer;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "identity-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        database_configured = config.database.url.is_some(),
        jwt_issuer = %config.jwt.issuer,
        jwt_expiration_hours = config.jwt.expiration_hours,
        "Configuration loaded"
    );

    let password_hasher = Arc::new(Argon2PasswordHasher::new(HashCost::from(
        &config.password,
    )));
    let token_issuer = Arc::new(JwtTokenIssuer::new(
        config.jwt.secret_or_default().as_bytes(),
        config.jwt.issuer.clone(),
        config.jwt.audience.clone(),
    ));
    let session_ttl = config.jwt.session_ttl()?;

    let user_service: Arc<dyn UserServicePort> = match &config.database.url {
        Some(database_url) => {
            let pg_pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .connect(database_url)
                .await?;
            tracing::info!(
                max_connections = config.database.max_connections,
                database = "postgresql",
                "Database connection pool created"
            );

            sqlx::migrate!("./migrations").run(&pg_pool).await?;
            tracing::info!(database = "postgresql", "Database migrations completed");

            Arc::new(
                UserService::new(
                    Arc::new(PostgresUserRepository::new(pg_pool.clone())),
                    Arc::new(PostgresCredentialRepository::new(pg_pool)),
                    Arc::clone(&password_hasher),
                    Arc::clone(&token_issuer),
                )
                .with_session_ttl(session_ttl),
            )
        }
        None => {
            tracing::warn!("No database configured, accounts are kept in memory only");

            Arc::new(
                UserService::new(
                    Arc::new(InMemoryUserRepository::new()),
                    Arc::new(InMemoryCredentialRepository::new()),
                    Arc::clone(&password_hasher),
                    Arc::clone(&token_issuer),
                )
                .with_session_ttl(session_ttl),
            )
        }
    };

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let token_issuer: Arc<dyn TokenIssuer> = token_issuer;
    let http_application = create_router(user_service, token_issuer);

    if let Err(e) = axum::serve(http_listener, http_application).await {
        tracing::error!(error = %e, "Server error");
        return Err(e.into());
    }

    tracing::info!("Server exited successfully");

    Ok(())
}
