use axum::http::HeaderValue;
use rusty_library_lending::{
    adapters::memory::InMemoryLibrary,
    adapters::postgres::{
        PostgresBorrowerStore, PostgresCatalogStore, PostgresLendingUnitOfWork,
        PostgresLoanLedger,
    },
    api::{AppState, create_router},
    application::ServiceDependencies,
    config::{AppConfig, DatabaseConfig},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// PostgreSQLのアダプターを構築し、マイグレーションを適用する
async fn postgres_dependencies(
    database: &DatabaseConfig,
    config: &AppConfig,
) -> Result<ServiceDependencies, BoxError> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(database.max_connections)
        .acquire_timeout(database.acquire_timeout)
        .connect(&database.url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(ServiceDependencies {
        catalog_store: Arc::new(PostgresCatalogStore::new(pool.clone())),
        borrower_store: Arc::new(PostgresBorrowerStore::new(pool.clone())),
        loan_ledger: Arc::new(PostgresLoanLedger::new(pool.clone())),
        lending_unit: Arc::new(PostgresLendingUnitOfWork::new(pool)),
        retry_policy: config.retry_policy,
    })
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rusty_library_lending=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let service_deps = match &config.database {
        Some(database) => {
            tracing::info!(
                max_connections = database.max_connections,
                "Using PostgreSQL storage"
            );
            postgres_dependencies(database, &config).await?
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, using in-memory storage");
            ServiceDependencies::from_store(Arc::new(InMemoryLibrary::new()), config.retry_policy)
        }
    };

    let allowed_origin = HeaderValue::from_str(&config.cors_allowed_origin)?;

    // Create application state and router
    let app_state = Arc::new(AppState { service_deps });
    let app = create_router(app_state, allowed_origin);

    // Server configuration
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
