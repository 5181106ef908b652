use anyhow::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber, filter::LevelFilter};

mod config;
mod error;
mod middleware;
mod models;
mod repositories;
mod roster;
mod routes;
mod state;
mod validation;
mod visibility;

use common::{
    cache::{RedisConfig, RevocationStore},
    database::{self, DatabaseConfig},
    jwt::{JwtConfig, JwtService},
};

use crate::{config::ServiceConfig, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting API service");

    let service_config = ServiceConfig::load()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    // Check database connectivity
    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    // The authentication service owns seeding; migrations are idempotent
    database::run_migrations(&pool).await?;

    let jwt_service = JwtService::new(JwtConfig::from_env()?);
    let revocations = RevocationStore::new(&RedisConfig::from_env()?)?;

    let app_state = AppState::new(pool, revocations, jwt_service);

    info!("API service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state, service_config.import.max_upload_bytes);

    let address = service_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("API service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
