use anyhow::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber, filter::LevelFilter};

mod config;
mod error;
mod middleware;
mod models;
mod rate_limiter;
mod repositories;
mod routes;
mod state;
mod validation;

use common::{
    cache::{RedisConfig, RevocationStore},
    database::{self, DatabaseConfig},
    jwt::{JwtConfig, JwtService},
    seed,
};

use crate::{
    config::ServiceConfig, rate_limiter::LoginThrottle, repositories::UserRepository,
    state::AppState,
};

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

    info!("Starting authentication service");

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

    database::run_migrations(&pool).await?;
    seed::seed(&pool, service_config.bootstrap_admin().as_ref()).await?;

    // Initialize JWT service and the revocation store
    let jwt_service = JwtService::new(JwtConfig::from_env()?);
    let revocations = RevocationStore::new(&RedisConfig::from_env()?)?;

    let app_state = AppState {
        user_repository: UserRepository::new(pool.clone()),
        db_pool: pool,
        revocations,
        jwt_service,
        login_throttle: LoginThrottle::new(&service_config.login_throttle),
    };

    info!("Authentication service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let address = service_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Authentication service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
