use std::{error::Error, sync::Arc};

use mov_gateway::{
    AppConfig, Env, create_event_router,
    events::repository::{EventRepositoryState, InMemoryEventRepository, PostgresEventRepository},
    init_tracing, with_security,
};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

/// main
///
/// Entry point of the event service: configuration, logging, event store, HTTP server.
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(Env::Local);
            tracing::error!(error = %e, "invalid event service configuration");
            std::process::exit(1);
        }
    };

    init_tracing(config.env);
    tracing::info!("Event service starting in {:?} mode", config.env);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "event service stopped");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn Error>> {
    // Postgres when DATABASE_URL is set (mandatory in production), otherwise a
    // process-local store for development.
    let repo: EventRepositoryState = match config.require_database()? {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await?;
            sqlx::migrate!().run(&pool).await?;
            tracing::info!("Connected to Postgres, migrations applied");
            Arc::new(PostgresEventRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, events are kept in memory");
            Arc::new(InMemoryEventRepository::new())
        }
    };

    let app = with_security(create_event_router(repo), &config.allowed_origins);
    let addr = config.event_service_addr;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Listening on {addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://{addr}/swagger-ui");

    axum::serve(listener, app).await?;
    Ok(())
}
