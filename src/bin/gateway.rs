use std::{error::Error, net::SocketAddr};

use mov_gateway::{AppConfig, Env, GatewayState, create_gateway_router, init_tracing};
use tokio::net::TcpListener;

/// main
///
/// Entry point of the edge gateway: configuration, logging, route table, HTTP server.
/// Any startup failure is logged and ends the process before a port is bound.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(Env::Local);
            tracing::error!(error = %e, "invalid gateway configuration");
            std::process::exit(1);
        }
    };

    // 2. Logging, formatted for the runtime environment.
    init_tracing(config.env);
    tracing::info!("API gateway starting in {:?} mode", config.env);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "API gateway stopped");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn Error>> {
    let addr = config.gateway_addr;

    // 3. Route table and forwarding client. Unreachable routes are rejected here.
    let state = GatewayState::standard(config)?;
    for route in state.routes.routes() {
        tracing::debug!(backend = %route.backend, target = %route.target, "route {route}");
    }

    // 4. Router and Server Startup. Peer addresses key the rate limiter.
    let app = create_gateway_router(state);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
