//! The API gateway: the single ingress in front of the domain services.
//!
//! Every request that is not `/health` or the `/api/v1` directory goes through one
//! explicit pipeline, each stage either enriching the request or short-circuiting with
//! a typed failure:
//!
//! 1. route match (Route Table)
//! 2. authenticate, if the route requires it (Identity Verifier)
//! 3. authorize against the route's role set (Access Policy)
//! 4. attach the identity as forwarding headers (Context Forwarder)
//! 5. forward to the backend (Forwarding Engine)

pub mod policy;
pub mod proxy;
pub mod route_table;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Request, State},
    middleware,
    response::Response,
    routing::get,
};
use chrono::Utc;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::{
    auth,
    config::{AppConfig, Backend, ConfigError},
    context,
    error::ApiError,
    security::{self, RateLimiter, with_security},
    with_observability,
};
use proxy::ForwardingEngine;
use route_table::{AuthRequirement, RouteTable, RouteTableError};

const API_VERSION: &str = "1.0.0";

/// GatewayInitError
///
/// Reasons the gateway refuses to start.
#[derive(Debug, Error)]
pub enum GatewayInitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Routes(#[from] RouteTableError),
    #[error("could not build the upstream HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// GatewayState
///
/// Everything the pipeline reads, all of it immutable after startup. Cloned per request;
/// the route table sits behind an `Arc` and the HTTP client is internally shared, so a
/// clone copies the configuration only.
#[derive(Clone)]
pub struct GatewayState {
    pub config: AppConfig,
    pub routes: Arc<RouteTable>,
    pub engine: ForwardingEngine,
}

impl GatewayState {
    /// Builds the state around an explicit route table.
    pub fn new(config: AppConfig, routes: RouteTable) -> Result<Self, GatewayInitError> {
        let engine = ForwardingEngine::new(config.upstream_timeout, config.max_body_bytes)?;
        Ok(Self {
            config,
            routes: Arc::new(routes),
            engine,
        })
    }

    /// Builds the state with `RouteTable::standard`. The auth and event backends are
    /// mandatory; the others are routed only when configured.
    pub fn standard(config: AppConfig) -> Result<Self, GatewayInitError> {
        config.require_backend(Backend::Auth)?;
        config.require_backend(Backend::Events)?;
        let routes = RouteTable::standard(&config)?;
        Self::new(config, routes)
    }
}

/// create_gateway_router
///
/// The two local endpoints plus a fallback that runs the forwarding pipeline for
/// everything else. Every request, local endpoints included, counts against the
/// client's rate limit.
pub fn create_gateway_router(state: GatewayState) -> Router {
    let limiter = RateLimiter::new(state.config.rate_limit);
    let allowed_origins = state.config.allowed_origins.clone();

    let router = Router::new()
        .route("/health", get(health))
        .route("/api/v1", get(directory))
        .fallback(dispatch)
        .with_state(state)
        .layer(middleware::from_fn_with_state(limiter, security::rate_limit));

    with_security(with_observability(router), &allowed_origins)
}

async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "API Gateway is healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// directory
///
/// [Public Route] Lists every backend domain and its gateway prefix.
async fn directory() -> Json<Value> {
    let services: Map<String, Value> = Backend::ALL
        .into_iter()
        .map(|backend| {
            (
                backend.domain().to_string(),
                Value::String(format!("/api/v1/{}", backend.domain())),
            )
        })
        .collect();

    Json(json!({
        "success": true,
        "message": "MOV Event Management API Gateway",
        "version": API_VERSION,
        "services": services,
    }))
}

/// dispatch
///
/// The forwarding pipeline. The path is normalized once up front and that form is used
/// for both matching and forwarding. Stages run strictly in order and the first failure
/// ends the request; `ApiError` turns it into the failure envelope.
async fn dispatch(
    State(state): State<GatewayState>,
    mut request: Request,
) -> Result<Response, ApiError> {
    let Some(path) = route_table::normalize_path(request.uri().path()) else {
        tracing::warn!(path = %request.uri().path(), "rejecting path with dot segments");
        return Err(ApiError::RouteNotFound);
    };

    let route = state
        .routes
        .match_route(request.method(), &path)
        .ok_or(ApiError::RouteNotFound)?;

    let identity = match route.auth {
        AuthRequirement::None => None,
        AuthRequirement::Required => Some(auth::authenticate(
            request.headers(),
            &state.config.jwt_secret,
        )?),
    };

    policy::authorize(identity.as_ref(), route.roles.as_deref())?;

    context::attach(request.headers_mut(), identity.as_ref());

    state.engine.forward(route, &path, request).await
}
