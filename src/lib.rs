use axum::{
    Router,
    http::HeaderName,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// --- Module Structure ---

// Shared building blocks: configuration, identity, envelopes and the error taxonomy.
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod response;
pub mod security;

// The two deployables: the edge gateway and the event lifecycle service.
pub mod events;
pub mod gateway;

// --- Public Re-exports ---

pub use config::{AppConfig, Env};
pub use error::ApiError;
pub use events::create_event_router;
pub use gateway::{GatewayState, create_gateway_router};
pub use security::with_security;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// with_observability
///
/// Wraps a service router in the shared observability stack. Applied to both the
/// gateway and the event service so their logs line up on the same request id.
///
/// *Order*: a UUID is assigned to requests that arrive without one, the trace span picks
/// it up, and the id is echoed on the response. The gateway forwards the header to
/// backends, so the id assigned at the edge is the one the backend logs.
///
/// CORS and security headers are added separately with [`with_security`].
pub fn with_observability(router: Router) -> Router {
    let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
}

/// trace_span_logger
///
/// Builds the per-request span: method, URI and the `x-request-id` correlation id.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

/// init_tracing
///
/// Installs the global subscriber. `RUST_LOG` wins when set; otherwise the crate logs
/// at debug and tower-http at info. Local runs get pretty output, production gets JSON
/// for log aggregation.
pub fn init_tracing(env: Env) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mov_gateway=debug,tower_http=info".into());

    match env {
        Env::Local => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init(),
        Env::Production => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}
