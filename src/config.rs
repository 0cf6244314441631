use std::{collections::BTreeMap, env, fmt, net::SocketAddr, time::Duration};

use axum::http::HeaderValue;
use reqwest::Url;
use thiserror::Error;

// reqwest re-exports `Url` but not its parse error.
type UrlParseError = <Url as std::str::FromStr>::Err;

/// AppConfig
///
/// Holds the process-wide configuration shared by the gateway and the event service.
/// It is built exactly once at startup and never mutated afterwards. The gateway keeps
/// it inside `GatewayState`; the event service binary uses it only during startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and which settings are mandatory.
    pub env: Env,
    // Shared secret used to sign and verify bearer credentials (HS256).
    pub jwt_secret: String,
    // One base URL per backend domain. Domains without an entry get no routes.
    pub backends: BTreeMap<Backend, Url>,
    // Bounded wait for a backend response before the gateway gives up.
    pub upstream_timeout: Duration,
    // Largest inbound request body the gateway will buffer for forwarding.
    pub max_body_bytes: usize,
    // Browser origins allowed by CORS. Empty means any origin, without credentials.
    pub allowed_origins: Vec<HeaderValue>,
    // Per-client request budget enforced at the edge.
    pub rate_limit: RateLimitConfig,
    pub gateway_addr: SocketAddr,
    pub event_service_addr: SocketAddr,
    // Postgres connection string for the event service. None selects the in-memory store.
    pub db_url: Option<String>,
}

/// Env
///
/// Defines the runtime context. `Local` enables developer fallbacks (default secret,
/// localhost backends, in-memory event store); `Production` demands explicit settings.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// Backend
///
/// The independently deployed domain services sitting behind the gateway.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Backend {
    Auth,
    Events,
    Enrollments,
    Chat,
    Notifications,
}

impl Backend {
    /// The URL path segment under `/api/v1` owned by this backend.
    pub fn domain(&self) -> &'static str {
        match self {
            Backend::Auth => "auth",
            Backend::Events => "events",
            Backend::Enrollments => "enrollments",
            Backend::Chat => "chat",
            Backend::Notifications => "notifications",
        }
    }

    fn url_var(&self) -> &'static str {
        match self {
            Backend::Auth => "AUTH_SERVICE_URL",
            Backend::Events => "EVENT_SERVICE_URL",
            Backend::Enrollments => "ENROLLMENT_SERVICE_URL",
            Backend::Chat => "CHAT_SERVICE_URL",
            Backend::Notifications => "NOTIFICATION_SERVICE_URL",
        }
    }

    fn local_default(&self) -> Option<&'static str> {
        match self {
            Backend::Auth => Some("http://localhost:3001"),
            Backend::Events => Some("http://localhost:3002"),
            _ => None,
        }
    }

    pub const ALL: [Backend; 5] = [
        Backend::Auth,
        Backend::Events,
        Backend::Enrollments,
        Backend::Chat,
        Backend::Notifications,
    ];
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.domain())
    }
}

/// RateLimitConfig
///
/// A fixed window: each client may send `max_requests` requests per `window`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(15 * 60 * 1000),
            max_requests: 100,
        }
    }
}

/// ConfigError
///
/// Startup configuration failures. The binaries log these and exit before binding a port.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} is not a valid URL: {source}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: UrlParseError,
    },
    #[error("{var} has an invalid value: {value}")]
    InvalidValue { var: &'static str, value: String },
}

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";

impl Default for AppConfig {
    /// default
    ///
    /// Provides a non-panicking configuration for test state scaffolding, pointing the
    /// two mandatory backends at localhost.
    fn default() -> Self {
        let backends = [Backend::Auth, Backend::Events]
            .into_iter()
            .filter_map(|backend| {
                let url = backend.local_default()?;
                Url::parse(url).ok().map(|url| (backend, url))
            })
            .collect();

        Self {
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            backends,
            upstream_timeout: Duration::from_millis(10_000),
            max_body_bytes: 1024 * 1024,
            allowed_origins: Vec::new(),
            rate_limit: RateLimitConfig::default(),
            gateway_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            event_service_addr: SocketAddr::from(([0, 0, 0, 0], 3002)),
            db_url: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables. Production refuses to start
    /// without `JWT_SECRET`; local mode falls back to a development secret and to
    /// localhost URLs for the auth and event backends. Per-binary requirements (backend
    /// URLs for the gateway, `DATABASE_URL` for the event service) are checked with
    /// `require_backend` / `require_database`.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };
        let defaults = Self::default();

        let jwt_secret = match (env, env::var("JWT_SECRET")) {
            (_, Ok(secret)) if !secret.is_empty() => secret,
            (Env::Production, _) => return Err(ConfigError::Missing("JWT_SECRET")),
            (Env::Local, _) => LOCAL_JWT_SECRET.to_string(),
        };

        let mut backends = BTreeMap::new();
        for backend in Backend::ALL {
            let var = backend.url_var();
            let raw = match (env::var(var).ok(), env, backend.local_default()) {
                (Some(value), _, _) => value,
                (None, Env::Local, Some(fallback)) => fallback.to_string(),
                (None, _, _) => continue,
            };
            let url = Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { var, source })?;
            backends.insert(backend, url);
        }

        let rate_limit = RateLimitConfig {
            window: Duration::from_millis(parse_positive(
                "RATE_LIMIT_WINDOW_MS",
                defaults.rate_limit.window.as_millis() as u64,
            )?),
            max_requests: parse_positive("RATE_LIMIT_MAX_REQUESTS", defaults.rate_limit.max_requests)?,
        };

        Ok(Self {
            env,
            jwt_secret,
            backends,
            upstream_timeout: Duration::from_millis(parse_positive("UPSTREAM_TIMEOUT_MS", 10_000)?),
            max_body_bytes: parse_var("MAX_BODY_BYTES", defaults.max_body_bytes)?,
            allowed_origins: parse_origins()?,
            rate_limit,
            gateway_addr: parse_var("GATEWAY_ADDR", defaults.gateway_addr)?,
            event_service_addr: parse_var("EVENT_SERVICE_ADDR", defaults.event_service_addr)?,
            db_url: env::var("DATABASE_URL").ok(),
        })
    }

    /// Base URL of a backend, if that domain is configured.
    pub fn backend_url(&self, backend: Backend) -> Option<&Url> {
        self.backends.get(&backend)
    }

    /// Like `backend_url`, but a missing entry is a startup error.
    pub fn require_backend(&self, backend: Backend) -> Result<&Url, ConfigError> {
        self.backend_url(backend)
            .ok_or(ConfigError::Missing(backend.url_var()))
    }

    /// The event store connection string. Only production insists on one.
    pub fn require_database(&self) -> Result<Option<&str>, ConfigError> {
        match (&self.db_url, self.env) {
            (Some(url), _) => Ok(Some(url.as_str())),
            (None, Env::Production) => Err(ConfigError::Missing("DATABASE_URL")),
            (None, Env::Local) => Ok(None),
        }
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        Err(_) => Ok(default),
    }
}

/// Like `parse_var`, but zero is an invalid value.
fn parse_positive(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match parse_var(var, default)? {
        0 => Err(ConfigError::InvalidValue {
            var,
            value: "0".to_string(),
        }),
        value => Ok(value),
    }
}

/// `ALLOWED_ORIGINS` is a comma-separated list, e.g. `https://app.example.com,http://localhost:5173`.
fn parse_origins() -> Result<Vec<HeaderValue>, ConfigError> {
    let Ok(raw) = env::var("ALLOWED_ORIGINS") else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|_| ConfigError::InvalidValue {
                var: "ALLOWED_ORIGINS",
                value: origin.to_string(),
            })
        })
        .collect()
}
