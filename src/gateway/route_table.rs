//! The Route Table: an ordered, immutable list of forwarding rules.
//!
//! Lookup is first-match-wins, so declaration order is part of the contract. A more
//! specific pattern must come before a broader one on the same prefix, and public
//! method routes must come before a role-gated catch-all. `RouteTable::new` enforces
//! this: a route that can never be reached because an earlier route matches everything
//! it matches is a startup error, not a silent misconfiguration.

use std::{fmt, str::FromStr};

use axum::http::Method;
use reqwest::Url;
use thiserror::Error;

use crate::{
    config::{AppConfig, Backend},
    models::Role,
};

/// RouteTableError
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteTableError {
    #[error("invalid path pattern `{pattern}`: {reason}")]
    InvalidPattern {
        pattern: String,
        reason: &'static str,
    },
    /// `route` is unreachable: everything it matches is already matched by `by`.
    #[error("route `{route}` is shadowed by earlier route `{by}`")]
    Shadowed { route: String, by: String },
}

// --- Path Patterns ---

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `{name}`: exactly one non-empty segment.
    Param,
}

/// PathPattern
///
/// A path template made of literal segments and `{name}` placeholders, optionally
/// ending in `*`, which matches zero or more further segments. Empty segments are
/// ignored on both sides, so `/a/b/` and `/a/b` are the same path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
    wildcard: bool,
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}

/// normalize_path
///
/// Canonical form of an inbound request path: one leading `/`, no empty segments, no
/// trailing `/`. A path with a dot segment (`.` or `..`, literal or percent-encoded) or a
/// backslash has no canonical form and yields `None`. The gateway matches and forwards
/// the normalized path, so the backend receives exactly the path the table approved.
pub fn normalize_path(path: &str) -> Option<String> {
    let mut normalized = String::with_capacity(path.len());
    for segment in split(path) {
        if is_dot_segment(segment) || segment.contains('\\') {
            return None;
        }
        normalized.push('/');
        normalized.push_str(segment);
    }

    if normalized.is_empty() {
        normalized.push('/');
    }
    Some(normalized)
}

impl FromStr for PathPattern {
    type Err = RouteTableError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| RouteTableError::InvalidPattern {
            pattern: raw.to_string(),
            reason,
        };

        if !raw.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        let parts: Vec<&str> = split(raw).collect();
        let mut segments = Vec::with_capacity(parts.len());
        let mut wildcard = false;

        for (i, part) in parts.iter().enumerate() {
            if *part == "*" {
                if i + 1 != parts.len() {
                    return Err(invalid("'*' is only allowed as the last segment"));
                }
                wildcard = true;
            } else if let Some(name) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                if name.is_empty() {
                    return Err(invalid("placeholder needs a name"));
                }
                segments.push(Segment::Param);
            } else if part.contains(['{', '}', '*']) {
                return Err(invalid("'{', '}' and '*' must form a whole segment"));
            } else {
                segments.push(Segment::Literal((*part).to_string()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
            wildcard,
        })
    }
}

impl PathPattern {
    pub fn matches(&self, path: &str) -> bool {
        let mut parts = split(path);

        for segment in &self.segments {
            match (segment, parts.next()) {
                (_, None) => return false,
                (Segment::Literal(expected), Some(actual)) if expected != actual => return false,
                _ => {}
            }
        }

        self.wildcard || parts.next().is_none()
    }

    /// Whether every path matched by `other` is also matched by `self`.
    pub fn covers(&self, other: &PathPattern) -> bool {
        if other.wildcard && !self.wildcard {
            return false;
        }
        if other.segments.len() < self.segments.len() {
            return false;
        }

        let prefix_covered = self
            .segments
            .iter()
            .zip(&other.segments)
            .all(|(mine, theirs)| match (mine, theirs) {
                (Segment::Param, _) => true,
                (Segment::Literal(a), Segment::Literal(b)) => a == b,
                (Segment::Literal(_), Segment::Param) => false,
            });

        prefix_covered && (self.wildcard || other.segments.len() == self.segments.len())
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// --- Routes ---

/// AuthRequirement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRequirement {
    /// Public: no credential is read, no identity is forwarded.
    None,
    /// A valid bearer credential must be presented.
    Required,
}

/// Rewrite
///
/// A prefix substitution applied to the inbound path before forwarding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub from: String,
    pub to: String,
}

impl Rewrite {
    /// Replaces `from` with `to` when `path` starts with `from` on a segment boundary.
    /// Other paths pass through untouched.
    pub fn apply(&self, path: &str) -> String {
        let Some(rest) = path.strip_prefix(self.from.as_str()) else {
            return path.to_string();
        };
        if !(rest.is_empty() || rest.starts_with('/')) {
            return path.to_string();
        }

        let rewritten = format!("{}{rest}", self.to);
        if rewritten.is_empty() {
            "/".to_string()
        } else {
            rewritten
        }
    }
}

/// Route
///
/// One forwarding rule. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Route {
    /// `None` matches any method.
    pub method: Option<Method>,
    pub pattern: PathPattern,
    pub backend: Backend,
    pub target: Url,
    pub rewrite: Option<Rewrite>,
    pub auth: AuthRequirement,
    /// `None` means no role restriction.
    pub roles: Option<Vec<Role>>,
}

impl Route {
    /// A public route with no rewrite. Refine it with the builder methods below.
    pub fn new(
        method: Option<Method>,
        pattern: &str,
        backend: Backend,
        target: Url,
    ) -> Result<Self, RouteTableError> {
        Ok(Self {
            method,
            pattern: pattern.parse()?,
            backend,
            target,
            rewrite: None,
            auth: AuthRequirement::None,
            roles: None,
        })
    }

    pub fn rewrite(mut self, from: &str, to: &str) -> Self {
        self.rewrite = Some(Rewrite {
            from: from.to_string(),
            to: to.to_string(),
        });
        self
    }

    pub fn authenticated(mut self) -> Self {
        self.auth = AuthRequirement::Required;
        self
    }

    /// Restricts the route to the given roles. Implies `authenticated`.
    pub fn roles(mut self, roles: &[Role]) -> Self {
        self.roles = Some(roles.to_vec());
        self.authenticated()
    }

    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.method.as_ref().is_none_or(|m| m == method) && self.pattern.matches(path)
    }

    /// The path the backend sees.
    pub fn rewrite_path(&self, path: &str) -> String {
        match &self.rewrite {
            Some(rewrite) => rewrite.apply(path),
            None => path.to_string(),
        }
    }

    /// Whether this route matches every (method, path) pair `later` matches.
    fn shadows(&self, later: &Route) -> bool {
        let method_covered = match (&self.method, &later.method) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) => a == b,
        };
        method_covered && self.pattern.covers(&later.pattern)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method {
            Some(method) => write!(f, "{method} {}", self.pattern),
            None => write!(f, "* {}", self.pattern),
        }
    }
}

// --- Table ---

/// RouteTable
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Builds the table, rejecting any route that an earlier route fully shadows.
    pub fn new(routes: Vec<Route>) -> Result<Self, RouteTableError> {
        for (i, route) in routes.iter().enumerate() {
            if let Some(earlier) = routes[..i].iter().find(|earlier| earlier.shadows(route)) {
                return Err(RouteTableError::Shadowed {
                    route: route.to_string(),
                    by: earlier.to_string(),
                });
            }
        }
        Ok(Self { routes })
    }

    /// First route, in declaration order, matching the method and path.
    pub fn match_route(&self, method: &Method, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(method, path))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// standard
    ///
    /// The gateway's production table. Auth and event routes are always declared;
    /// the enrollment, chat and notification domains only when their base URL is
    /// configured. Every domain prefix `/api/v1/<domain>` is rewritten to `/api/v1`.
    pub fn standard(config: &AppConfig) -> Result<Self, RouteTableError> {
        let mut routes = Vec::new();

        if let Some(auth) = config.backend_url(Backend::Auth) {
            let route = |method: Method, pattern: &str| {
                Route::new(Some(method), pattern, Backend::Auth, auth.clone())
                    .map(|route| route.rewrite("/api/v1/auth", "/api/v1"))
            };
            routes.push(route(Method::POST, "/api/v1/auth/register")?);
            routes.push(route(Method::POST, "/api/v1/auth/login")?);
            routes.push(route(Method::GET, "/api/v1/auth/me")?.authenticated());
            routes.push(route(Method::GET, "/api/v1/auth/verify")?.authenticated());
        }

        if let Some(events) = config.backend_url(Backend::Events) {
            let route = |method: Option<Method>, pattern: &str| {
                Route::new(method, pattern, Backend::Events, events.clone())
                    .map(|route| route.rewrite("/api/v1/events", "/api/v1"))
            };
            // Specific before general: the organizer listing would otherwise be
            // swallowed by the public `GET /events/*`.
            routes.push(route(Some(Method::GET), "/api/v1/events/organizer/me")?.roles(&[Role::Organizer]));
            routes.push(route(Some(Method::GET), "/api/v1/events/*")?);
            routes.push(route(Some(Method::POST), "/api/v1/events")?.roles(&[Role::Organizer]));
            routes.push(route(None, "/api/v1/events/*")?.roles(&[Role::Organizer]));
        }

        for backend in [Backend::Enrollments, Backend::Chat, Backend::Notifications] {
            let Some(target) = config.backend_url(backend) else {
                continue;
            };
            let prefix = format!("/api/v1/{}", backend.domain());
            routes.push(
                Route::new(None, &format!("{prefix}/*"), backend, target.clone())?
                    .rewrite(&prefix, "/api/v1")
                    .authenticated(),
            );
        }

        Self::new(routes)
    }
}
