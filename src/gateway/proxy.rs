use std::time::Duration;

use axum::{
    body::{Body, to_bytes},
    extract::Request,
    http::{HeaderMap, HeaderName, header},
    response::Response,
};
use http_body_util::LengthLimitError;
use reqwest::{Client, Url, redirect};

use crate::{error::ApiError, gateway::route_table::Route};

/// Connection-scoped headers that describe the client's hop, not the request.
/// `content-length` is recomputed from the buffered body.
const HOP_BY_HOP: [HeaderName; 10] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::HOST,
    header::CONTENT_LENGTH,
];

/// Drops hop-by-hop headers, including any the `Connection` header itself names.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in HOP_BY_HOP.iter().chain(&named) {
        headers.remove(name);
    }
}

/// Joins the backend base URL with the rewritten path and the inbound query.
fn upstream_url(base: &Url, path: &str, query: Option<&str>) -> Url {
    let mut url = base.clone();
    let joined = format!("{}{}", base.path().trim_end_matches('/'), path);
    url.set_path(&joined);
    url.set_query(query);
    url
}

/// buffer_error
///
/// Classifies a failure to buffer the inbound body. Only exceeding `max_body_bytes` is the
/// client's fault; a dropped connection or a transport error is internal.
pub fn buffer_error(err: axum::Error) -> ApiError {
    let err = err.into_inner();
    if err.downcast_ref::<LengthLimitError>().is_some() {
        ApiError::invalid_field("body", "Request body too large")
    } else {
        ApiError::Internal(format!("could not read request body: {err}"))
    }
}

/// ForwardingEngine
///
/// Relays a routed request to its backend and the backend's answer to the client.
///
/// * One outbound call per inbound request. No retries: a failed call is reported
///   immediately as `ServiceUnavailable`, since not every method is safe to repeat.
/// * Timeouts (`UPSTREAM_TIMEOUT_MS`) count as connection failures.
/// * The request body is buffered up to `max_body_bytes`; the response body is streamed.
/// * Redirects are passed back to the client, never followed.
/// * If the client goes away, axum drops the handler future and the in-flight
///   upstream request with it.
#[derive(Clone)]
pub struct ForwardingEngine {
    client: Client,
    max_body_bytes: usize,
}

impl ForwardingEngine {
    pub fn new(timeout: Duration, max_body_bytes: usize) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            max_body_bytes,
        })
    }

    /// forward
    ///
    /// Sends `request` to `route`'s backend with the inbound method, the rewritten `path`
    /// and the inbound query, the end-to-end headers (forwarding headers included), and
    /// the body. `path` is the normalized path the route was matched on. The backend's
    /// status, headers, and body come back unchanged.
    pub async fn forward(
        &self,
        route: &Route,
        path: &str,
        request: Request,
    ) -> Result<Response, ApiError> {
        let (parts, body) = request.into_parts();

        let path = route.rewrite_path(path);
        let url = upstream_url(&route.target, &path, parts.uri.query());

        let body = to_bytes(body, self.max_body_bytes)
            .await
            .map_err(buffer_error)?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);

        tracing::debug!(backend = %route.backend, method = %parts.method, %url, "forwarding request");

        let mut upstream = self
            .client
            .request(parts.method, url.clone())
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    backend = %route.backend,
                    %url,
                    timeout = e.is_timeout(),
                    error = %e,
                    "upstream request failed"
                );
                ApiError::ServiceUnavailable(e.to_string())
            })?;

        let status = upstream.status();
        let mut headers = std::mem::take(upstream.headers_mut());
        headers.remove(header::CONNECTION);
        headers.remove(header::TRANSFER_ENCODING);
        headers.remove(HeaderName::from_static("keep-alive"));

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

