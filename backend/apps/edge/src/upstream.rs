//! Upstream Proxy
//!
//! Forwards every request the gateway lets through to the application server.
//! Bodies are buffered in both directions.

use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, Request, Response, header};
use kernel::error::app_error::{AppError, AppResult, ResultExt};
use kernel::error::kind::ErrorKind;
use url::Url;

/// Largest request body forwarded upstream
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Headers scoped to a single connection, never forwarded
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Upstream application server
#[derive(Debug, Clone)]
pub struct Upstream {
    http: reqwest::Client,
    base: Url,
}

impl Upstream {
    pub fn new(base: Url, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            // Redirects belong to the browser
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { http, base })
    }

    /// Absolute upstream URL for a `path[?query]` request target
    pub fn target_url(&self, path_and_query: &str) -> AppResult<Url> {
        let base = self.base.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}{path_and_query}"))
            .map_app_err(ErrorKind::BadRequest, "Invalid request target")
    }
}

/// Remove hop-by-hop headers, including any named in `Connection`
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in HOP_BY_HOP.iter().chain(listed.iter()) {
        headers.remove(name);
    }
    headers.remove(header::CONTENT_LENGTH);
}

/// Fallback handler proxying the request upstream
pub async fn proxy(State(upstream): State<Upstream>, req: Request<Body>) -> AppResult<Response<Body>> {
    let (parts, body) = req.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = upstream.target_url(path_and_query)?;

    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_app_err(ErrorKind::PayloadTooLarge, "Request body too large")?;

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    if let Some(host) = headers.remove(header::HOST) {
        if !headers.contains_key(&X_FORWARDED_HOST) {
            headers.insert(X_FORWARDED_HOST, host);
        }
    }

    let response = upstream
        .http
        .request(parts.method.clone(), url)
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|e| {
            tracing::warn!(
                method = %parts.method,
                path = %parts.uri.path(),
                error = %e,
                "Upstream request failed"
            );
            if e.is_timeout() {
                AppError::gateway_timeout("Upstream timed out").with_source(e)
            } else {
                AppError::bad_gateway("Upstream unavailable").with_source(e)
            }
        })?;

    let status = response.status();
    let mut headers = response.headers().clone();
    strip_hop_by_hop(&mut headers);
    let bytes = response
        .bytes()
        .await
        .map_err(|e| AppError::bad_gateway("Upstream response interrupted").with_source(e))?;

    let mut proxied = Response::new(Body::from(bytes));
    *proxied.status_mut() = status;
    *proxied.headers_mut() = headers;
    Ok(proxied)
}
