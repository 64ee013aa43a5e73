//! Request information
//!
//! Normalized view of the URL a client actually requested, rebuilt from the
//! request target and the `Host` / `X-Forwarded-*` headers.

use axum::http::{HeaderMap, Uri, header};

const X_FORWARDED_HOST: &str = "x-forwarded-host";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// URL components and origin of an inbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    /// `http` or `https`
    pub scheme: String,
    /// Authority as sent by the client, port included
    pub host: String,
    /// Lower-cased host without port
    pub hostname: String,
    pub path: String,
    pub query: Option<String>,
    /// `Origin` request header, verbatim
    pub origin: Option<String>,
}

impl RequestInfo {
    /// Build from a request target and its headers
    ///
    /// With `trust_forwarded` the first value of `X-Forwarded-Host` and
    /// `X-Forwarded-Proto` take precedence, which is what a deployment behind
    /// a TLS-terminating proxy needs.
    pub fn from_parts(uri: &Uri, headers: &HeaderMap, trust_forwarded: bool) -> Self {
        let forwarded = |name: &str| {
            trust_forwarded
                .then(|| first_header_value(headers, name))
                .flatten()
        };

        let host = forwarded(X_FORWARDED_HOST)
            .or_else(|| first_header_value(headers, header::HOST.as_str()))
            .or_else(|| uri.authority().map(|authority| authority.to_string()))
            .unwrap_or_else(|| "localhost".to_string());
        let hostname = strip_port(&host).to_ascii_lowercase();

        let scheme = forwarded(X_FORWARDED_PROTO)
            .or_else(|| uri.scheme_str().map(str::to_string))
            .map(|scheme| scheme.to_ascii_lowercase())
            .unwrap_or_else(|| default_scheme(&hostname).to_string());

        let origin = headers
            .get(header::ORIGIN)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Self {
            scheme,
            host,
            hostname,
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            origin,
        }
    }

    /// `path[?query]`
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    /// `scheme://host`
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}

fn first_header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?;
    let first = value.split(',').next()?.trim();
    (!first.is_empty()).then(|| first.to_string())
}

/// Strip a trailing `:port`, keeping bracketed IPv6 literals intact
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

fn default_scheme(hostname: &str) -> &'static str {
    match hostname {
        "localhost" | "127.0.0.1" | "[::1]" => "http",
        _ => "https",
    }
}
