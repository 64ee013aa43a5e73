//! Cookie Management Infrastructure
//!
//! Parsing of `Cookie` request headers, `Set-Cookie` serialization and a
//! request-scoped [`CookieJar`] whose writes can be mirrored onto both the
//! forwarded request and the outgoing response.

use std::borrow::Cow;

use axum::http::{HeaderMap, HeaderValue, header};
use percent_encoding::percent_decode_str;

/// SameSite policy for cookies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Error raised when a cookie cannot be turned into a header value
#[derive(Debug, Clone, thiserror::Error)]
pub enum CookieError {
    #[error("Cookie `{0}` produces an invalid header value")]
    InvalidHeaderValue(String),
}

/// Attributes applied to every cookie written with these options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub domain: Option<String>,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub max_age_secs: Option<i64>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            domain: None,
            path: "/".to_string(),
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
            max_age_secs: None,
        }
    }
}

impl CookieOptions {
    /// Build Set-Cookie header value
    pub fn build_set_cookie(&self, name: &str, value: &str) -> String {
        let mut cookie = format!("{}={}", name, value);

        if let Some(domain) = &self.domain {
            cookie.push_str(&format!("; Domain={}", domain));
        }
        cookie.push_str(&format!("; Path={}", self.path));
        if let Some(max_age) = self.max_age_secs {
            cookie.push_str(&format!("; Max-Age={}", max_age));
        }
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(&format!("; SameSite={}", self.same_site.as_str()));

        cookie
    }

    /// Build Set-Cookie header for deletion (expired)
    ///
    /// Domain and path must match the original cookie or browsers keep it.
    pub fn build_delete_cookie(&self, name: &str) -> String {
        let expired = CookieOptions {
            max_age_secs: Some(0),
            ..self.clone()
        };
        expired.build_set_cookie(name, "")
    }
}

/// Parse every `Cookie` header into `(name, value)` pairs, in order
///
/// Entries without `=` are ignored. HTTP/2 clients may split cookies over
/// several header lines, so all of them are read.
pub fn parse_cookie_header(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Percent-decode a cookie value as browsers' `encodeURIComponent` wrote it
///
/// Values that do not decode to UTF-8 are returned unchanged.
pub fn decode_value(value: &str) -> Cow<'_, str> {
    percent_decode_str(value)
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(value))
}

/// A queued `Set-Cookie` write
#[derive(Debug, Clone)]
struct PendingCookie {
    name: String,
    header: String,
}

/// Request-scoped cookie jar
///
/// Reads come from the inbound `Cookie` header. Writes update the jar's view
/// immediately (so later reads observe them) and are queued as `Set-Cookie`
/// headers; the last write for a given name wins.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: Vec<(String, String)>,
    pending: Vec<PendingCookie>,
}

impl CookieJar {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            cookies: parse_cookie_header(headers),
            pending: Vec::new(),
        }
    }

    /// First value for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Names currently visible in the jar
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cookies.iter().map(|(name, _)| name.as_str())
    }

    pub fn set(&mut self, name: &str, value: &str, options: &CookieOptions) {
        match self.cookies.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.cookies.push((name.to_string(), value.to_string())),
        }
        self.queue(name, options.build_set_cookie(name, value));
    }

    pub fn remove(&mut self, name: &str, options: &CookieOptions) {
        self.cookies.retain(|(key, _)| key != name);
        self.queue(name, options.build_delete_cookie(name));
    }

    /// Whether any write has been queued
    pub fn has_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Queued `Set-Cookie` values, in write order
    pub fn set_cookie_values(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(|cookie| cookie.header.as_str())
    }

    /// Rewrite the `Cookie` header of a forwarded request to the jar's view
    ///
    /// No-op when nothing was written, so untouched requests keep their
    /// original header bytes.
    pub fn write_request_cookies(&self, headers: &mut HeaderMap) -> Result<(), CookieError> {
        if !self.has_changes() {
            return Ok(());
        }

        headers.remove(header::COOKIE);
        if self.cookies.is_empty() {
            return Ok(());
        }

        let joined = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        let value = HeaderValue::from_str(&joined)
            .map_err(|_| CookieError::InvalidHeaderValue(header::COOKIE.to_string()))?;
        headers.insert(header::COOKIE, value);
        Ok(())
    }

    /// Append the queued writes as `Set-Cookie` headers of a response
    pub fn write_response_cookies(&self, headers: &mut HeaderMap) -> Result<(), CookieError> {
        for cookie in &self.pending {
            let value = HeaderValue::from_str(&cookie.header)
                .map_err(|_| CookieError::InvalidHeaderValue(cookie.name.clone()))?;
            headers.append(header::SET_COOKIE, value);
        }
        Ok(())
    }

    fn queue(&mut self, name: &str, header: String) {
        self.pending.retain(|cookie| cookie.name != name);
        self.pending.push(PendingCookie {
            name: name.to_string(),
            header,
        });
    }
}
