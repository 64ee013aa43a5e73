//! Response Headers
//!
//! Security and CORS headers attached to every response the gateway lets
//! through, and the identity headers forwarded with authenticated requests.

use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use platform::request::RequestInfo;

use crate::application::config::GatewayConfig;
use crate::domain::entity::session::Session;

pub const X_AUTH_HUB: HeaderName = HeaderName::from_static("x-auth-hub");
pub const X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");
pub const X_USER_ROLE: HeaderName = HeaderName::from_static("x-user-role");
pub const X_USER_EMAIL: HeaderName = HeaderName::from_static("x-user-email");

/// Drop identity headers the client sent; only the gateway may set them
pub fn strip_identity_headers(headers: &mut HeaderMap) {
    headers.remove(X_USER_ID);
    headers.remove(X_USER_ROLE);
    headers.remove(X_USER_EMAIL);
}

/// Tell downstream handlers who the validated session belongs to
///
/// Role and email are omitted when absent or not representable as a header.
pub fn forward_identity_headers(headers: &mut HeaderMap, session: &Session) {
    strip_identity_headers(headers);

    if let Ok(user_id) = HeaderValue::from_str(&session.user_id().to_string()) {
        headers.insert(X_USER_ID, user_id);
    }
    if let Some(role) = session
        .user
        .app_role()
        .and_then(|role| HeaderValue::from_str(role).ok())
    {
        headers.insert(X_USER_ROLE, role);
    }
    if let Some(email) = session
        .user
        .email
        .as_deref()
        .and_then(|email| HeaderValue::from_str(email).ok())
    {
        headers.insert(X_USER_EMAIL, email);
    }
}

/// Attach security headers, plus CORS headers for allow-listed origins
///
/// API paths get neither framing protection, CSP nor CORS headers.
pub fn apply_security_headers(
    headers: &mut HeaderMap,
    config: &GatewayConfig,
    info: &RequestInfo,
) {
    let is_api = config.paths.is_api(&info.path);

    if !is_api {
        headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    }
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(X_AUTH_HUB, HeaderValue::from_static("true"));

    if is_api {
        return;
    }

    match HeaderValue::from_str(&config.content_security_policy) {
        Ok(csp) => {
            headers.insert(header::CONTENT_SECURITY_POLICY, csp);
        }
        Err(_) => tracing::warn!("Configured Content-Security-Policy is not a valid header value"),
    }

    let Some(origin) = info.origin.as_deref() else {
        return;
    };
    if !config.cors.allows(origin) {
        return;
    }
    let (Ok(origin), Ok(methods), Ok(allowed_headers)) = (
        HeaderValue::from_str(origin),
        HeaderValue::from_str(&config.cors.allow_methods),
        HeaderValue::from_str(&config.cors.allow_headers),
    ) else {
        tracing::warn!(origin, "CORS headers skipped: invalid header value");
        return;
    };

    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, methods);
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, allowed_headers);
}
