//! Gateway Decision
//!
//! The I/O-free part of the gateway: given the request URL, decide whether to
//! redirect to the canonical host, let the request through, or check its
//! session. The session check itself lives in
//! [`crate::application::check_session`].

use platform::request::RequestInfo;
use url::form_urlencoded;

use crate::application::config::GatewayConfig;
use crate::domain::policy::Route;

/// What to do with a request before any session work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Static asset, forward untouched
    Excluded,
    /// Permanent redirect to this absolute URL on the canonical host
    RedirectToCanonical(String),
    /// Allow-listed path, forward and attach headers
    Public,
    /// Check the session first
    Protected,
}

/// Decide how to handle a request
///
/// Order matters: static assets first, then the host check (so no auth work
/// is done for the wrong host), then the path allow-list.
pub fn decide(config: &GatewayConfig, info: &RequestInfo) -> Decision {
    let route = config.paths.classify(&info.path);
    if route == Route::Excluded {
        return Decision::Excluded;
    }

    if config.host.requires_redirect(&info.hostname) {
        return Decision::RedirectToCanonical(config.host.canonical_url(&info.path_and_query()));
    }

    match route {
        Route::Public => Decision::Public,
        _ => Decision::Protected,
    }
}

/// Absolute URL of the select-role page carrying the original path
///
/// Only the path is carried, the query string of the original request is
/// dropped.
pub fn select_role_location(config: &GatewayConfig, info: &RequestInfo) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(&config.return_to_param, &info.path)
        .finish();

    format!("{}{}?{}", info.base_url(), config.select_role_path, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::Environment;
    use axum::http::{HeaderMap, HeaderValue, Uri};

    fn info(host: &'static str, target: &str) -> RequestInfo {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static(host));
        let uri: Uri = target.parse().unwrap();
        RequestInfo::from_parts(&uri, &headers, true)
    }

    #[test]
    fn test_wrong_host_in_production_redirects_with_path_and_query() {
        let config = GatewayConfig::default();
        let decision = decide(&config, &info("other-host.com", "/profile?tab=2"));

        assert_eq!(
            decision,
            Decision::RedirectToCanonical("https://auth.autamedica.com/profile?tab=2".into())
        );
    }

    #[test]
    fn test_wrong_host_redirect_happens_before_path_bypass() {
        let config = GatewayConfig::default();
        let decision = decide(&config, &info("other-host.com", "/auth/login"));

        assert!(matches!(decision, Decision::RedirectToCanonical(_)));
    }

    #[test]
    fn test_wrong_host_outside_production_is_served() {
        let config = GatewayConfig::for_environment(Environment::Staging);
        let decision = decide(&config, &info("autamedica-auth-staging.pages.dev", "/profile"));

        assert_eq!(decision, Decision::Protected);
    }

    #[test]
    fn test_localhost_is_never_redirected() {
        let config = GatewayConfig::default();
        assert_eq!(
            decide(&config, &info("localhost:3005", "/profile")),
            Decision::Protected
        );
    }

    #[test]
    fn test_public_and_protected_on_canonical_host() {
        let config = GatewayConfig::default();
        assert_eq!(
            decide(&config, &info("auth.autamedica.com", "/auth/login")),
            Decision::Public
        );
        assert_eq!(
            decide(&config, &info("auth.autamedica.com", "/api/session-sync")),
            Decision::Public
        );
        assert_eq!(
            decide(&config, &info("auth.autamedica.com", "/profile")),
            Decision::Protected
        );
    }

    #[test]
    fn test_static_assets_are_excluded_even_on_wrong_host() {
        let config = GatewayConfig::default();
        assert_eq!(
            decide(&config, &info("other-host.com", "/_next/static/app.js")),
            Decision::Excluded
        );
    }

    #[test]
    fn test_select_role_location_encodes_path() {
        let config = GatewayConfig::default();
        let location = select_role_location(&config, &info("auth.autamedica.com", "/profile"));

        assert_eq!(
            location,
            "https://auth.autamedica.com/auth/select-role?returnTo=%2Fprofile"
        );
    }

    #[test]
    fn test_select_role_location_drops_original_query() {
        let config = GatewayConfig::default();
        let location = select_role_location(
            &config,
            &info("localhost:3005", "/patients/records?id=7"),
        );

        assert_eq!(
            location,
            "http://localhost:3005/auth/select-role?returnTo=%2Fpatients%2Frecords"
        );
    }
}
