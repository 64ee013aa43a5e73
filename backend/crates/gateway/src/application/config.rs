//! Application Configuration
//!
//! Configuration for the gateway. `Default` carries the production policy of
//! the auth hub; `development()` relaxes what only makes sense behind the
//! real domain.

use std::time::Duration;

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;
use platform::cookie::CookieOptions;

use crate::domain::policy::{CorsPolicy, HostPolicy, PathPolicy};

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Production,
    Staging,
    #[default]
    Development,
}

impl Environment {
    /// Parse `production` / `staging`; anything else is development
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "staging" => Environment::Staging,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Development => "development",
        }
    }
}

/// When the session check asks the provider for fresh tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Refresh on every protected request
    #[default]
    Always,
    /// Refresh only when the access token expires within the margin
    WithinMargin(Duration),
}

/// Session cookie configuration
#[derive(Debug, Clone)]
pub struct SessionCookieConfig {
    /// Supabase project reference, used to derive the cookie name
    pub project_ref: String,
    /// Overrides the derived `sb-<ref>-auth-token` name
    pub name_override: Option<String>,
    /// Longest value written into a single cookie before chunking
    pub chunk_size: usize,
    pub options: CookieOptions,
}

impl Default for SessionCookieConfig {
    fn default() -> Self {
        Self {
            project_ref: "gtyvdircfhmdjiaelqkg".to_string(),
            name_override: None,
            chunk_size: 3180,
            options: CookieOptions {
                domain: Some(".autamedica.com".to_string()),
                path: "/".to_string(),
                secure: true,
                // Browser clients read the session cookie
                http_only: false,
                same_site: SameSite::Lax,
                max_age_secs: Some(30 * 24 * 3600), // 30 days
            },
        }
    }
}

impl SessionCookieConfig {
    pub fn cookie_name(&self) -> String {
        self.name_override
            .clone()
            .unwrap_or_else(|| format!("sb-{}-auth-token", self.project_ref))
    }
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: HostPolicy,
    pub paths: PathPolicy,
    pub cors: CorsPolicy,
    /// `Content-Security-Policy` for non-API responses
    pub content_security_policy: String,
    /// Where visitors without a usable session are sent
    pub select_role_path: String,
    /// Query parameter carrying the original path
    pub return_to_param: String,
    pub session_cookie: SessionCookieConfig,
    pub refresh: RefreshPolicy,
    /// Honor `X-Forwarded-Host` / `X-Forwarded-Proto`; only safe behind a
    /// proxy that overwrites them
    pub trust_forwarded_headers: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: HostPolicy::default(),
            paths: PathPolicy::default(),
            cors: CorsPolicy::default(),
            content_security_policy: [
                "default-src 'self'",
                "script-src 'self' 'unsafe-inline' 'unsafe-eval'",
                "style-src 'self' 'unsafe-inline'",
                "img-src 'self' data: blob: https:",
                "font-src 'self' data:",
                "connect-src 'self' https://*.supabase.co wss://*.supabase.co https://*.autamedica.com",
                "frame-ancestors 'none'",
            ]
            .join("; "),
            select_role_path: "/auth/select-role".to_string(),
            return_to_param: "returnTo".to_string(),
            session_cookie: SessionCookieConfig::default(),
            refresh: RefreshPolicy::Always,
            trust_forwarded_headers: false,
        }
    }
}

impl GatewayConfig {
    /// Config for a given environment
    ///
    /// Host enforcement follows the environment. Outside production the
    /// session cookie is host-only, and only staging keeps it `Secure` so
    /// development works on `http://localhost`.
    pub fn for_environment(environment: Environment) -> Self {
        let mut config = Self::default();
        config.host.enforce = environment.is_production();
        if !environment.is_production() {
            config.session_cookie.options.domain = None;
            config.session_cookie.options.secure =
                matches!(environment, Environment::Staging);
        }
        config
    }

    /// Create config for development
    pub fn development() -> Self {
        Self::for_environment(Environment::Development)
    }
}
