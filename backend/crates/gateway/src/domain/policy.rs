//! Routing Policies
//!
//! Pure rules deciding what the gateway does with a request: which host is
//! canonical, which paths skip the session check, which origins get CORS.

/// How a path is treated by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Static asset: forwarded untouched, no headers added
    Excluded,
    /// Allow-listed: no session check, security headers added
    Public,
    /// Requires a usable session
    Protected,
}

/// Path allow-list and static-asset exclusion
#[derive(Debug, Clone)]
pub struct PathPolicy {
    pub public_prefixes: Vec<String>,
    pub excluded_prefixes: Vec<String>,
    /// Paths under this segment are API routes (no framing/CSP/CORS headers)
    pub api_prefix: String,
}

impl Default for PathPolicy {
    fn default() -> Self {
        Self {
            public_prefixes: [
                "/auth/login",
                "/auth/register",
                "/auth/select-role",
                "/auth/forgot-password",
                "/auth/reset-password",
                "/auth/callback",
                "/api",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            excluded_prefixes: [
                "/_next/static",
                "/_next/image",
                "/favicon.ico",
                "/public",
                "/icon-",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            api_prefix: "/api".to_string(),
        }
    }
}

impl PathPolicy {
    pub fn classify(&self, path: &str) -> Route {
        if self.excluded_prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            Route::Excluded
        } else if self.public_prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            Route::Public
        } else {
            Route::Protected
        }
    }

    /// `true` for the API prefix itself and anything below it
    pub fn is_api(&self, path: &str) -> bool {
        match path.strip_prefix(self.api_prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// Canonical host enforcement
#[derive(Debug, Clone)]
pub struct HostPolicy {
    pub canonical_host: String,
    /// Hostnames always served in place (local development)
    pub local_hosts: Vec<String>,
    /// Redirects only happen when enforced (production)
    pub enforce: bool,
}

impl Default for HostPolicy {
    fn default() -> Self {
        Self {
            canonical_host: "auth.autamedica.com".to_string(),
            local_hosts: vec!["localhost".to_string()],
            enforce: true,
        }
    }
}

impl HostPolicy {
    /// Whether a request for `hostname` (lower-case, no port) must be
    /// redirected to the canonical host
    pub fn requires_redirect(&self, hostname: &str) -> bool {
        self.enforce
            && !hostname.eq_ignore_ascii_case(&self.canonical_host)
            && !self
                .local_hosts
                .iter()
                .any(|local| hostname.eq_ignore_ascii_case(local))
    }

    /// Absolute URL on the canonical host for `path_and_query`
    pub fn canonical_url(&self, path_and_query: &str) -> String {
        format!("https://{}{}", self.canonical_host, path_and_query)
    }
}

/// Credentialed CORS for known front-end origins
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    pub allowed_origins: Vec<String>,
    pub allow_methods: String,
    pub allow_headers: String,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        let production = [
            "https://autamedica.com",
            "https://www.autamedica.com",
            "https://patients.autamedica.com",
            "https://doctors.autamedica.com",
            "https://companies.autamedica.com",
            "https://admin.autamedica.com",
        ]
        .into_iter()
        .map(String::from);
        let local = (3000..=3003).map(|port| format!("http://localhost:{port}"));

        Self {
            allowed_origins: production.chain(local).collect(),
            allow_methods: "GET, POST, PUT, DELETE, OPTIONS".to_string(),
            allow_headers: "Content-Type, Authorization".to_string(),
        }
    }
}

impl CorsPolicy {
    /// Exact, case-sensitive match against the allow-list
    pub fn allows(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }
}
