//! Edge Settings
//!
//! Process configuration read from the environment at startup.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, bail};
use gateway::{Environment, GatewayConfig};
use url::Url;

const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:3005";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8787";

/// Startup settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: Environment,
    pub supabase_url: Url,
    pub supabase_anon_key: String,
    pub project_ref: String,
    pub canonical_host: Option<String>,
    pub cors_origins: Option<Vec<String>>,
    pub cookie_domain: Option<String>,
    pub upstream_url: Url,
    pub listen_addr: SocketAddr,
    /// Honor `X-Forwarded-*`; enable only behind a proxy that sets them
    pub trust_forwarded_headers: bool,
    pub provider_timeout: Duration,
    pub upstream_timeout: Duration,
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let environment = get("APP_ENV")
            .or_else(|| get("NODE_ENV"))
            .map(|value| Environment::parse(&value))
            .unwrap_or_default();

        let supabase_url = get("SUPABASE_URL").context("SUPABASE_URL must be set")?;
        let supabase_url =
            Url::parse(&supabase_url).with_context(|| format!("invalid SUPABASE_URL: {supabase_url}"))?;
        let supabase_anon_key = get("SUPABASE_ANON_KEY").context("SUPABASE_ANON_KEY must be set")?;

        let project_ref = match get("SUPABASE_PROJECT_REF") {
            Some(project_ref) => project_ref,
            None => project_ref_from_url(&supabase_url)
                .context("SUPABASE_PROJECT_REF is unset and cannot be derived from SUPABASE_URL")?,
        };

        let cors_origins = get("CORS_ORIGINS").map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        });

        let upstream_url = get("UPSTREAM_URL").unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string());
        let upstream_url =
            Url::parse(&upstream_url).with_context(|| format!("invalid UPSTREAM_URL: {upstream_url}"))?;
        if !matches!(upstream_url.scheme(), "http" | "https") {
            bail!("UPSTREAM_URL must be http or https: {upstream_url}");
        }

        let listen_addr = get("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr: SocketAddr = listen_addr
            .parse()
            .with_context(|| format!("invalid LISTEN_ADDR: {listen_addr}"))?;

        let trust_forwarded_headers = match get("TRUST_FORWARDED_HEADERS") {
            Some(value) => parse_flag(&value)
                .with_context(|| format!("invalid TRUST_FORWARDED_HEADERS: {value}"))?,
            None => false,
        };

        Ok(Self {
            environment,
            supabase_url,
            supabase_anon_key,
            project_ref,
            canonical_host: get("CANONICAL_HOST"),
            cors_origins,
            cookie_domain: get("SESSION_COOKIE_DOMAIN"),
            upstream_url,
            listen_addr,
            trust_forwarded_headers,
            provider_timeout: Duration::from_secs(10),
            upstream_timeout: Duration::from_secs(30),
        })
    }

    /// Gateway configuration for these settings
    pub fn gateway_config(&self) -> GatewayConfig {
        let mut config = GatewayConfig::for_environment(self.environment);
        config.session_cookie.project_ref = self.project_ref.clone();
        config.trust_forwarded_headers = self.trust_forwarded_headers;
        if let Some(host) = &self.canonical_host {
            config.host.canonical_host = host.to_ascii_lowercase();
        }
        if let Some(origins) = &self.cors_origins {
            config.cors.allowed_origins = origins.clone();
        }
        if let Some(domain) = &self.cookie_domain {
            config.session_cookie.options.domain = Some(domain.clone());
        }
        config
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// First DNS label of the Supabase host, e.g. `abc` for `abc.supabase.co`
fn project_ref_from_url(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let label = host.split('.').next()?;
    (!label.is_empty()).then(|| label.to_string())
}
