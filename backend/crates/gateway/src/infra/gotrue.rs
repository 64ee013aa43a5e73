//! GoTrue Client
//!
//! Token refresh against a Supabase auth (GoTrue) server.

use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::entity::session::Session;
use crate::domain::repository::AuthProvider;
use crate::error::{SessionError, SessionResult};

const TOKEN_PATH: &str = "auth/v1/token";

/// HTTP client for the GoTrue token endpoint
#[derive(Debug, Clone)]
pub struct GoTrueClient {
    http: reqwest::Client,
    token_url: Url,
    anon_key: String,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Error body; GoTrue has used several field names over time
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    error_code: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

impl ErrorBody {
    fn describe(self, status: StatusCode) -> String {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error_code)
            .or(self.error)
            .unwrap_or_else(|| status.to_string())
    }
}

impl GoTrueClient {
    /// Build a client for the project at `supabase_url`
    pub fn new(
        supabase_url: &Url,
        anon_key: impl Into<String>,
        timeout: Duration,
    ) -> SessionResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SessionError::Provider(format!("failed to build HTTP client: {e}")))?;
        Self::with_http_client(http, supabase_url, anon_key)
    }

    /// Build with a preconfigured HTTP client
    pub fn with_http_client(
        http: reqwest::Client,
        supabase_url: &Url,
        anon_key: impl Into<String>,
    ) -> SessionResult<Self> {
        let mut base = supabase_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let mut token_url = base
            .join(TOKEN_PATH)
            .map_err(|e| SessionError::Provider(format!("invalid auth URL: {e}")))?;
        token_url
            .query_pairs_mut()
            .append_pair("grant_type", "refresh_token");

        Ok(Self {
            http,
            token_url,
            anon_key: anon_key.into(),
        })
    }

    pub fn token_url(&self) -> &Url {
        &self.token_url
    }
}

/// Map a non-success status to a session error
///
/// Client errors mean the refresh token itself was refused; everything else
/// is the provider's problem.
fn classify_failure(status: StatusCode, detail: String) -> SessionError {
    match status {
        StatusCode::BAD_REQUEST
        | StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN
        | StatusCode::NOT_FOUND
        | StatusCode::UNPROCESSABLE_ENTITY => SessionError::Invalid(detail),
        _ => SessionError::Provider(format!("status {status}: {detail}")),
    }
}

impl AuthProvider for GoTrueClient {
    async fn refresh_session(&self, refresh_token: &str) -> SessionResult<Session> {
        let response = self
            .http
            .post(self.token_url.clone())
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SessionError::Provider("token refresh timed out".to_string())
                } else {
                    SessionError::Provider(format!("token refresh failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<ErrorBody>().await.unwrap_or_default();
            return Err(classify_failure(status, body.describe(status)));
        }

        let issued_at = Utc::now();
        let session = response
            .json::<Session>()
            .await
            .map_err(|e| SessionError::Provider(format!("unexpected token response: {e}")))?;

        Ok(session.with_expiry_from(issued_at))
    }
}
