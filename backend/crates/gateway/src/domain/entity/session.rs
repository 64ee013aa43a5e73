//! Session Entity
//!
//! Access/refresh token pair issued by the auth provider, in the JSON shape
//! the provider returns and its browser clients keep in cookies.

use chrono::{DateTime, Duration, Utc};
use kernel::id::UserId;
use serde::{Deserialize, Serialize};

/// Authenticated session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime of the access token in seconds, as issued
    #[serde(default)]
    pub expires_in: i64,
    /// Expiry as unix seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub user: SessionUser,
}

/// User the session belongs to
///
/// Fields the gateway does not look at are kept so that rewriting the cookie
/// does not lose them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Expiry instant, if known
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }

    /// Check if the access token has expired at `now`
    ///
    /// A session without an expiry is treated as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_within(now, Duration::zero())
    }

    /// Check if the access token expires within `margin` of `now`
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        match (self.expires_at(), now.checked_add_signed(margin)) {
            (Some(expires_at), Some(deadline)) => expires_at <= deadline,
            _ => true,
        }
    }

    /// Fill `expires_at` from `expires_in` when the issuer omitted it
    pub fn with_expiry_from(mut self, issued_at: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() && self.expires_in > 0 {
            self.expires_at = Some((issued_at + Duration::seconds(self.expires_in)).timestamp());
        }
        self
    }

    pub fn user_id(&self) -> UserId {
        self.user.id
    }
}

impl SessionUser {
    /// Application role chosen at sign-up (`user_metadata.role`)
    ///
    /// Distinct from `role`, which is the provider's database role
    /// (`authenticated`).
    pub fn app_role(&self) -> Option<&str> {
        self.extra
            .get("user_metadata")
            .and_then(|metadata| metadata.get("role"))
            .and_then(|role| role.as_str())
    }
}
