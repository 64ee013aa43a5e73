//! Session Error Types
//!
//! Why a request has no usable session. The gateway answers every variant
//! with the same redirect; the variants exist so logs can tell an auth
//! provider outage apart from a visitor who simply is not signed in.

use kernel::error::kind::ErrorKind;
use platform::cookie::CookieError;
use thiserror::Error;

/// Session-check result type alias
pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    /// No session cookie on the request
    #[error("No session cookie present")]
    Missing,

    /// Session cookie present but not decodable
    #[error("Session cookie is malformed: {0}")]
    Malformed(String),

    /// Session expired and the refresh policy did not renew it
    #[error("Session expired")]
    Expired,

    /// Auth provider rejected the refresh token
    #[error("Session rejected by auth provider: {0}")]
    Invalid(String),

    /// Auth provider unreachable or answered unexpectedly
    #[error("Auth provider error: {0}")]
    Provider(String),

    /// Refreshed session could not be written back
    #[error("Failed to persist session: {0}")]
    Storage(#[from] CookieError),
}

impl SessionError {
    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Missing
            | SessionError::Malformed(_)
            | SessionError::Expired
            | SessionError::Invalid(_) => ErrorKind::Unauthorized,
            SessionError::Provider(_) => ErrorKind::BadGateway,
            SessionError::Storage(_) => ErrorKind::InternalServerError,
        }
    }

    /// Short machine-readable reason, used as a log field
    pub fn reason(&self) -> &'static str {
        match self {
            SessionError::Missing => "missing",
            SessionError::Malformed(_) => "malformed",
            SessionError::Expired => "expired",
            SessionError::Invalid(_) => "invalid",
            SessionError::Provider(_) => "provider_error",
            SessionError::Storage(_) => "storage_error",
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self, path: &str) {
        match self {
            SessionError::Missing => {
                tracing::debug!(path, reason = self.reason(), "No session, redirecting");
            }
            SessionError::Provider(_) | SessionError::Storage(_) => {
                tracing::warn!(
                    path,
                    reason = self.reason(),
                    kind = %self.kind(),
                    error = %self,
                    "Session check failed, redirecting"
                );
            }
            _ => {
                tracing::info!(
                    path,
                    reason = self.reason(),
                    error = %self,
                    "Session rejected, redirecting"
                );
            }
        }
    }
}
