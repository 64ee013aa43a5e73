//! Check Session Use Case
//!
//! Loads the session from the request cookies, refreshes it with the auth
//! provider and writes the rotated tokens back into the same jar.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use platform::cookie::CookieJar;

use crate::application::config::{GatewayConfig, RefreshPolicy};
use crate::domain::entity::session::Session;
use crate::domain::repository::{AuthProvider, SessionStorage};
use crate::error::{SessionError, SessionResult};

/// A session the request may proceed with
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub session: Session,
    /// Whether new tokens were written to the jar
    pub refreshed: bool,
}

/// Check session use case
pub struct CheckSessionUseCase<P, S>
where
    P: AuthProvider + Send + Sync + 'static,
    S: SessionStorage + Send + Sync + 'static,
{
    provider: Arc<P>,
    storage: Arc<S>,
    config: Arc<GatewayConfig>,
}

impl<P, S> CheckSessionUseCase<P, S>
where
    P: AuthProvider + Send + Sync + 'static,
    S: SessionStorage + Send + Sync + 'static,
{
    pub fn new(provider: Arc<P>, storage: Arc<S>, config: Arc<GatewayConfig>) -> Self {
        Self {
            provider,
            storage,
            config,
        }
    }

    /// Validate (and usually rotate) the session held in `jar`
    pub async fn execute(&self, jar: &mut CookieJar) -> SessionResult<ValidatedSession> {
        let session = self.storage.load(jar)?.ok_or(SessionError::Missing)?;
        let now = Utc::now();

        if !self.should_refresh(&session, now) {
            return Ok(ValidatedSession {
                session,
                refreshed: false,
            });
        }

        let refreshed = self
            .provider
            .refresh_session(&session.refresh_token)
            .await?
            .with_expiry_from(now);

        if refreshed.is_expired_at(now) {
            return Err(SessionError::Expired);
        }

        self.storage.save(jar, &refreshed)?;

        tracing::debug!(
            user_id = %refreshed.user_id(),
            expires_at = ?refreshed.expires_at,
            "Session refreshed"
        );

        Ok(ValidatedSession {
            session: refreshed,
            refreshed: true,
        })
    }

    fn should_refresh(&self, session: &Session, now: DateTime<Utc>) -> bool {
        match self.config.refresh {
            RefreshPolicy::Always => true,
            RefreshPolicy::WithinMargin(margin) => {
                let margin = TimeDelta::from_std(margin).unwrap_or(TimeDelta::MAX);
                session.expires_within(now, margin)
            }
        }
    }
}
