//! Auth Gateway Middleware
//!
//! Runs in front of every route: canonical-host redirect, public-path
//! bypass, session validation with token rotation, identity forwarding,
//! security headers.

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use kernel::error::app_error::AppError;
use platform::cookie::CookieJar;
use platform::request::RequestInfo;
use std::sync::Arc;

use crate::application::config::GatewayConfig;
use crate::application::gateway::{Decision, decide, select_role_location};
use crate::application::CheckSessionUseCase;
use crate::domain::repository::{AuthProvider, SessionStorage};
use crate::error::SessionError;
use crate::presentation::headers::{
    apply_security_headers, forward_identity_headers, strip_identity_headers,
};

/// Middleware state
pub struct GatewayState<P, S> {
    pub provider: Arc<P>,
    pub storage: Arc<S>,
    pub config: Arc<GatewayConfig>,
}

impl<P, S> GatewayState<P, S> {
    pub fn new(provider: P, storage: S, config: GatewayConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            storage: Arc::new(storage),
            config: Arc::new(config),
        }
    }
}

impl<P, S> Clone for GatewayState<P, S> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            storage: self.storage.clone(),
            config: self.config.clone(),
        }
    }
}

/// Middleware enforcing the auth hub's access policy
pub async fn auth_gateway<P, S>(
    State(state): State<GatewayState<P, S>>,
    mut req: Request<Body>,
    next: Next,
) -> Response
where
    P: AuthProvider + Send + Sync + 'static,
    S: SessionStorage + Send + Sync + 'static,
{
    let config = &state.config;
    strip_identity_headers(req.headers_mut());
    let info = RequestInfo::from_parts(req.uri(), req.headers(), config.trust_forwarded_headers);

    match decide(config, &info) {
        Decision::Excluded => next.run(req).await,
        Decision::RedirectToCanonical(location) => {
            tracing::info!(
                host = %info.hostname,
                location = %location,
                "Redirecting to canonical host"
            );
            redirect(StatusCode::MOVED_PERMANENTLY, &location)
        }
        Decision::Public => {
            let mut response = next.run(req).await;
            apply_security_headers(response.headers_mut(), config, &info);
            response
        }
        Decision::Protected => {
            let mut jar = CookieJar::from_headers(req.headers());
            let use_case = CheckSessionUseCase::new(
                state.provider.clone(),
                state.storage.clone(),
                state.config.clone(),
            );

            let validated = match use_case.execute(&mut jar).await {
                Ok(validated) => validated,
                Err(e) => {
                    e.log(&info.path);
                    return redirect(
                        StatusCode::TEMPORARY_REDIRECT,
                        &select_role_location(config, &info),
                    );
                }
            };

            // Downstream sees the rotated tokens, not the ones the browser sent
            if let Err(e) = jar.write_request_cookies(req.headers_mut()) {
                SessionError::from(e).log(&info.path);
                return redirect(
                    StatusCode::TEMPORARY_REDIRECT,
                    &select_role_location(config, &info),
                );
            }

            forward_identity_headers(req.headers_mut(), &validated.session);
            tracing::debug!(
                user_id = %validated.session.user_id(),
                refreshed = validated.refreshed,
                path = %info.path,
                "Session accepted"
            );

            let mut response = next.run(req).await;
            if let Err(e) = jar.write_response_cookies(response.headers_mut()) {
                tracing::warn!(error = %e, "Failed to attach refreshed session cookies");
            }
            apply_security_headers(response.headers_mut(), config, &info);
            response
        }
    }
}

fn redirect(status: StatusCode, location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(location) => (status, [(header::LOCATION, location)]).into_response(),
        Err(_) => {
            tracing::warn!(location, "Redirect target is not a valid header value");
            AppError::bad_request("Invalid redirect target").into_response()
        }
    }
}
