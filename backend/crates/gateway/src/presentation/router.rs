//! Gateway Layer

use axum::Router;
use axum::middleware::from_fn_with_state;

use crate::application::config::GatewayConfig;
use crate::domain::repository::{AuthProvider, SessionStorage};
use crate::infra::{CookieSessionStorage, GoTrueClient};
use crate::presentation::middleware::{GatewayState, auth_gateway};

/// Wrap `router` with the auth gateway backed by GoTrue and session cookies
pub fn with_auth_gateway(router: Router, provider: GoTrueClient, config: GatewayConfig) -> Router {
    let storage = CookieSessionStorage::new(&config.session_cookie);
    with_auth_gateway_generic(router, GatewayState::new(provider, storage, config))
}

/// Wrap `router` with the auth gateway for any provider and storage
pub fn with_auth_gateway_generic<P, S>(router: Router, state: GatewayState<P, S>) -> Router
where
    P: AuthProvider + Send + Sync + 'static,
    S: SessionStorage + Send + Sync + 'static,
{
    router.layer(from_fn_with_state(state, auth_gateway::<P, S>))
}
