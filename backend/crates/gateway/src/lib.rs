//! Auth Gateway
//!
//! Edge middleware for the auth hub. Every request passes through it before
//! reaching a page or API route.
//!
//! Clean Architecture structure:
//! - `domain/` - Session entity, routing policies, provider and storage traits
//! - `application/` - Configuration, routing decision, session check use case
//! - `infra/` - GoTrue client, cookie-backed session storage
//! - `presentation/` - axum middleware, security headers, router wiring
//!
//! ## Request Flow
//! 1. Static assets pass untouched
//! 2. Production requests on a non-canonical host get a 301 to the canonical host
//! 3. Public paths pass with security headers
//! 4. Everything else needs a session; it is refreshed with the auth provider
//!    and the rotated cookies are forwarded downstream and set on the response,
//!    together with `x-user-id` / `x-user-role` / `x-user-email`
//! 5. Requests without a usable session get a 307 to the role selection page

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::config::{Environment, GatewayConfig, RefreshPolicy, SessionCookieConfig};
pub use error::{SessionError, SessionResult};
pub use infra::{CookieSessionStorage, GoTrueClient};
pub use presentation::middleware::GatewayState;
pub use presentation::router::{with_auth_gateway, with_auth_gateway_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
