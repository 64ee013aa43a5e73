//! Presentation Layer
//!
//! Middleware, response headers and router wiring.

pub mod headers;
pub mod middleware;
pub mod router;

pub use headers::{
    X_AUTH_HUB, X_USER_EMAIL, X_USER_ID, X_USER_ROLE, apply_security_headers,
    forward_identity_headers, strip_identity_headers,
};
pub use middleware::{GatewayState, auth_gateway};
pub use router::{with_auth_gateway, with_auth_gateway_generic};
