//! Application Layer
//!
//! Use cases and application services.

pub mod check_session;
pub mod config;
pub mod gateway;

// Re-exports
pub use check_session::{CheckSessionUseCase, ValidatedSession};
pub use config::{Environment, GatewayConfig, RefreshPolicy, SessionCookieConfig};
pub use gateway::{Decision, decide, select_role_location};
