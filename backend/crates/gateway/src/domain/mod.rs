//! Domain Layer
//!
//! Session entity, routing policies, provider and storage traits.

pub mod entity;
pub mod policy;
pub mod repository;

// Re-exports
pub use entity::session::{Session, SessionUser};
pub use policy::{CorsPolicy, HostPolicy, PathPolicy, Route};
pub use repository::{AuthProvider, SessionStorage};
