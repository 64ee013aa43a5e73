//! Platform Crate - Technical Infrastructure
//!
//! Shared HTTP plumbing for the edge workspace:
//! - Cookie parsing, `Set-Cookie` serialization and the request-scoped jar
//! - Normalized request information (host, scheme, path, origin)
//! - Base64 helpers used by token and cookie codecs

pub mod cookie;
pub mod crypto;
pub mod request;
