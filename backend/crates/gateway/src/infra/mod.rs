//! Infrastructure Layer
//!
//! Auth provider client and cookie-backed session storage.

pub mod cookie_storage;
pub mod gotrue;

pub use cookie_storage::CookieSessionStorage;
pub use gotrue::GoTrueClient;
