//! Provider and Storage Traits
//!
//! Interfaces to the auth provider and to the cookie-backed session store.
//! Implementations are in the infrastructure layer.

use platform::cookie::CookieJar;

use crate::domain::entity::session::Session;
use crate::error::SessionResult;

/// Auth provider trait
#[trait_variant::make(AuthProvider: Send)]
pub trait LocalAuthProvider {
    /// Exchange a refresh token for a new session
    async fn refresh_session(&self, refresh_token: &str) -> SessionResult<Session>;
}

/// Session storage backed by the request's cookie jar
pub trait SessionStorage {
    /// Read the session from the jar, `None` when no session cookie exists
    fn load(&self, jar: &CookieJar) -> SessionResult<Option<Session>>;

    /// Write the session into the jar
    fn save(&self, jar: &mut CookieJar, session: &Session) -> SessionResult<()>;
}
