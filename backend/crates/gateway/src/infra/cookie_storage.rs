//! Cookie Session Storage
//!
//! Stores the session the way Supabase browser/SSR clients do: one cookie
//! named `sb-<project-ref>-auth-token` holding `base64-` + base64url(JSON),
//! split into `<name>.0`, `<name>.1`, ... once it outgrows a single cookie.

use platform::cookie::{CookieJar, CookieOptions, decode_value};
use platform::crypto::{from_base64url, to_base64url};

use crate::application::config::SessionCookieConfig;
use crate::domain::entity::session::Session;
use crate::domain::repository::SessionStorage;
use crate::error::{SessionError, SessionResult};

const BASE64_PREFIX: &str = "base64-";

/// Cookie-backed session storage
#[derive(Debug, Clone)]
pub struct CookieSessionStorage {
    name: String,
    chunk_size: usize,
    options: CookieOptions,
}

impl CookieSessionStorage {
    pub fn new(config: &SessionCookieConfig) -> Self {
        Self {
            name: config.cookie_name(),
            chunk_size: config.chunk_size.max(1),
            options: config.options.clone(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.name
    }

    fn chunk_name(&self, index: usize) -> String {
        format!("{}.{}", self.name, index)
    }

    /// Non-empty unchunked cookie first, then consecutive chunks from `.0`
    fn read_raw(&self, jar: &CookieJar) -> Option<String> {
        if let Some(value) = jar.get(&self.name).filter(|value| !value.is_empty()) {
            return Some(value.to_string());
        }

        let mut combined = String::new();
        for index in 0.. {
            match jar.get(&self.chunk_name(index)) {
                Some(chunk) => combined.push_str(chunk),
                None => break,
            }
        }
        (!combined.is_empty()).then_some(combined)
    }

    /// Indices of the chunk cookies currently in the jar
    fn existing_chunks(&self, jar: &CookieJar) -> Vec<usize> {
        let prefix = format!("{}.", self.name);
        jar.names()
            .filter_map(|name| name.strip_prefix(prefix.as_str()))
            .filter_map(|index| index.parse().ok())
            .collect()
    }
}

impl SessionStorage for CookieSessionStorage {
    fn load(&self, jar: &CookieJar) -> SessionResult<Option<Session>> {
        let Some(raw) = self.read_raw(jar) else {
            return Ok(None);
        };
        // Browser clients percent-encode the value, chunks are split after encoding
        let raw = decode_value(&raw).into_owned();
        if raw.trim().is_empty() {
            return Ok(None);
        }

        let json = match raw.strip_prefix(BASE64_PREFIX) {
            Some(encoded) => {
                let bytes = from_base64url(encoded)
                    .map_err(|e| SessionError::Malformed(format!("base64: {e}")))?;
                String::from_utf8(bytes)
                    .map_err(|e| SessionError::Malformed(format!("utf-8: {e}")))?
            }
            None => raw,
        };

        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| SessionError::Malformed(format!("json: {e}")))
    }

    fn save(&self, jar: &mut CookieJar, session: &Session) -> SessionResult<()> {
        let json = serde_json::to_string(session)
            .map_err(|e| SessionError::Malformed(format!("json: {e}")))?;
        let encoded = format!("{}{}", BASE64_PREFIX, to_base64url(json.as_bytes()));

        // base64url output is ASCII, so byte offsets are char boundaries
        let chunks: Vec<&str> = encoded
            .as_bytes()
            .chunks(self.chunk_size)
            .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
            .collect();
        let stale = self.existing_chunks(jar);

        if chunks.len() == 1 {
            jar.set(&self.name, &encoded, &self.options);
            for index in stale {
                jar.remove(&self.chunk_name(index), &self.options);
            }
        } else {
            for (index, chunk) in chunks.iter().enumerate() {
                jar.set(&self.chunk_name(index), chunk, &self.options);
            }
            if jar.get(&self.name).is_some() {
                jar.remove(&self.name, &self.options);
            }
            for index in stale.into_iter().filter(|index| *index >= chunks.len()) {
                jar.remove(&self.chunk_name(index), &self.options);
            }
        }

        Ok(())
    }
}
