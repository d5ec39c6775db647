//! Shared application state passed to every handler via Axum's `State` extractor.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::config::Config;
use crate::models::Store;
use crate::templates::Templates;

/// Shared application state for the Warbler server.
#[derive(Clone)]
pub struct AppState {
    /// Immutable configuration loaded at startup.
    pub config: Arc<Config>,
    /// Monotonic instant when the server started (for uptime calculation).
    pub start_time: Instant,
    /// Users, messages, follows and likes.
    pub store: Store,
    /// Compiled page templates.
    pub templates: Arc<Templates>,
    /// Signing key for the session cookie, derived from `auth.secret_key`.
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(config: Config, store: Store) -> Result<Self, minijinja::Error> {
        let cookie_key = derive_cookie_key(&config.auth.secret_key);
        Ok(Self {
            config: Arc::new(config),
            start_time: Instant::now(),
            store,
            templates: Arc::new(Templates::new()?),
            cookie_key,
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Stretch an arbitrary-length secret into the 64 bytes [`Key`] requires.
fn derive_cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}
