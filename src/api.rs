//! Browser bindings for the core session layer: `localStorage` credentials,
//! `location`-based navigation, and the shared gateway.

use std::rc::Rc;

use weatherite_core::{
    ClientConfig, ClientError, Credential, CredentialStore, Gateway, HttpTransport, Navigator,
    View,
};

/// Compile-time override of the service root, e.g.
/// `WEATHERITE_API_URL=https://api.example.com trunk build`.
pub fn config() -> ClientConfig {
    let mut config = ClientConfig::default();
    if let Some(url) = option_env!("WEATHERITE_API_URL") {
        config.base_url = url.to_string();
    }
    config
}

/// A gateway wired to browser storage and navigation.
pub fn gateway() -> Result<Gateway<HttpTransport>, String> {
    let config = config();
    let transport = HttpTransport::new(&config)?;
    Ok(Gateway::new(
        transport,
        Rc::new(LocalStorageCredentials::new(&config.storage_key)),
        Rc::new(BrowserNavigator),
    ))
}

/// Session credential under a single `localStorage` key.
pub struct LocalStorageCredentials {
    key: String,
}

impl LocalStorageCredentials {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
        }
    }

    fn storage(&self) -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok().flatten()
    }
}

impl Default for LocalStorageCredentials {
    fn default() -> Self {
        Self::new(&config().storage_key)
    }
}

impl CredentialStore for LocalStorageCredentials {
    fn set(&self, credential: Credential) {
        let Some(storage) = self.storage() else {
            console_error("localStorage unavailable; session not saved");
            return;
        };
        if storage.set_item(&self.key, credential.token()).is_err() {
            console_error("Failed to save session to localStorage");
        }
    }

    fn get(&self) -> Option<Credential> {
        let token = self.storage()?.get_item(&self.key).ok().flatten()?;
        Credential::new(token)
    }

    fn clear(&self) {
        if let Some(storage) = self.storage() {
            let _ = storage.remove_item(&self.key);
        }
    }
}

/// Full page load to the target view, so every in-memory signal is dropped.
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn hard_redirect(&self, view: View) {
        let Some(location) = web_sys::window().map(|w| w.location()) else {
            return;
        };
        // Already there: leave the page alone so it can report the failure itself.
        let here = location.pathname().ok();
        if here.as_deref().and_then(View::from_path) == Some(view) {
            return;
        }
        if location.set_href(view.path()).is_err() {
            console_error(&format!("Failed to navigate to {}", view.path()));
        }
    }
}

pub fn is_logged_in() -> bool {
    LocalStorageCredentials::default().get().is_some()
}

/// Inline message for a failed call, or `None` when the gateway has already
/// ended the session and redirected.
pub fn inline_error(err: ClientError) -> Option<String> {
    if err.is_session_expired() {
        None
    } else {
        Some(err.to_string())
    }
}

pub fn console_error(message: &str) {
    web_sys::console::error_1(&message.into());
}
