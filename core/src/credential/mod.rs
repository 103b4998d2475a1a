//! Credential Store: the single owner of the session bearer token.
//!
//! The authenticated state is never stored separately; it is derived from
//! whether the store currently holds a credential (see [`is_authenticated`]).

#[cfg(not(target_arch = "wasm32"))]
mod file;
mod memory;

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

/// Opaque bearer token issued by the authentication endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token. Blank tokens are the unauthenticated state and are
    /// therefore not representable.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Persist, read and forget the session credential.
///
/// Implementations never fail from the caller's point of view: storage
/// problems are logged and read back as absence.
pub trait CredentialStore {
    fn set(&self, credential: Credential);
    fn get(&self) -> Option<Credential>;
    fn clear(&self);
}

impl<S: CredentialStore + ?Sized> CredentialStore for Rc<S> {
    fn set(&self, credential: Credential) {
        (**self).set(credential)
    }
    fn get(&self) -> Option<Credential> {
        (**self).get()
    }
    fn clear(&self) {
        (**self).clear()
    }
}

impl<S: CredentialStore + ?Sized> CredentialStore for Arc<S> {
    fn set(&self, credential: Credential) {
        (**self).set(credential)
    }
    fn get(&self) -> Option<Credential> {
        (**self).get()
    }
    fn clear(&self) {
        (**self).clear()
    }
}

/// Session state, derived from the store on every call.
pub fn is_authenticated(store: &dyn CredentialStore) -> bool {
    store.get().is_some()
}
