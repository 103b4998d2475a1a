use std::sync::Mutex;

use super::{Credential, CredentialStore};

/// Process-local store. Lives as long as the value does.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: Mutex::new(Some(credential)),
        }
    }

    fn with_slot<R>(&self, f: impl FnOnce(&mut Option<Credential>) -> R) -> R {
        // A poisoned lock still holds a consistent Option.
        let mut guard = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn set(&self, credential: Credential) {
        self.with_slot(|slot| *slot = Some(credential));
    }

    fn get(&self) -> Option<Credential> {
        self.with_slot(|slot| slot.clone())
    }

    fn clear(&self) {
        self.with_slot(|slot| *slot = None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cred(token: &str) -> Credential {
        Credential::new(token).unwrap()
    }

    #[test]
    fn test_get_reflects_most_recent_operation() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.get(), None);

        store.set(cred("first"));
        assert_eq!(store.get(), Some(cred("first")));

        store.set(cred("second"));
        assert_eq!(store.get(), Some(cred("second")));

        store.clear();
        assert_eq!(store.get(), None);

        store.set(cred("third"));
        assert_eq!(store.get(), Some(cred("third")));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = MemoryCredentialStore::with_credential(cred("t"));
        store.clear();
        store.clear();
        assert_eq!(store.get(), None);
    }
}
