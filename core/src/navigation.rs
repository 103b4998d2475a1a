//! Views, the Session Guard, and navigation.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, info};

use crate::credential::{is_authenticated, CredentialStore};

/// Navigable views of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Login,
    Signup,
    Weather,
    Dashboard,
}

impl View {
    /// Where unauthenticated users land.
    pub const ENTRY: View = View::Login;

    pub const ALL: [View; 4] = [View::Login, View::Signup, View::Weather, View::Dashboard];

    pub fn path(self) -> &'static str {
        match self {
            View::Login => "/login",
            View::Signup => "/signup",
            View::Weather => "/",
            View::Dashboard => "/dashboard",
        }
    }

    pub fn from_path(path: &str) -> Option<View> {
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        View::ALL.into_iter().find(|v| v.path() == normalized)
    }

    pub fn requires_credential(self) -> bool {
        matches!(self, View::Weather | View::Dashboard)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            View::Login => "login",
            View::Signup => "signup",
            View::Weather => "weather",
            View::Dashboard => "dashboard",
        };
        f.write_str(name)
    }
}

/// Outcome of a navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Permit,
    Redirect(View),
}

/// Decide whether `view` may render. Reads the store on every call; nothing
/// is cached, so a credential cleared a moment ago is already honoured.
pub fn guard(view: View, credentials: &dyn CredentialStore) -> Access {
    if view.requires_credential() && !is_authenticated(credentials) {
        debug!("No credential for {}, redirecting to {}", view, View::ENTRY);
        Access::Redirect(View::ENTRY)
    } else {
        Access::Permit
    }
}

/// Performs hard navigations requested by the gateway.
pub trait Navigator {
    /// Leave the current view for `view`, discarding in-flight view state.
    fn hard_redirect(&self, view: View);
}

impl<N: Navigator + ?Sized> Navigator for Rc<N> {
    fn hard_redirect(&self, view: View) {
        (**self).hard_redirect(view)
    }
}

/// The active view for hosts without a browser location (CLI, tests).
pub struct ViewState {
    current: Cell<View>,
    credentials: Rc<dyn CredentialStore>,
}

impl ViewState {
    /// Starts on the entry view.
    pub fn new(credentials: Rc<dyn CredentialStore>) -> Self {
        Self {
            current: Cell::new(View::ENTRY),
            credentials,
        }
    }

    pub fn current(&self) -> View {
        self.current.get()
    }

    /// Attempt to show `view`; returns the view that is active afterwards.
    pub fn navigate(&self, view: View) -> View {
        let landed = match guard(view, self.credentials.as_ref()) {
            Access::Permit => view,
            Access::Redirect(target) => target,
        };
        self.current.set(landed);
        landed
    }
}

impl Navigator for ViewState {
    fn hard_redirect(&self, view: View) {
        info!("Hard redirect from {} to {}", self.current.get(), view);
        self.current.set(view);
    }
}
