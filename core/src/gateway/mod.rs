//! Request Gateway: every call to the remote service goes through here.
//!
//! The gateway attaches the credential and owns the session-expiry policy:
//! the first 401 seen for a logical request clears the Credential Store and
//! sends the user to the entry view. Every other failure is returned to the
//! caller untouched.

mod http;
mod transport;

use std::rc::Rc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

pub use http::HttpTransport;
pub use transport::{ApiRequest, ApiResponse, Body, Method, Transport};

use crate::credential::CredentialStore;
use crate::error::ClientError;
use crate::navigation::{Navigator, View};

pub const AUTHORIZATION: &str = "Authorization";
pub const STATUS_UNAUTHORIZED: u16 = 401;

/// Per-logical-request state. The auth-failure flag is claimed at most once,
/// so however many attempts share a context, the session is torn down once.
#[derive(Debug, Default)]
pub struct RequestContext {
    auth_failure_handled: bool,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auth_failure_handled(&self) -> bool {
        self.auth_failure_handled
    }

    /// True only for the first call.
    fn claim_auth_failure(&mut self) -> bool {
        !std::mem::replace(&mut self.auth_failure_handled, true)
    }
}

pub struct Gateway<T> {
    transport: T,
    credentials: Rc<dyn CredentialStore>,
    navigator: Rc<dyn Navigator>,
}

impl<T: Transport> Gateway<T> {
    pub fn new(
        transport: T,
        credentials: Rc<dyn CredentialStore>,
        navigator: Rc<dyn Navigator>,
    ) -> Self {
        Self {
            transport,
            credentials,
            navigator,
        }
    }

    pub fn credentials(&self) -> &dyn CredentialStore {
        self.credentials.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `request` as its own logical request.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let mut ctx = RequestContext::new();
        self.execute_in(&mut ctx, request).await
    }

    /// Send `request` as one attempt of the logical request tracked by `ctx`.
    pub async fn execute_in(
        &self,
        ctx: &mut RequestContext,
        mut request: ApiRequest,
    ) -> Result<ApiResponse, ClientError> {
        if let Some(credential) = self.credentials.get() {
            request = request.header(AUTHORIZATION, credential.bearer());
        }

        let label = format!("{} {}", request.method, request.path);
        debug!("-> {}", label);

        let response = self.transport.send(request).await.map_err(|e| {
            warn!("{} failed: {}", label, e);
            e
        })?;
        debug!("<- {} {}", label, response.status);

        if response.status == STATUS_UNAUTHORIZED {
            if ctx.claim_auth_failure() {
                warn!("{} was rejected as unauthenticated, ending session", label);
                self.credentials.clear();
                self.navigator.hard_redirect(View::ENTRY);
            } else {
                debug!("{}: auth failure already handled for this request", label);
            }
            return Err(ClientError::Unauthorized);
        }

        if !response.is_success() {
            let message = response.error_message();
            warn!("{} returned {}: {}", label, response.status, message);
            return Err(ClientError::Status {
                status: response.status,
                message,
            });
        }

        Ok(response)
    }

    /// Execute and decode a JSON body.
    pub async fn fetch_json<R: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<R, ClientError> {
        let response = self.execute(request).await?;
        response.json().map_err(|e| {
            warn!("Failed to decode response: {}", e);
            e
        })
    }
}
