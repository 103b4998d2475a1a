//! Login, signup and logout exchanges.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::credential::Credential;
use crate::error::ClientError;
use crate::gateway::{ApiRequest, Gateway, Transport};

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Exchange username/password for a credential and store it.
///
/// Bad credentials come back as a 401, which the gateway treats like any
/// other authentication failure; the caller sees `Unauthorized`.
pub async fn login<T: Transport>(
    gateway: &Gateway<T>,
    username: &str,
    password: &str,
) -> Result<(), ClientError> {
    let request = ApiRequest::post("/token").form([("username", username), ("password", password)]);
    let token: TokenResponse = gateway.fetch_json(request).await?;
    let credential = Credential::new(token.access_token)
        .ok_or_else(|| ClientError::Decode("empty access_token".into()))?;

    gateway.credentials().set(credential);
    info!("Logged in as {}", username);
    Ok(())
}

/// Create an account. Duplicate email/username is reported as `Conflict`.
pub async fn register<T: Transport>(
    gateway: &Gateway<T>,
    registration: &Registration,
) -> Result<(), ClientError> {
    let request = ApiRequest::post("/register").json(registration)?;
    match gateway.execute(request).await {
        Ok(_) => {
            info!("Registered account {}", registration.username);
            Ok(())
        }
        Err(ClientError::Status {
            status: 400 | 409,
            message,
        }) => Err(ClientError::Conflict(message)),
        Err(e) => Err(e),
    }
}

/// End the session. The server call is best-effort; the local credential is
/// cleared whatever it answers.
pub async fn logout<T: Transport>(gateway: &Gateway<T>) {
    if let Err(e) = gateway.execute(ApiRequest::post("/logout")).await {
        warn!("Logout request failed, clearing session anyway: {}", e);
    }
    gateway.credentials().clear();
    info!("Logged out");
}
