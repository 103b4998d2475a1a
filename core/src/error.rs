use thiserror::Error;

/// How a failure should be presented. Only `Authentication` is handled
/// centrally (by the gateway); everything else is reported by the view that
/// issued the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    Validation,
    Conflict,
    Transient,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error("Session expired, please log in again")]
    Unauthorized,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The server answered 2xx but reported a processing error in the body.
    #[error("Server rejected the request: {0}")]
    Rejected(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Unauthorized => ErrorKind::Authentication,
            ClientError::Validation(_) | ClientError::Config(_) => ErrorKind::Validation,
            ClientError::Conflict(_) => ErrorKind::Conflict,
            ClientError::Rejected(_)
            | ClientError::Status { .. }
            | ClientError::Transport(_)
            | ClientError::Decode(_) => ErrorKind::Transient,
        }
    }

    /// True when the gateway already dealt with this failure (credential
    /// cleared, entry view shown) and the caller should not report it.
    pub fn is_session_expired(&self) -> bool {
        self.kind() == ErrorKind::Authentication
    }
}

impl From<ClientError> for String {
    fn from(err: ClientError) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_taxonomy() {
        assert_eq!(ClientError::Unauthorized.kind(), ErrorKind::Authentication);
        assert_eq!(
            ClientError::Validation("n_days".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ClientError::Conflict("taken".into()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            ClientError::Status {
                status: 500,
                message: "boom".into()
            }
            .kind(),
            ErrorKind::Transient
        );
        assert_eq!(
            ClientError::Rejected("bad csv".into()).kind(),
            ErrorKind::Transient
        );
    }

    #[test]
    fn test_only_unauthorized_is_session_expired() {
        assert!(ClientError::Unauthorized.is_session_expired());
        assert!(!ClientError::Transport("reset".into()).is_session_expired());
    }

    #[test]
    fn test_into_string_uses_display() {
        let msg: String = ClientError::Status {
            status: 503,
            message: "unavailable".into(),
        }
        .into();
        assert_eq!(msg, "HTTP 503: unavailable");
    }
}
