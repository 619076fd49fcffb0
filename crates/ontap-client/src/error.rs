//! Client error types.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl ClientError {
    /// The resource does not exist (removed or renamed upstream).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// The session is not (or no longer) authorized.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Short classification label for logs and metrics.
    pub fn classification(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::Status { .. } => "status",
            Self::Transport(_) => "transport",
            Self::Decode(_) => "decode",
            Self::HttpClient(_) => "http_client",
        }
    }

    /// Raw message as provided by the backend (or the transport), without
    /// the classification prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(m)
            | Self::Unauthorized(m)
            | Self::Transport(m)
            | Self::Decode(m)
            | Self::HttpClient(m) => m,
            Self::Status { message, .. } => message,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(ClientError::NotFound("location".into()).is_not_found());
        assert!(!ClientError::Transport("reset".into()).is_not_found());
        assert!(ClientError::Unauthorized("expired".into()).is_unauthorized());
        assert_eq!(
            ClientError::Status {
                status: 500,
                message: "boom".into()
            }
            .classification(),
            "status"
        );
    }

    #[test]
    fn test_message_is_raw() {
        let err = ClientError::Status {
            status: 503,
            message: "maintenance".into(),
        };
        assert_eq!(err.message(), "maintenance");
        assert_eq!(err.to_string(), "HTTP 503: maintenance");
    }
}
