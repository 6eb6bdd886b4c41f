use thiserror::Error;

use iboard_types::api::ErrorBody;

/// Failures of a call to the board API, classified the same way the server
/// classifies them.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("validation failed: {message}")]
    Validation { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("rate limited (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// No response at all: DNS, connect, timeout, reset.
    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Classify a non-2xx response from its status and, when the server sent
    /// one, its error envelope.
    pub fn from_status(status: u16, body: Option<ErrorBody>) -> Self {
        let retry_after = body.as_ref().and_then(|b| b.retry_after);
        let message = body
            .map(|b| b.error)
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| format!("HTTP {}", status));

        match status {
            400 | 422 => Self::Validation { message },
            404 => Self::NotFound { message },
            429 => Self::RateLimited { retry_after },
            s if s >= 500 => Self::Server { status, message },
            _ => Self::Http { status, message },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Validation { .. } => Some(400),
            Self::NotFound { .. } => Some(404),
            Self::RateLimited { .. } => Some(429),
            Self::Server { status, .. } | Self::Http { status, .. } => Some(*status),
            Self::Network(_) | Self::Decode(_) => None,
        }
    }

    /// True when the server was never reached.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Text for an error notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::RateLimited { .. } => {
                "Too many requests. Please wait a moment before trying again.".into()
            }
            Self::Server { .. } => {
                "Server is temporarily unavailable. Please try again later.".into()
            }
            Self::NotFound { .. } => "The requested resource was not found.".into(),
            Self::Validation { message } | Self::Http { message, .. } => message.clone(),
            Self::Network(msg) if msg.is_empty() => "Network error occurred".into(),
            Self::Network(msg) => msg.clone(),
            Self::Decode(_) => "Unexpected response from the server.".into(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), None)
        } else {
            Self::Network(err.to_string())
        }
    }
}
