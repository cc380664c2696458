use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::eligibility::Ineligibility;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("No response within {0:?}")]
    Timeout(Duration),
    #[error("Request was not acknowledged: {0}")]
    NotAcknowledged(String),
    #[error("A vote is already being submitted")]
    InFlight,
    #[error("Cannot vote: {0}")]
    Ineligible(Ineligibility),
    #[error("Unexpected response shape: {0}")]
    Format(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] Box<figment::Error>),
}

/// Coarse error classes, as far as callers need to tell them apart.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad credentials, or an expired or missing token. Forces re-authentication.
    Auth,
    /// Rejected input, to be shown next to the offending form.
    Validation,
    /// The server refused because of existing state, e.g. a second vote.
    Conflict,
    /// The request never completed.
    Network,
    /// Anything else.
    Other,
}

impl Error {
    /// Map a non-success HTTP status and the server's message to an error.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 | 422 => Self::Validation(message),
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            _ => Self::Server { status, message },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Auth,
            Self::Validation(_) | Self::Ineligible(_) => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Network(_) | Self::Timeout(_) => ErrorKind::Network,
            _ => ErrorKind::Other,
        }
    }

    /// Whether repeating the same call could reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::NotAcknowledged(_) => true,
            Self::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The backend reports a repeated ballot as a plain bad request; treat it as a conflict.
    pub(crate) fn into_double_vote(self) -> Self {
        match self {
            Self::Validation(message) if message.to_lowercase().contains("already voted") => {
                Self::Conflict(message)
            }
            other => other,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

/// Fallback message when the server sent none.
pub(crate) fn reason(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown status")
        .to_string()
}
