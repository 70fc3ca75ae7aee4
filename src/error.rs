//! Error taxonomy of the client.
//!
//! Every failure a caller can observe is a [`ClientError`]. The set of
//! variants is closed; [`ClientError::kind`] flattens it to an
//! [`ErrorKind`] for diagnostics and [`ClientError::is_retryable`] tells the
//! retry policy which failures are transient.

use std::{collections::BTreeMap, fmt, time::Duration};

use thiserror::Error;

use crate::models::Outcome;

/// Result type of client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Flat discriminant of [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingCredential,
    Auth,
    NotFound,
    Validation,
    RateLimited,
    Server,
    Network,
    Protocol,
    GameOver,
    UnexpectedStatus,
    Decision,
    Config,
    Setup,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorKind::MissingCredential => "missing_credential",
            ErrorKind::Auth => "auth",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Server => "server",
            ErrorKind::Network => "network",
            ErrorKind::Protocol => "protocol",
            ErrorKind::GameOver => "game_over",
            ErrorKind::UnexpectedStatus => "unexpected_status",
            ErrorKind::Decision => "decision",
            ErrorKind::Config => "config",
            ErrorKind::Setup => "setup",
        };
        f.write_str(name)
    }
}

/// Errors returned by the client, the retry policy and the turn loop.
///
/// Variants built from an HTTP response keep the status code and the raw
/// response body for diagnostics.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No API key was passed and the environment fallback is unset.
    #[error("no API key provided, pass one explicitly or set {env_var}")]
    MissingCredential { env_var: &'static str },

    /// HTTP 401 or 403.
    #[error("authentication failed ({status}): {message}")]
    Auth {
        status: u16,
        message: String,
        body: String,
    },

    /// HTTP 404.
    #[error("not found: {message}")]
    NotFound { message: String, body: String },

    /// HTTP 400 or 422, or an action rejected locally before sending
    /// (`status` is `None` then).
    #[error("invalid request: {message}")]
    Validation {
        status: Option<u16>,
        message: String,
        /// Rejection code sent with 422 responses.
        code: Option<String>,
        /// Per-field messages sent with 400 responses.
        details: Option<BTreeMap<String, Vec<String>>>,
        body: String,
    },

    /// HTTP 429.
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        /// Server supplied `retry-after` hint.
        retry_after: Option<Duration>,
        body: String,
    },

    /// HTTP 5xx.
    #[error("server error ({status}): {message}")]
    Server {
        status: u16,
        message: String,
        body: String,
    },

    /// Connection refused, DNS failure, timeout.
    #[error("network error: {0}")]
    Network(String),

    /// The payload did not match the expected schema.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// HTTP 409 carrying the terminal outcome of a game that already ended.
    #[error("game over: {message}")]
    GameOver {
        message: String,
        outcome: Outcome,
        body: String,
    },

    /// Any other non-2xx status.
    #[error("unexpected status {status}: {message}")]
    UnexpectedStatus {
        status: u16,
        message: String,
        body: String,
    },

    /// The caller's decision function failed.
    #[error("decision function failed [game={game_id}, turn={turn}]")]
    Decision {
        game_id: String,
        turn: u32,
        #[source]
        source: anyhow::Error,
    },

    /// Configuration could not be extracted.
    #[error("invalid configuration: {0}")]
    Config(#[source] Box<figment::Error>),

    /// The client could not be built: an API key that is not a valid header
    /// value, or a runtime that failed to start.
    #[error("client setup failed: {0}")]
    Setup(String),
}

impl From<figment::Error> for ClientError {
    fn from(error: figment::Error) -> Self {
        ClientError::Config(Box::new(error))
    }
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::MissingCredential { .. } => ErrorKind::MissingCredential,
            ClientError::Auth { .. } => ErrorKind::Auth,
            ClientError::NotFound { .. } => ErrorKind::NotFound,
            ClientError::Validation { .. } => ErrorKind::Validation,
            ClientError::RateLimited { .. } => ErrorKind::RateLimited,
            ClientError::Server { .. } => ErrorKind::Server,
            ClientError::Network(_) => ErrorKind::Network,
            ClientError::Protocol(_) => ErrorKind::Protocol,
            ClientError::GameOver { .. } => ErrorKind::GameOver,
            ClientError::UnexpectedStatus { .. } => ErrorKind::UnexpectedStatus,
            ClientError::Decision { .. } => ErrorKind::Decision,
            ClientError::Config(_) => ErrorKind::Config,
            ClientError::Setup(_) => ErrorKind::Setup,
        }
    }

    /// Whether repeating the identical request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::RateLimited | ErrorKind::Server | ErrorKind::Network
        )
    }

    /// HTTP status of the response this error was built from.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Auth { status, .. }
            | ClientError::Server { status, .. }
            | ClientError::UnexpectedStatus { status, .. } => Some(*status),
            ClientError::Validation { status, .. } => *status,
            ClientError::NotFound { .. } => Some(404),
            ClientError::RateLimited { .. } => Some(429),
            ClientError::GameOver { .. } => Some(409),
            _ => None,
        }
    }

    /// Raw body of the response this error was built from.
    pub fn body(&self) -> Option<&str> {
        match self {
            ClientError::Auth { body, .. }
            | ClientError::NotFound { body, .. }
            | ClientError::RateLimited { body, .. }
            | ClientError::Server { body, .. }
            | ClientError::GameOver { body, .. }
            | ClientError::UnexpectedStatus { body, .. } => Some(body.as_str()),
            ClientError::Validation {
                status: Some(_),
                body,
                ..
            } => Some(body.as_str()),
            _ => None,
        }
    }

    /// Server supplied wait hint of a 429 response.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ClientError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
