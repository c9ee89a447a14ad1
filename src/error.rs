//! Error types for the game session engine.
//!
//! Errors raised during play are recoverable: the session loop
//! logs them and moves on to the next event. Location-tracking errors record
//! where they were raised so log lines point at the failing call site.

use derive_more::{Display, Error};
use tracing::{error, instrument, warn};

/// Malformed or undecodable stream payload.
#[derive(Debug, Clone, Display, Error)]
#[display("Protocol error: {} at {}:{}", message, file, line)]
pub struct ProtocolError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ProtocolError {
    /// Creates a new protocol error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Network failure or non-success response from a remote call.
#[derive(Debug, Clone, Display, Error)]
#[display("Transport error: {} at {}:{}", message, file, line)]
pub struct TransportError {
    /// Error message.
    pub message: String,
    /// HTTP status, when the server answered at all.
    pub status: Option<u16>,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl TransportError {
    /// Creates a transport error for a failure without a server response.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            status: None,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Creates a transport error for a non-success HTTP status.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            status: Some(status),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Whether repeating the same request may succeed.
    ///
    /// Connection failures, rate limiting and server errors are retryable;
    /// any other status is a definitive answer.
    pub fn is_retryable(&self) -> bool {
        match self.status {
            None => true,
            Some(status) => status == 429 || status >= 500,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    #[track_caller]
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::with_status(status.as_u16(), format!("HTTP error: {}", err)),
            None => Self::new(format!("HTTP error: {}", err)),
        }
    }
}

/// Ledger read or write failure.
#[derive(Debug, Clone, Display, Error)]
#[display("Persistence error: {} at {}:{}", message, file, line)]
pub struct PersistenceError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl PersistenceError {
    /// Creates a new persistence error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        let message = message.into();
        warn!(error_message = %message, "Persistence error created");
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<std::io::Error> for PersistenceError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::new(format!("I/O error: {}", err))
    }
}

impl From<serde_json::Error> for PersistenceError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("JSON error: {}", err))
    }
}

/// Error raised when a move token cannot be applied to a position.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum MoveError {
    /// The token is neither coordinate notation nor SAN.
    #[display("Cannot parse move token {:?}", _0)]
    Parse(String),

    /// The token parsed but is not legal in the position.
    #[display("Illegal move {token} in position {fen}")]
    Illegal {
        /// The rejected token.
        token: String,
        /// Position the token was checked against.
        fen: String,
    },
}

impl std::error::Error for MoveError {}

/// An oracle suggestion that is no longer legal when it is about to be sent.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("Stale suggestion {token}: {reason}")]
pub struct StaleSuggestion {
    /// The suggested token.
    pub token: String,
    /// Why the board rejected it.
    pub reason: MoveError,
}

impl std::error::Error for StaleSuggestion {}

/// Failure of a move submission.
#[derive(Debug, Clone, Display)]
pub enum SubmitError {
    /// The suggestion failed re-validation; nothing was sent.
    #[display("{}", _0)]
    Stale(StaleSuggestion),

    /// The remote service did not confirm the move; local state unchanged.
    #[display("{}", _0)]
    Transport(TransportError),

    /// The server accepted a move the local board then refused.
    #[display("Board desynchronized after accepted move: {}", _0)]
    Desync(MoveError),
}

impl std::error::Error for SubmitError {}

impl From<StaleSuggestion> for SubmitError {
    fn from(err: StaleSuggestion) -> Self {
        Self::Stale(err)
    }
}

impl From<TransportError> for SubmitError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        let message = message.into();
        error!(error_message = %message, "Config error created");
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
