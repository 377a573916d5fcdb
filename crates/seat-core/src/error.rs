//! Error taxonomy shared by every SEAT component

use crate::renderer::lifecycle::RendererState;
use thiserror::Error;

/// Errors that can occur while driving the renderer and display
#[derive(Error, Debug)]
pub enum SeatError {
    /// Missing or invalid resource path, malformed address, bad list file.
    /// Recoverable: fix the configuration and configure again.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An operation was invoked outside its required lifecycle state
    #[error("Cannot {operation} while renderer is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: RendererState,
    },

    /// The renderer process could not be confirmed alive after one retry.
    /// Fatal: the session cannot continue.
    #[error("Renderer failed to start: {reason}")]
    RendererStart {
        reason: String,
        stdout: String,
        stderr: String,
    },

    #[error("Failed to send OSC message {address}: {source}")]
    Send {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode OSC message: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SeatError {
    /// Whether the session must be abandoned after this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, SeatError::RendererStart { .. })
    }
}

/// Result alias used throughout seat-core
pub type Result<T> = std::result::Result<T, SeatError>;
