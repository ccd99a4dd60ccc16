//! Error types for the renderer module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running the renderer.
#[derive(Debug, Error)]
pub enum RendererError {
    /// Scene file to probe or render does not exist.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// The renderer process could not be started.
    #[error("Failed to spawn renderer {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A probe finished without emitting its sentinel-prefixed payload.
    #[error("Renderer output did not contain the expected payload")]
    InvalidOutput {
        /// Everything the probe printed, for diagnostics.
        output: String,
        /// Last lines the renderer wrote to stderr.
        stderr: Option<String>,
    },

    /// The sentinel line was found but its payload could not be decoded.
    #[error("Failed to decode renderer payload: {reason}")]
    Payload { reason: String },

    /// The render process exited unsuccessfully.
    #[error("Renderer exited with code {code:?} (signal {signal:?})")]
    NonZeroExit {
        code: Option<i32>,
        signal: Option<i32>,
        /// Last lines the renderer wrote to stderr.
        stderr: Option<String>,
    },

    /// Reading from or waiting on the renderer process failed.
    #[error("Renderer process failed: {source}")]
    ProcessFailed {
        #[source]
        source: std::io::Error,
    },

    /// Render parameters could not be serialized.
    #[error("Failed to encode render parameters: {0}")]
    Encode(#[from] serde_json::Error),

    /// The render was cancelled through its handle.
    #[error("Render cancelled")]
    Cancelled,
}

impl RendererError {
    /// Creates a process failure from an I/O error.
    pub fn process_failed(source: std::io::Error) -> Self {
        Self::ProcessFailed { source }
    }

    /// Creates a payload decoding error.
    pub fn payload(reason: impl Into<String>) -> Self {
        Self::Payload {
            reason: reason.into(),
        }
    }

    /// Whether a caller-level retry of the same job makes sense.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NonZeroExit { .. } | Self::ProcessFailed { .. })
    }
}
