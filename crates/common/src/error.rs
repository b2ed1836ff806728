//! Error types shared across vcrop crates.

use std::path::PathBuf;

/// Top-level error type for vcrop operations.
#[derive(Debug, thiserror::Error)]
pub enum CropError {
    /// Bad input that is caught before any I/O is attempted: a rectangle
    /// outside the frame, a non-positive dimension, an unknown output
    /// format. Recoverable — the caller corrects the input and retries.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Source or destination I/O failure. When a crop job fails mid-stream,
    /// `frame_index` carries the index of the last frame that was written
    /// successfully before the abort.
    #[error("I/O error{}: {message}", frame_index.map(|i| format!(" after frame {i}")).unwrap_or_default())]
    Io {
        frame_index: Option<u64>,
        message: String,
    },

    /// Transient read failure (timeouts on network-backed sources). The
    /// crop pipeline retries these a bounded number of times before giving
    /// up and converting to `Io`.
    #[error("Transient error: {message}")]
    Transient { message: String },

    /// An operation that requires an active selection was attempted without
    /// one. Callers treat this as a refusal, never a crash.
    #[error("State error: {message}")]
    State { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    StdIo(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using CropError.
pub type CropResult<T> = Result<T, CropError>;

impl CropError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io {
            frame_index: None,
            message: msg.into(),
        }
    }

    pub fn io_at_frame(frame_index: u64, msg: impl Into<String>) -> Self {
        Self::Io {
            frame_index: Some(frame_index),
            message: msg.into(),
        }
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient {
            message: msg.into(),
        }
    }

    pub fn state(msg: impl Into<String>) -> Self {
        Self::State {
            message: msg.into(),
        }
    }

    /// Whether this error class is eligible for bounded retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}
