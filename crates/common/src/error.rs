//! Error types shared across Lumo crates.

use std::path::PathBuf;

/// Top-level error type for Lumo export operations.
#[derive(Debug, thiserror::Error)]
pub enum LumoError {
    #[error("No frame surface is attached")]
    NoSurface,

    #[error("No animation is loaded")]
    NoAnimation,

    #[error("Unsupported codec {codec:?} for container {container:?}")]
    UnsupportedCodec { container: String, codec: String },

    #[error("Recording produced no data")]
    EmptyRecording,

    #[error("Frame capture failed at frame {frame}: {message}")]
    FrameCaptureFailed { frame: u32, message: String },

    #[error("Encoding failed: {message}")]
    EncodeFailed { message: String },

    #[error("Failed to read asset {path}: {message}")]
    FileRead { path: PathBuf, message: String },

    #[error("An export is already in progress")]
    ExportInProgress,

    #[error("Export was cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using LumoError.
pub type LumoResult<T> = Result<T, LumoError>;

impl LumoError {
    pub fn capture(frame: u32, msg: impl Into<String>) -> Self {
        Self::FrameCaptureFailed {
            frame,
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::EncodeFailed {
            message: msg.into(),
        }
    }

    pub fn unsupported_codec(container: impl Into<String>, codec: impl Into<String>) -> Self {
        Self::UnsupportedCodec {
            container: container.into(),
            codec: codec.into(),
        }
    }

    pub fn file_read(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::FileRead {
            path: path.into(),
            message: msg.into(),
        }
    }
}
