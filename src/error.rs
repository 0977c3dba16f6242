//! Error types for the render pipeline

use std::fmt;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Which table a CLI/library filter was matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Content,
    Format,
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKind::Content => f.write_str("content source"),
            FilterKind::Format => f.write_str("format"),
        }
    }
}

/// Errors that can occur while planning or rendering a scene
#[derive(Error, Debug)]
pub enum Error {
    /// A filter did not match any entry of its table
    #[error("Unknown {kind}: {value}. Available: {}", .available.join(", "))]
    UnknownFilter {
        kind: FilterKind,
        value: String,
        available: Vec<String>,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Failed to open the rendering surface
    #[error("Rendering surface initialization failed: {0}")]
    SurfaceInit(String),

    /// Failed to load the scene document
    #[error("Failed to load document: {0}")]
    LoadError(String),

    /// A page script failed
    #[error("Script execution failed: {0}")]
    ScriptError(String),

    /// Failed to capture a frame
    #[error("Frame capture failed: {0}")]
    CaptureError(String),

    /// The encoder process could not be started
    #[error("Failed to start encoder: {0}")]
    EncoderSpawn(String),

    /// Writing to the encoder's input stream failed
    #[error("Failed to write frame {frame} to encoder: {source}")]
    EncoderWrite {
        frame: u64,
        #[source]
        source: std::io::Error,
    },

    /// The encoder exited unsuccessfully
    #[error("Encoder exited with {}", describe_exit(.code))]
    EncoderExit { code: Option<i32> },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
