//! Error types for sketchsync-core

use std::path::PathBuf;
use std::time::Duration;

/// The sugar-removal stages could not produce parsable text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message_key} at offset {offset}")]
pub struct StructuralIssue {
    /// Catalog key of the editor message
    pub message_key: String,
    /// Offset in the concatenated original text
    pub offset: usize,
}

impl StructuralIssue {
    pub fn new(message_key: impl Into<String>, offset: usize) -> Self {
        StructuralIssue {
            message_key: message_key.into(),
            offset,
        }
    }
}

/// Failure inside one rebuild. Caught at the rebuild boundary and turned into
/// a degraded snapshot, never propagated to listeners.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PreprocessError {
    #[error("Structural issue: {0}")]
    Structural(#[from] StructuralIssue),

    #[error("Pipeline fault: {0}")]
    Fault(String),

    #[error("Java front end: {0}")]
    Frontend(#[from] sketchsync_frontend::ParseError),
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Preprocessing is disabled for this sketch")]
    Disabled,

    #[error("Preprocessing service has been disposed")]
    Disposed,

    #[error("Timed out after {0:?} waiting for a snapshot")]
    Timeout(Duration),

    #[error("Blocking wait issued from a preprocessing thread")]
    WouldDeadlock,

    #[error("Callback panicked")]
    CallbackPanicked,

    #[error("Failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenameError {
    #[error("Cannot rename while the sketch has syntax errors")]
    SyntaxErrors,

    #[error("No identifier at the requested position")]
    NoIdentifier,

    #[error("“{0}” is not declared in this sketch")]
    NotInSketch(String),

    #[error("“{0}” is not a valid identifier")]
    InvalidName(String),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
