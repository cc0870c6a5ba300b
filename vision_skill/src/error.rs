//! Error types for the vision skill layer

use thiserror::Error;

/// Result type alias for the vision skill layer
pub type Result<T> = std::result::Result<T, VisionError>;

/// Errors that can occur while configuring or querying the tracker
#[derive(Error, Debug)]
pub enum VisionError {
    /// The queried name has no entry in the current object list.
    ///
    /// Expected and common; callers pick a fallback behavior.
    #[error("{operation}: {name} is not in sight")]
    NotVisible {
        name: String,
        operation: &'static str,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid depth map: {0}")]
    DepthMapError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl VisionError {
    pub fn not_visible<S: Into<String>>(name: S, operation: &'static str) -> Self {
        Self::NotVisible {
            name: name.into(),
            operation,
        }
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn depth_map<S: Into<String>>(msg: S) -> Self {
        Self::DepthMapError(msg.into())
    }

    pub fn is_not_visible(&self) -> bool {
        matches!(self, Self::NotVisible { .. })
    }
}
