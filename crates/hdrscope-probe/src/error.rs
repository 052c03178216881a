//! Error types for hdrscope-probe

use std::path::PathBuf;

/// Errors that can occur during container inspection
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unsupported container format
    #[error("Unsupported container format: {0}")]
    UnsupportedContainer(String),

    /// Failed to parse container
    #[error("Failed to parse container: {0}")]
    ContainerParse(String),

    /// Invalid data encountered
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl ProbeError {
    /// Create a container parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ContainerParse(msg.into())
    }
}
