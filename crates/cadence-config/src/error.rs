//! Error types for configuration operations.

use std::path::PathBuf;

use cadence_core::GraphError;
use thiserror::Error;

/// Errors that can occur while loading, converting or reporting a graph
/// description.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create directory
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Path of the directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Failed to serialize JSON
    #[error("failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Two nodes share a name
    #[error("duplicate node name: {0}")]
    DuplicateNode(String),

    /// An edge names a node that was never declared
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// A port names an element type missing from `[types]`
    #[error("node '{node}' uses unknown element type '{ty}'")]
    UnknownType {
        /// Node declaring the port.
        node: String,
        /// Type name that could not be resolved.
        ty: String,
    },

    /// A port reference is not of the form `node.slot`
    #[error("malformed port reference '{0}' (expected 'node.slot')")]
    InvalidPortRef(String),

    /// The graph was rejected by validation or compilation
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create a directory creation error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::CreateDir {
            path: path.into(),
            source,
        }
    }
}
