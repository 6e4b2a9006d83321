// clusterconfig-core/src/error.rs

use thiserror::Error;

use crate::codec::format::NodeType;

/// Error type for the settings tree codec and patchers.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown node type tag: {0:#04x}")]
    UnknownNodeType(u8),

    #[error("Unexpected node type: expected {expected:?}, found {found:?}")]
    UnexpectedNodeType { expected: NodeType, found: NodeType },

    #[error("Truncated buffer: needed {needed} bytes at offset {offset}, only {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Malformed buffer: {0}")]
    Malformed(String),

    #[error("Node nesting exceeds the limit of {0} levels")]
    DepthLimitExceeded(usize),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for settings tree operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
