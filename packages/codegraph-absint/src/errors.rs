//! Error types for codegraph-absint
//!
//! Provides unified error handling across the crate.

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::config::ConfigError;
use crate::shared::models::NodeId;

/// Main error type for analysis operations
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Structurally invalid syntax tree (e.g. `break` outside a loop).
    /// Only the offending function is skipped.
    #[error("Malformed input in '{function}' at node {node}: {message}")]
    MalformedInput {
        function: String,
        node: NodeId,
        message: String,
    },

    /// Run aborted through the cancellation token
    #[error("Analysis cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AnalysisError {
    /// Create a malformed-input error
    pub fn malformed(
        function: impl Into<String>,
        node: NodeId,
        message: impl Into<String>,
    ) -> Self {
        AnalysisError::MalformedInput {
            function: function.into(),
            node,
            message: message.into(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, AnalysisError::MalformedInput { .. })
    }
}

// Reports carry errors as their display text
impl Serialize for AnalysisError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result type alias for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display() {
        let err = AnalysisError::malformed("f", 7, "'break' outside loop");
        assert_eq!(
            err.to_string(),
            "Malformed input in 'f' at node 7: 'break' outside loop"
        );
        assert!(err.is_malformed());
    }

    #[test]
    fn test_serializes_as_string() {
        let err = AnalysisError::Cancelled;
        assert_eq!(serde_json::to_string(&err).unwrap(), "\"Analysis cancelled\"");
    }
}
