//! Error types for the detector layer

use thiserror::Error;

/// Errors that can occur while building or running a detector
#[derive(Error, Debug)]
pub enum DetectError {
    /// A surface pattern rule failed to compile
    #[error("Invalid pattern rule '{rule}': {reason}")]
    InvalidRule {
        /// The offending rule source
        rule: String,
        /// Compiler message
        reason: String,
    },

    /// Configuration rejected at construction
    #[error("Invalid detector configuration: {0}")]
    InvalidConfig(String),

    /// Internal failure while walking a document
    #[error("Detection failure: {0}")]
    Internal(String),
}
