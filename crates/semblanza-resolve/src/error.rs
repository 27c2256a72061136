//! Error types for the resolution layer

use thiserror::Error;

/// Errors that can occur while building the pipeline.
///
/// Running it has no fatal path: detector failures, arbiter outages, and
/// unparseable responses all degrade to fallback behavior inside
/// `AttributeResolver::resolve`.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Configuration rejected at construction
    #[error("Invalid resolver configuration: {0}")]
    InvalidConfig(String),

    /// A detector could not be built
    #[error("Detector construction failed: {0}")]
    Detector(#[from] semblanza_detect::DetectError),

    /// No arbiter is configured
    #[error("No arbiter configured")]
    ArbiterDisabled,
}
