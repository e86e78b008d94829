//! Error types for the triad domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for triad operations that can fail.
///
/// Validation failures are *data* (a `fail` status on a result) and never
/// show up here; this type covers lookups of unknown things, malformed
/// inputs and serialization problems.
#[derive(Debug, Error)]
pub enum Error {
    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Validation errors ---
    #[error("Validation error: {0}")]
    Validation(String),

    // --- Activation errors ---
    #[error("Activation error: {0}")]
    Activation(String),

    // --- Pillar errors ---
    #[error("Pillar error: {0}")]
    Pillar(#[from] PillarError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Invalid memory partition: {0}")]
    InvalidPartition(String),

    #[error("Memory entry not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PillarError {
    #[error("Unknown framework: {0}")]
    UnknownFramework(String),

    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    #[error("Unknown validation test: {0}")]
    UnknownTest(String),

    #[error("Unknown behavioral pattern: {0}")]
    UnknownPattern(String),

    #[error("Unknown coordination protocol: {0}")]
    UnknownProtocol(String),

    #[error("Unknown observation template: {0}")]
    UnknownTemplate(String),

    #[error("Unknown incident: {0}")]
    UnknownIncident(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Semantic processing failed: {0}")]
    Semantic(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_error_displays_partition() {
        let err = Error::Memory(MemoryError::InvalidPartition("mid_term".into()));
        assert!(err.to_string().contains("mid_term"));
        assert!(err.to_string().starts_with("Memory error"));
    }

    #[test]
    fn pillar_error_converts_into_top_level() {
        let err: Error = PillarError::UnknownProtocol("fast_track".into()).into();
        assert!(matches!(err, Error::Pillar(PillarError::UnknownProtocol(_))));
        assert!(err.to_string().contains("fast_track"));
    }
}
