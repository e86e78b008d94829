//! Validation gates for triad.
//!
//! A registry of prioritized [`ValidationRule`]s, each tagged with a
//! [`GateCategory`] and backed by a [`Validator`]. Running a rule always
//! yields data, never an error: validator failures become `fail` results,
//! a disabled dependency becomes a `skipped` result.
//!
//! ```text
//!   target + context
//!         │
//!   ┌─────▼──────┐  priority desc   ┌─────────────┐
//!   │ Validation │─────────────────▶│  Validator  │
//!   │   Gates    │◀─────────────────│  (per rule) │
//!   └─────┬──────┘     Outcome      └─────────────┘
//!         │ results
//!   ┌─────▼──────┐   ┌─────────────┐
//!   │  history   │   │ MemoryStore │  (validate_all only)
//!   │ (last 100) │   └─────────────┘
//!   └────────────┘
//! ```

mod engine;
mod model;
pub mod validators;

pub use engine::{DEFAULT_HISTORY_LIMIT, ValidationGates, ValidationStats};
pub use model::{
    DEFAULT_RULE_TIMEOUT, GateCategory, GateStatus, Outcome, RuleSummary, ValidationResult,
    ValidationRule, Validator,
};

pub type GateResult<T> = std::result::Result<T, GateError>;

/// Errors from the gate subsystem.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum GateError {
    #[error("unknown gate category: {0}")]
    UnknownGate(String),

    /// Raised by a validator; the engine turns it into a `fail` result.
    #[error("{0}")]
    Failed(String),
}

impl From<GateError> for triad_core::Error {
    fn from(e: GateError) -> Self {
        Self::Validation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_error_lifts_into_core_error() {
        let err: triad_core::Error = "loudness".parse::<GateCategory>().unwrap_err().into();
        assert!(matches!(err, triad_core::Error::Validation(_)));
        assert!(err.to_string().contains("loudness"));
    }
}
