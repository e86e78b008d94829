//! Activation profiles for triad.
//!
//! Profiles are named roles (the pillar specialists) that are switched on
//! and off per request. A profile only activates once every profile it
//! depends on is already active; activations expire lazily. An optional
//! [`FrequencyPredictor`] learns which profiles tend to stay active per
//! context and can gate context-wide activation.

mod engine;
mod model;
mod predictor;

pub use engine::{ActivationStats, ActivationSystem, default_profiles};
pub use model::{ActivationContext, ActivationProfile, DeactivationCallback};
pub use predictor::{
    ActivationPrediction, ActivationRecord, FrequencyPredictor, ModelType, PatternStats,
    RETRAIN_EVERY, MIN_TRAINING_RECORDS,
};

pub type ActivationResult<T> = std::result::Result<T, ActivationError>;

/// Errors from the activation subsystem.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ActivationError {
    #[error("unknown activation context: {0}")]
    UnknownContext(String),

    #[error("unknown activation profile: {0}")]
    UnknownProfile(String),
}

impl From<ActivationError> for triad_core::Error {
    fn from(e: ActivationError) -> Self {
        Self::Activation(e.to_string())
    }
}
