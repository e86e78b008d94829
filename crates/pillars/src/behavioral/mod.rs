//! Behavioral pillar: response patterns, cognitive validation and
//! response coordination.

mod architect;
mod cognitive;
mod coordinator;

pub use architect::{
    BehavioralArchitect, BehavioralPattern, BehavioralReport, FrameworkValidation, PatternCheck, PatternType,
};
pub use cognitive::{CognitiveReport, CognitiveValidator, ComprehensiveValidation, Drift, DriftType};
pub use coordinator::{
    Coordination, CoordinationReport, DEFAULT_PROTOCOL, Observation, Protocol, QualityAssessment,
    ResponseCoordinator, ResponseQuality,
};
