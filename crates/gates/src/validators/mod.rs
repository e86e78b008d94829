//! Built-in validators, one per default rule.
//!
//! Each inspects a JSON target for a handful of keys and reports one issue
//! per missing or mismatched item. A missing target is always a pass.

mod behavioral;
mod integration;
mod performance;
mod semantic;
mod technical;
mod vision;

pub use behavioral::{BehavioralConsistency, MethodologyAdherence};
pub use integration::CrossPillarIntegration;
pub use performance::PerformanceMetrics;
pub use semantic::{OntologicalCorrectness, SemanticMapping};
pub use technical::{TechnicalImplementation, TechnicalInfrastructure};
pub use vision::VisionAlignment;

use crate::model::{GateCategory, Outcome, ValidationRule};
use serde_json::Value;

/// The nine rules every default engine starts with.
pub fn default_rules() -> Vec<ValidationRule> {
    vec![
        ValidationRule::new("tech_infrastructure_check", GateCategory::TechnicalValidation, TechnicalInfrastructure)
            .with_description("Check technical infrastructure health")
            .with_priority(8),
        ValidationRule::new("tech_implementation_check", GateCategory::TechnicalValidation, TechnicalImplementation)
            .with_description("Validate technical implementation")
            .with_priority(7),
        ValidationRule::new("behavior_consistency_check", GateCategory::BehavioralIntegrity, BehavioralConsistency)
            .with_description("Check behavioral consistency")
            .with_priority(9),
        ValidationRule::new("methodology_adherence_check", GateCategory::BehavioralIntegrity, MethodologyAdherence)
            .with_description("Validate methodology adherence")
            .with_priority(8),
        ValidationRule::new("semantic_mapping_check", GateCategory::SemanticAccuracy, SemanticMapping)
            .with_description("Validate semantic mapping accuracy")
            .with_priority(9),
        ValidationRule::new("ontological_verification", GateCategory::SemanticAccuracy, OntologicalCorrectness)
            .with_description("Verify ontological correctness")
            .with_priority(8),
        ValidationRule::new(
            "cross_pillar_integration_check",
            GateCategory::IntegrationCoherence,
            CrossPillarIntegration,
        )
        .with_description("Validate cross-pillar integration")
        .with_priority(10),
        ValidationRule::new("performance_metrics_check", GateCategory::PerformanceEfficiency, PerformanceMetrics)
            .with_description("Validate performance metrics")
            .with_priority(7),
        ValidationRule::new("vision_alignment_check", GateCategory::VisionAlignment, VisionAlignment)
            .with_description("Validate alignment with project vision")
            .with_priority(6),
    ]
}

/// How a validator labels itself in messages and metadata.
pub(crate) struct Verdict {
    pub subject: &'static str,
    pub status_key: &'static str,
    pub good: &'static str,
    pub bad: &'static str,
    pub pass_message: &'static str,
}

impl Verdict {
    /// Pass when `issues` is empty, otherwise fail listing them.
    pub fn judge(&self, issues: Vec<String>) -> Outcome {
        if issues.is_empty() {
            return Outcome::pass(self.pass_message).with_metadata(self.status_key, self.good);
        }
        Outcome::fail(
            format!("{} validation failed with {} issue(s)", self.subject, issues.len()),
            issues.clone(),
        )
        .with_metadata(self.status_key, self.bad)
        .with_metadata("issues", issues)
    }
}

/// Array members, or nothing for anything that is not an array.
pub(crate) fn items(value: Option<&Value>) -> &[Value] {
    value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Render one list item for an issue message.
pub(crate) fn label(value: &Value) -> String {
    triad_core::target::as_text(value)
}
