use super::{Verdict, label};
use crate::GateError;
use crate::model::{Outcome, ValidationRule, Validator};
use serde_json::{Map, Value};
use triad_core::{Context, Target};

const COHERENCE: Verdict = Verdict {
    subject: "Cross-pillar integration",
    status_key: "integration_status",
    good: "coherent",
    bad: "incoherent",
    pass_message: "Cross-pillar integration is coherent",
};

/// Keys that count as evidence for each pillar.
const PILLAR_EVIDENCE: [&[&str]; 3] = [
    &["infrastructure", "validation_tests", "sre_metrics"],
    &["behavioral_consistency", "methodology_adherence", "cognitive_patterns"],
    &["semantic_bridge", "mapping_validation", "hallucination_prevention"],
];

fn pillars_present(obj: &Map<String, Value>) -> usize {
    PILLAR_EVIDENCE
        .iter()
        .filter(|keys| keys.iter().any(|k| obj.contains_key(*k)))
        .count()
}

/// At least two pillars are present and the integration record is well-formed.
pub struct CrossPillarIntegration;

impl Validator for CrossPillarIntegration {
    fn validate(
        &self,
        target: Option<&Target>,
        _context: &Context,
        _rule: &ValidationRule,
    ) -> Result<Outcome, GateError> {
        let Some(target) = target else {
            return Ok(Outcome::pass("No target to validate for cross-pillar integration"));
        };
        let Some(obj) = target.as_object() else {
            return Ok(COHERENCE.judge(Vec::new()));
        };

        let mut issues = Vec::new();
        let present = pillars_present(obj);
        if present < 2 {
            issues.push(format!(
                "Cross-pillar integration requires at least 2 pillars, only {present} found"
            ));
        }
        if !obj.contains_key("cross_pillar_validation") {
            issues.push("Missing cross-pillar validation element".to_string());
        }
        match obj.get("integration_score") {
            None => issues.push("Missing integration score element".to_string()),
            Some(score) => {
                if !score.as_f64().is_some_and(|s| (0.0..=1.0).contains(&s)) {
                    issues.push(format!(
                        "Integration score must be a number between 0 and 1, got: {}",
                        label(score)
                    ));
                }
            }
        }

        Ok(COHERENCE.judge(issues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GateCategory, GateStatus};
    use serde_json::json;

    fn check(target: Value) -> Outcome {
        let rule = ValidationRule::new("c", GateCategory::IntegrationCoherence, CrossPillarIntegration);
        CrossPillarIntegration
            .validate(Some(&target), &Context::new(), &rule)
            .unwrap()
    }

    #[test]
    fn coherent_integration_passes() {
        let outcome = check(json!({
            "infrastructure": {},
            "semantic_bridge": {},
            "cross_pillar_validation": {},
            "integration_score": 0.8
        }));
        assert_eq!(outcome.status, GateStatus::Pass);
        assert_eq!(outcome.metadata["integration_status"], "coherent");
    }

    #[test]
    fn single_pillar_and_bad_score() {
        let outcome = check(json!({
            "sre_metrics": {},
            "integration_score": 1.5
        }));
        assert_eq!(
            outcome.errors,
            vec![
                "Cross-pillar integration requires at least 2 pillars, only 1 found",
                "Missing cross-pillar validation element",
                "Integration score must be a number between 0 and 1, got: 1.5",
            ]
        );
    }

    #[test]
    fn non_numeric_score_is_rejected() {
        let outcome = check(json!({
            "infrastructure": {},
            "cognitive_patterns": [],
            "cross_pillar_validation": {},
            "integration_score": "high"
        }));
        assert_eq!(
            outcome.errors,
            vec!["Integration score must be a number between 0 and 1, got: high"]
        );
    }
}
