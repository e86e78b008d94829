use super::{Verdict, items, label};
use crate::GateError;
use crate::model::{Outcome, ValidationRule, Validator};
use serde_json::{Map, Value};
use triad_core::target::number;
use triad_core::{Context, Target};

const CONSISTENCY: Verdict = Verdict {
    subject: "Behavioral consistency",
    status_key: "consistency_status",
    good: "consistent",
    bad: "inconsistent",
    pass_message: "Behavioral consistency maintained",
};

const METHODOLOGY: Verdict = Verdict {
    subject: "Methodology adherence",
    status_key: "methodology_status",
    good: "compliant",
    bad: "non_compliant",
    pass_message: "Methodology adherence confirmed",
};

const COMPLIANCE_THRESHOLD: f64 = 0.7;

fn required<'a>(obj: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    items(obj.get("required_methodology").and_then(|m| m.get(key)))
}

/// Responses agree in type and format; required steps and expected
/// patterns actually happened.
pub struct BehavioralConsistency;

impl Validator for BehavioralConsistency {
    fn validate(
        &self,
        target: Option<&Target>,
        _context: &Context,
        _rule: &ValidationRule,
    ) -> Result<Outcome, GateError> {
        let Some(target) = target else {
            return Ok(Outcome::pass("No target to validate for behavioral consistency"));
        };
        let Some(obj) = target.as_object() else {
            return Ok(CONSISTENCY.judge(Vec::new()));
        };

        let mut issues = Vec::new();
        let responses = items(obj.get("responses"));
        if let Some((first, rest)) = responses.split_first() {
            for (i, response) in rest.iter().enumerate() {
                let i = i + 1;
                if first.get("type") != response.get("type") {
                    issues.push(format!("Inconsistent response type between response 0 and {i}"));
                }
                if first.get("format") != response.get("format") {
                    issues.push(format!("Inconsistent response format between response 0 and {i}"));
                }
            }
        }

        let performed = items(obj.get("performed_steps"));
        for step in required(obj, "steps") {
            if !performed.contains(step) {
                issues.push(format!("Required methodology step '{}' not performed", label(step)));
            }
        }

        let observed = items(obj.get("observed_patterns"));
        for pattern in items(obj.get("expected_behavioral_patterns")) {
            if !observed.contains(pattern) {
                issues.push(format!("Expected behavioral pattern '{}' not observed", label(pattern)));
            }
        }

        Ok(CONSISTENCY.judge(issues))
    }
}

/// Required steps and gates were performed, and the compliance score clears
/// the bar when one is given.
pub struct MethodologyAdherence;

impl Validator for MethodologyAdherence {
    fn validate(
        &self,
        target: Option<&Target>,
        _context: &Context,
        _rule: &ValidationRule,
    ) -> Result<Outcome, GateError> {
        let Some(target) = target else {
            return Ok(Outcome::pass("No target to validate for methodology adherence"));
        };
        let Some(obj) = target.as_object() else {
            return Ok(METHODOLOGY.judge(Vec::new()));
        };

        let mut issues = Vec::new();

        let performed = items(obj.get("performed_steps"));
        for step in required(obj, "steps") {
            if performed.is_empty() {
                issues.push(format!("Required methodology step not performed: {}", label(step)));
            } else if !performed.contains(step) {
                issues.push(format!("Missing required methodology step: {}", label(step)));
            }
        }

        let passed = items(obj.get("passed_validation_gates"));
        for gate in required(obj, "validation_gates") {
            if passed.is_empty() {
                issues.push(format!("Required validation gate not passed: {}", label(gate)));
            } else if !passed.contains(gate) {
                issues.push(format!("Missing required validation gate: {}", label(gate)));
            }
        }

        if let Some(raw) = obj.get("methodology_compliance_score").filter(|v| !v.is_null()) {
            if number(Some(raw)).is_some_and(|score| score < COMPLIANCE_THRESHOLD) {
                issues.push(format!(
                    "Methodology compliance score too low: {} (threshold: {COMPLIANCE_THRESHOLD})",
                    label(raw)
                ));
            }
        }

        Ok(METHODOLOGY.judge(issues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GateCategory, GateStatus};
    use serde_json::json;

    fn rule() -> ValidationRule {
        ValidationRule::new("b", GateCategory::BehavioralIntegrity, BehavioralConsistency)
    }

    #[test]
    fn inconsistent_responses_are_flagged() {
        let target = json!({
            "responses": [
                {"type": "text", "format": "markdown"},
                {"type": "text", "format": "plain"},
                {"type": "code", "format": "markdown"}
            ]
        });
        let outcome = BehavioralConsistency
            .validate(Some(&target), &Context::new(), &rule())
            .unwrap();
        assert_eq!(
            outcome.errors,
            vec![
                "Inconsistent response format between response 0 and 1",
                "Inconsistent response type between response 0 and 2",
            ]
        );
    }

    #[test]
    fn missing_steps_and_patterns() {
        let target = json!({
            "required_methodology": {"steps": ["analyze", "verify"]},
            "performed_steps": ["analyze"],
            "expected_behavioral_patterns": ["systematic"],
            "observed_patterns": []
        });
        let outcome = BehavioralConsistency
            .validate(Some(&target), &Context::new(), &rule())
            .unwrap();
        assert_eq!(outcome.status, GateStatus::Fail);
        assert_eq!(
            outcome.errors,
            vec![
                "Required methodology step 'verify' not performed",
                "Expected behavioral pattern 'systematic' not observed",
            ]
        );
        assert_eq!(outcome.metadata["consistency_status"], "inconsistent");
    }

    #[test]
    fn nothing_performed_uses_not_performed_wording() {
        let target = json!({
            "required_methodology": {"steps": ["plan"], "validation_gates": ["technical"]}
        });
        let outcome = MethodologyAdherence
            .validate(Some(&target), &Context::new(), &rule())
            .unwrap();
        assert_eq!(
            outcome.errors,
            vec![
                "Required methodology step not performed: plan",
                "Required validation gate not passed: technical",
            ]
        );
    }

    #[test]
    fn partial_progress_uses_missing_wording() {
        let target = json!({
            "required_methodology": {"steps": ["plan", "test"], "validation_gates": ["a", "b"]},
            "performed_steps": ["plan"],
            "passed_validation_gates": ["a"],
            "methodology_compliance_score": 0.5
        });
        let outcome = MethodologyAdherence
            .validate(Some(&target), &Context::new(), &rule())
            .unwrap();
        assert_eq!(
            outcome.errors,
            vec![
                "Missing required methodology step: test",
                "Missing required validation gate: b",
                "Methodology compliance score too low: 0.5 (threshold: 0.7)",
            ]
        );
    }

    #[test]
    fn compliant_methodology_passes() {
        let target = json!({
            "required_methodology": {"steps": ["plan"]},
            "performed_steps": ["plan"],
            "methodology_compliance_score": 0.9
        });
        let outcome = MethodologyAdherence
            .validate(Some(&target), &Context::new(), &rule())
            .unwrap();
        assert_eq!(outcome.message, "Methodology adherence confirmed");
    }
}
