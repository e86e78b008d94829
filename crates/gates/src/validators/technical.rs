use super::{Verdict, items, label};
use crate::GateError;
use crate::model::{Outcome, ValidationRule, Validator};
use serde_json::Value;
use triad_core::target::truthy;
use triad_core::{Context, Target};

const INFRASTRUCTURE: Verdict = Verdict {
    subject: "Technical infrastructure",
    status_key: "infrastructure_status",
    good: "healthy",
    bad: "unhealthy",
    pass_message: "Technical infrastructure is healthy",
};

const IMPLEMENTATION: Verdict = Verdict {
    subject: "Technical implementation",
    status_key: "implementation_status",
    good: "valid",
    bad: "invalid",
    pass_message: "Technical implementation is valid",
};

/// Reports whatever the caller put under `context.system_errors`.
pub struct TechnicalInfrastructure;

impl Validator for TechnicalInfrastructure {
    fn validate(
        &self,
        _target: Option<&Target>,
        context: &Context,
        _rule: &ValidationRule,
    ) -> Result<Outcome, GateError> {
        let issues = match context.get("system_errors") {
            Some(Value::Array(errors)) => errors.iter().map(label).collect(),
            Some(other) if truthy(Some(other)) => vec![label(other)],
            _ => Vec::new(),
        };
        Ok(INFRASTRUCTURE.judge(issues))
    }
}

/// Checks declared methodology and the shape of an implementation record.
pub struct TechnicalImplementation;

impl Validator for TechnicalImplementation {
    fn validate(
        &self,
        target: Option<&Target>,
        _context: &Context,
        _rule: &ValidationRule,
    ) -> Result<Outcome, GateError> {
        let Some(target) = target else {
            return Ok(Outcome::pass(
                "No specific target to validate, implementation is valid in general",
            ));
        };
        let Some(obj) = target.as_object() else {
            return Ok(IMPLEMENTATION.judge(Vec::new()));
        };

        let mut issues = Vec::new();
        let methodology = obj.get("required_methodology");
        let required_gates = items(methodology.and_then(|m| m.get("validation_gates")));

        if methodology.is_some() {
            if items(methodology.and_then(|m| m.get("steps"))).is_empty() {
                issues.push("No required methodology steps defined".to_string());
            }
            if required_gates.is_empty() {
                issues.push("No required validation gates defined".to_string());
            }
        }

        let passed = items(obj.get("passed_validation_gates"));
        for gate in required_gates {
            if !passed.contains(gate) {
                issues.push(format!("Missing required validation gate: {}", label(gate)));
            }
        }

        for attr in ["timestamp", "validation_results"] {
            if !obj.contains_key(attr) {
                issues.push(format!("Missing required attribute: {attr}"));
            }
        }

        Ok(IMPLEMENTATION.judge(issues))
    }
}
