use super::Verdict;
use crate::GateError;
use crate::model::{Outcome, ValidationRule, Validator};
use triad_core::target::as_text;
use triad_core::{Context, Target};

const ALIGNMENT: Verdict = Verdict {
    subject: "Vision alignment",
    status_key: "alignment_status",
    good: "aligned",
    bad: "misaligned",
    pass_message: "Vision alignment confirmed",
};

const VISION_KEYWORDS: &[&str] = &[
    "validation",
    "ai agent",
    "configuration",
    "technical",
    "behavioral",
    "semantic",
    "multi-pillar",
    "architecture",
    "systematic",
    "framework",
    "reliability",
    "cognitive",
    "ontology",
    "knowledge graph",
    "agent configuration",
];

/// Top-level keys that show a record addresses one of the pillars.
const PILLAR_KEYS: &[&str] = &[
    "infrastructure",
    "validation",
    "sre",
    "tech",
    "behavior",
    "cognitive",
    "response",
    "pattern",
    "semantic",
    "ontology",
    "knowledge",
    "translation",
];

/// The target talks about what this system is for.
pub struct VisionAlignment;

impl Validator for VisionAlignment {
    fn validate(
        &self,
        target: Option<&Target>,
        _context: &Context,
        _rule: &ValidationRule,
    ) -> Result<Outcome, GateError> {
        let Some(target) = target else {
            return Ok(Outcome::pass("No target to validate for vision alignment"));
        };

        let mut issues = Vec::new();
        let content = as_text(target).to_lowercase();
        if !VISION_KEYWORDS.iter().any(|k| content.contains(k)) {
            issues.push("Target does not contain terms that align with project vision".to_string());
        }

        if let Some(obj) = target.as_object() {
            if !PILLAR_KEYS.iter().any(|k| obj.contains_key(*k)) {
                issues.push(
                    "Target does not address any of the three core pillars: technical, behavioral, or semantic"
                        .to_string(),
                );
            }
        }

        Ok(ALIGNMENT.judge(issues))
    }
}
