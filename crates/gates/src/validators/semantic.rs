use super::Verdict;
use crate::GateError;
use crate::model::{Outcome, ValidationRule, Validator};
use triad_core::target::{as_text, truthy};
use triad_core::{Context, Target};

const MAPPING: Verdict = Verdict {
    subject: "Semantic mapping",
    status_key: "mapping_status",
    good: "accurate",
    bad: "inaccurate",
    pass_message: "Semantic mapping is accurate",
};

const ONTOLOGY: Verdict = Verdict {
    subject: "Ontological correctness",
    status_key: "ontology_status",
    good: "valid",
    bad: "invalid",
    pass_message: "Ontological correctness verified",
};

/// Word stems that count as mentioning a concept without naming it.
const RELATED_TERMS: &[(&str, &[&str])] = &[
    ("ConversableAgent", &["agent", "convers", "chat", "talk", "communicat"]),
    ("GroupChat", &["group", "chat", "convers", "team"]),
    ("AssistantAgent", &["assistant", "help", "aid", "support"]),
    ("UserProxyAgent", &["proxy", "user", "represent", "act"]),
    ("llm_config", &["config", "model", "language", "llm", "setting"]),
];

const KNOWN_CONCEPTS: &[&str] = &[
    "ConversableAgent",
    "AssistantAgent",
    "UserProxyAgent",
    "GroupChat",
    "GroupChatManager",
    "llm_config",
    "crew",
    "agent",
    "task",
    "node",
    "graph",
    "state",
    "kernel",
    "plugin",
    "memory",
];

const GENERAL_TERMS: &[&str] = &["agent", "chat", "config", "framework", "model", "ai", "conversation"];

const ONTOLOGY_KEYS: &[&str] = &["user_intent", "target_framework", "expected_concept"];

/// The expected concept shows up in the user's intent, directly or through
/// a related stem.
pub struct SemanticMapping;

impl Validator for SemanticMapping {
    fn validate(
        &self,
        target: Option<&Target>,
        _context: &Context,
        _rule: &ValidationRule,
    ) -> Result<Outcome, GateError> {
        let Some(target) = target else {
            return Ok(Outcome::pass("No target to validate for semantic mapping"));
        };
        let Some(obj) = target.as_object() else {
            return Ok(MAPPING.judge(Vec::new()));
        };

        let mut issues = Vec::new();
        let intent = obj.get("user_intent").filter(|v| truthy(Some(v)));
        let concept = obj.get("expected_concept").filter(|v| truthy(Some(v)));

        if intent.is_none() {
            issues.push("Missing user intent to validate".to_string());
        }
        if concept.is_none() {
            issues.push("Missing expected concept to validate against".to_string());
        }

        if let (Some(intent), Some(concept)) = (intent, concept) {
            let intent = as_text(intent).to_lowercase();
            let concept = as_text(concept);
            if !concept_mentioned(&intent, &concept) {
                issues.push(format!(
                    "Expected concept '{concept}' not found in user intent or related context"
                ));
            }
        }

        Ok(MAPPING.judge(issues))
    }
}

fn concept_mentioned(intent_lower: &str, concept: &str) -> bool {
    if intent_lower.contains(&concept.to_lowercase()) {
        return true;
    }
    RELATED_TERMS
        .iter()
        .find(|(name, _)| *name == concept)
        .is_some_and(|(_, stems)| stems.iter().any(|s| intent_lower.contains(s)))
}

/// The target mentions at least one known domain concept and, for records,
/// carries the keys a mapping needs.
pub struct OntologicalCorrectness;

impl Validator for OntologicalCorrectness {
    fn validate(
        &self,
        target: Option<&Target>,
        _context: &Context,
        _rule: &ValidationRule,
    ) -> Result<Outcome, GateError> {
        let Some(target) = target else {
            return Ok(Outcome::pass("No target to validate for ontological correctness"));
        };

        let mut issues = Vec::new();
        let content = as_text(target).to_lowercase();
        let knows_concept = KNOWN_CONCEPTS
            .iter()
            .any(|c| content.contains(&c.to_lowercase()));
        let knows_general = GENERAL_TERMS.iter().any(|t| content.contains(t));
        if !knows_concept && !knows_general {
            issues.push("No known domain concepts identified in target content".to_string());
        }

        if let Some(obj) = target.as_object() {
            for key in ONTOLOGY_KEYS {
                if !obj.contains_key(*key) {
                    issues.push(format!("Missing required key for ontological validation: {key}"));
                }
            }
        }

        Ok(ONTOLOGY.judge(issues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GateCategory, GateStatus};
    use serde_json::json;

    fn rule() -> ValidationRule {
        ValidationRule::new("s", GateCategory::SemanticAccuracy, SemanticMapping)
    }

    #[test]
    fn related_terms_satisfy_mapping() {
        let target = json!({"user_intent": "set up a team discussion", "expected_concept": "GroupChat"});
        let outcome = SemanticMapping
            .validate(Some(&target), &Context::new(), &rule())
            .unwrap();
        assert_eq!(outcome.status, GateStatus::Pass);
    }

    #[test]
    fn unrelated_concept_fails_mapping() {
        let target = json!({"user_intent": "bake a cake", "expected_concept": "GroupChatManager"});
        let outcome = SemanticMapping
            .validate(Some(&target), &Context::new(), &rule())
            .unwrap();
        assert_eq!(
            outcome.errors,
            vec!["Expected concept 'GroupChatManager' not found in user intent or related context"]
        );
    }

    #[test]
    fn empty_fields_are_missing() {
        let target = json!({"user_intent": "", "expected_concept": null});
        let outcome = SemanticMapping
            .validate(Some(&target), &Context::new(), &rule())
            .unwrap();
        assert_eq!(
            outcome.errors,
            vec![
                "Missing user intent to validate",
                "Missing expected concept to validate against",
            ]
        );
    }

    #[test]
    fn ontology_requires_keys_on_records() {
        let target = json!({"user_intent": "create a group chat"});
        let outcome = OntologicalCorrectness
            .validate(Some(&target), &Context::new(), &rule())
            .unwrap();
        assert_eq!(
            outcome.errors,
            vec![
                "Missing required key for ontological validation: target_framework",
                "Missing required key for ontological validation: expected_concept",
            ]
        );
    }

    #[test]
    fn ontology_rejects_off_domain_text() {
        let target = json!("the weather is nice today");
        let outcome = OntologicalCorrectness
            .validate(Some(&target), &Context::new(), &rule())
            .unwrap();
        assert_eq!(outcome.errors, vec!["No known domain concepts identified in target content"]);

        let target = json!("a kernel with one plugin");
        let outcome = OntologicalCorrectness
            .validate(Some(&target), &Context::new(), &rule())
            .unwrap();
        assert_eq!(outcome.metadata["ontology_status"], "valid");
    }
}
