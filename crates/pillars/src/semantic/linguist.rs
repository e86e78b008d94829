use super::knowledge::{
    Concept, DomainFramework, GENERAL_MAPPINGS, KnowledgeGraph, MAPPING_DOMAINS, AUTOGEN_MAPPINGS, default_graphs,
    framework_mappings,
};
use crate::{PillarServices, audit_id};
use chrono::{DateTime, Utc};
use regex_lite::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;
use tracing::{debug, info, warn};
use triad_core::target::as_text;
use triad_core::{MemoryEntry, MemoryType, PillarError, Target};
use triad_gates::{GateCategory, GateStatus, ValidationResult};

pub type SemanticResult<T> = std::result::Result<T, PillarError>;

/// Below this confidence an utterance counts as high hallucination risk.
const HALLUCINATION_THRESHOLD: f64 = 0.2;

/// Outcome of a translation or hallucination check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticValidationResult {
    pub success: bool,
    pub message: String,
    pub translated_terms: BTreeMap<String, String>,
    pub confidence: f64,
    pub errors: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl SemanticValidationResult {
    fn new(success: bool, message: String, confidence: f64) -> Self {
        Self {
            success,
            message,
            translated_terms: BTreeMap::new(),
            confidence,
            errors: Vec::new(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoundConcept {
    pub concept: String,
    pub framework: DomainFramework,
    #[serde(rename = "type")]
    pub concept_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_property: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptRecord {
    #[serde(flatten)]
    pub concept: Concept,
    pub framework: DomainFramework,
    pub concept_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeTranslation {
    pub translated_intent: String,
    pub translated_terms: BTreeMap<String, String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeValidation {
    pub status: GateStatus,
    pub message: String,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeHallucinationCheck {
    pub result: bool,
    pub confidence: f64,
    pub errors: Vec<String>,
}

/// Translation, ontology check and hallucination score for one utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticBridge {
    pub user_intent: String,
    pub target_framework: String,
    pub translation_result: BridgeTranslation,
    pub validation_result: BridgeValidation,
    pub hallucination_check: BridgeHallucinationCheck,
    pub overall_success: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticSummary {
    pub frameworks_supported: Vec<DomainFramework>,
    pub total_knowledge_graphs: usize,
    pub total_mappings: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticReport {
    pub summary: SemanticSummary,
    pub knowledge_graphs: BTreeMap<DomainFramework, BTreeMap<String, usize>>,
    pub translation_mappings: BTreeMap<String, usize>,
}

/// Rewrites everyday phrasing into framework terms and checks the result
/// against per-framework knowledge graphs.
pub struct DomainLinguist {
    services: PillarServices,
    graphs: RwLock<BTreeMap<DomainFramework, KnowledgeGraph>>,
}

impl DomainLinguist {
    pub fn new(services: PillarServices) -> Self {
        Self {
            services,
            graphs: RwLock::new(default_graphs()),
        }
    }

    /// Apply the general phrase table, then the framework's own table.
    ///
    /// An unrecognized framework name is kept as-is; only the general
    /// table applies to it.
    pub fn translate_user_intent(&self, intent: &str, framework: &str) -> SemanticResult<SemanticValidationResult> {
        if framework.parse::<DomainFramework>().is_err() {
            warn!(framework = %framework, "Unknown framework name, using as string");
        }

        let mut translated = apply_translations(intent, GENERAL_MAPPINGS)?;
        if let Some(table) = framework_mappings(framework) {
            translated = apply_translations(&translated, table)?;
        }

        let mut translated_terms = BTreeMap::new();
        if translated != intent {
            let before: BTreeSet<String> = words(intent).into_iter().collect();
            let after: BTreeSet<String> = words(&translated).into_iter().collect();
            for word in before.difference(&after) {
                if let Some((_, tech)) = GENERAL_MAPPINGS.iter().find(|(phrase, _)| phrase.contains(word.as_str())) {
                    translated_terms.insert(word.clone(), tech.to_string());
                }
            }
        }

        let verification = self.verify_ontological_correctness(&json!({ "input": translated }))?;

        let confidence = if translated_terms.is_empty() { 0.3 } else { 0.8 };
        let mut result = SemanticValidationResult::new(
            true,
            format!("Translated user intent from '{intent}' to '{translated}' for {framework}"),
            confidence,
        );
        result.translated_terms = translated_terms;
        if !verification.is_pass() {
            result.errors.push("Ontological verification failed".into());
        }

        self.services.remember(
            MemoryEntry::new(
                audit_id("semantic_translation"),
                json!({
                    "original_intent": intent,
                    "translated_intent": translated,
                    "target_framework": framework,
                    "translated_terms": result.translated_terms,
                    "confidence": result.confidence,
                    "timestamp": result.timestamp,
                }),
                MemoryType::ShortTerm,
            )
            .with_tags(["semantic", "translation", framework])
            .with_ttl(self.services.settings.ttl(10)),
        );
        debug!(framework = %framework, terms = result.translated_terms.len(), "User intent translated");
        Ok(result)
    }

    /// Look for known concept or property names in the target's `input`
    /// (or in the whole target rendered as text).
    pub fn verify_ontological_correctness(&self, target: &Target) -> SemanticResult<ValidationResult> {
        let content = target.get("input").map_or_else(|| as_text(target), as_text);
        let lowered = content.to_lowercase();

        let mut found = Vec::new();
        for (framework, graph) in self.graphs.read().unwrap().iter() {
            for (concept_type, concepts) in graph {
                for (name, concept) in concepts {
                    let found_concept = |related_property: Option<&str>| FoundConcept {
                        concept: name.clone(),
                        framework: *framework,
                        concept_type: concept_type.clone(),
                        related_property: related_property.map(str::to_string),
                        description: concept.description.clone(),
                    };
                    if lowered.contains(&name.to_lowercase()) {
                        found.push(found_concept(None));
                    }
                    for property in &concept.properties {
                        if lowered.contains(&property.to_lowercase()) {
                            found.push(found_concept(Some(property.as_str())));
                        }
                    }
                }
            }
        }

        let mut issues = Vec::new();
        if found.is_empty() && !GENERAL_MAPPINGS.iter().any(|(phrase, _)| lowered.contains(phrase)) {
            issues.push("No known domain concepts identified in input".to_string());
        }

        let (status, message) = if issues.is_empty() {
            (GateStatus::Pass, "Ontological verification passed".to_string())
        } else {
            (
                GateStatus::Fail,
                format!("Ontological verification identified {} issue(s)", issues.len()),
            )
        };
        let mut result = ValidationResult::new(GateCategory::SemanticAccuracy, status, message);
        result.metadata.insert("verification_type".into(), json!("ontological_correctness"));
        result.metadata.insert("found_concepts".into(), json!(found.len()));
        result.errors = issues;

        self.services.remember(
            MemoryEntry::new(
                audit_id("ontological_verification"),
                json!({
                    "target": content,
                    "result": to_content(&result)?,
                    "found_concepts": to_content(&found)?,
                    "timestamp": result.timestamp,
                }),
                MemoryType::ShortTerm,
            )
            .with_tags(["semantic", "validation", "ontological"])
            .with_ttl(self.services.settings.ttl(5)),
        );
        Ok(result)
    }

    /// Translate against autogen and check that `expected` shows up in the
    /// translation or names a concept in any graph.
    pub fn validate_semantic_mapping(&self, intent: &str, expected: &str) -> SemanticResult<ValidationResult> {
        let translation = self.translate_user_intent(intent, DomainFramework::Autogen.as_str())?;

        let terms: Vec<&str> = translation.translated_terms.values().map(String::as_str).collect();
        let translated_content = format!("{} {}", translation.message, terms.join(" ")).to_lowercase();
        let contains_expected = translated_content.contains(&expected.to_lowercase());
        let concept_in_kg = self
            .graphs
            .read()
            .unwrap()
            .values()
            .flat_map(|graph| graph.values())
            .any(|concepts| concepts.contains_key(expected));

        let mut result = if contains_expected || concept_in_kg {
            ValidationResult::new(
                GateCategory::SemanticAccuracy,
                GateStatus::Pass,
                format!("Semantic mapping validated: '{intent}' maps to expected concept '{expected}'"),
            )
        } else {
            let mut failed = ValidationResult::new(
                GateCategory::SemanticAccuracy,
                GateStatus::Fail,
                format!("Semantic mapping failed: '{intent}' does not map to expected concept '{expected}'"),
            );
            failed
                .errors
                .push(format!("Expected concept '{expected}' not found in translation or knowledge graph"));
            failed
        };
        result.metadata.insert("validation_type".into(), json!("semantic_mapping"));
        result.metadata.insert("original_intent".into(), json!(intent));
        result.metadata.insert("expected_concept".into(), json!(expected));
        result.metadata.insert("translated_terms".into(), json!(terms));
        result.metadata.insert("concept_in_kg".into(), json!(concept_in_kg));

        self.services.remember(
            MemoryEntry::new(
                audit_id("semantic_mapping_validation"),
                json!({
                    "original_intent": intent,
                    "expected_technical_concept": expected,
                    "translation_result": {
                        "translated_terms": translation.translated_terms,
                        "confidence": translation.confidence,
                        "full_message": translation.message,
                    },
                    "result": to_content(&result)?,
                    "timestamp": result.timestamp,
                }),
                MemoryType::ShortTerm,
            )
            .with_tags(["semantic", "validation", "mapping"])
            .with_ttl(self.services.settings.ttl(5)),
        );
        Ok(result)
    }

    /// Insert or replace a concept in a framework's graph.
    pub fn add_to_knowledge_graph(
        &self,
        framework: DomainFramework,
        concept_type: &str,
        name: &str,
        concept: Concept,
    ) -> SemanticResult<()> {
        let content = json!({
            "framework": framework,
            "concept_type": concept_type,
            "concept_name": name,
            "details": to_content(&concept)?,
            "timestamp": Utc::now(),
        });
        self.graphs
            .write()
            .unwrap()
            .entry(framework)
            .or_default()
            .entry(concept_type.to_string())
            .or_default()
            .insert(name.to_string(), concept);

        self.services.remember(
            MemoryEntry::new(
                format!("knowledge_graph_update_{framework}_{name}"),
                content,
                MemoryType::LongTerm,
            )
            .with_tags(["semantic", "knowledge_graph", framework.as_str(), concept_type])
            .with_priority(7),
        );
        info!(concept = %name, framework = %framework, "Concept added to knowledge graph");
        Ok(())
    }

    pub fn query_knowledge_graph(&self, framework: DomainFramework, name: &str) -> Option<ConceptRecord> {
        let graphs = self.graphs.read().unwrap();
        graphs.get(&framework)?.iter().find_map(|(concept_type, concepts)| {
            concepts.get(name).map(|concept| ConceptRecord {
                concept: concept.clone(),
                framework,
                concept_type: concept_type.clone(),
            })
        })
    }

    /// Score how grounded `text` is: known terms per word, tripled and
    /// capped at 1.
    pub fn prevent_hallucination(&self, text: &str) -> SemanticResult<SemanticValidationResult> {
        let lowered = text.to_lowercase();
        let total_words = words(text).len();

        let mut known = 0usize;
        for graph in self.graphs.read().unwrap().values() {
            for concepts in graph.values() {
                for (name, concept) in concepts {
                    known += usize::from(lowered.contains(&name.to_lowercase()));
                    known += concept
                        .properties
                        .iter()
                        .filter(|p| lowered.contains(&p.to_lowercase()))
                        .count();
                }
            }
        }
        known += GENERAL_MAPPINGS
            .iter()
            .chain(AUTOGEN_MAPPINGS)
            .filter(|(phrase, _)| lowered.contains(phrase))
            .count();

        let confidence = if total_words > 0 && known > 0 {
            (known as f64 / total_words as f64 * 3.0).min(1.0)
        } else {
            0.0
        };

        let result = if confidence > HALLUCINATION_THRESHOLD {
            SemanticValidationResult::new(
                true,
                format!("Low hallucination risk: {known} known concepts validated in {total_words} total words"),
                confidence,
            )
        } else {
            let mut risky = SemanticValidationResult::new(
                false,
                format!("High hallucination risk detected: {known} known concepts found in {total_words} total words"),
                confidence,
            );
            risky.errors.push("High hallucination risk".into());
            risky
        };

        self.services.remember(
            MemoryEntry::new(
                audit_id("hallucination_check"),
                json!({
                    "input_text": text,
                    "result": {
                        "success": result.success,
                        "message": result.message,
                        "confidence": result.confidence,
                        "errors": result.errors,
                    },
                    "timestamp": result.timestamp,
                }),
                MemoryType::ShortTerm,
            )
            .with_tags(["semantic", "hallucination"])
            .with_ttl(self.services.settings.ttl(5)),
        );
        Ok(result)
    }

    /// Translate, verify the translation message and score it for
    /// hallucination risk.
    pub fn build_semantic_bridge(&self, intent: &str, framework: &str) -> SemanticResult<SemanticBridge> {
        let translation = self.translate_user_intent(intent, framework)?;
        let verification = self.verify_ontological_correctness(&json!({ "input": translation.message }))?;
        let hallucination = self.prevent_hallucination(&translation.message)?;

        let overall_success = translation.confidence > 0.5 && verification.is_pass() && hallucination.success;
        let bridge = SemanticBridge {
            user_intent: intent.to_string(),
            target_framework: framework.to_string(),
            translation_result: BridgeTranslation {
                translated_intent: translation.message,
                translated_terms: translation.translated_terms,
                confidence: translation.confidence,
            },
            validation_result: BridgeValidation {
                status: verification.status,
                message: verification.message,
                errors: verification.errors,
            },
            hallucination_check: BridgeHallucinationCheck {
                result: hallucination.success,
                confidence: hallucination.confidence,
                errors: hallucination.errors,
            },
            overall_success,
            timestamp: Utc::now(),
        };

        self.services.remember(
            MemoryEntry::new(
                audit_id(&format!("semantic_bridge_{framework}")),
                to_content(&bridge)?,
                MemoryType::ShortTerm,
            )
            .with_tags(["semantic", "bridge", "translation", framework])
            .with_ttl(self.services.settings.ttl(15)),
        );
        info!(framework = %framework, success = overall_success, "Semantic bridge built");
        Ok(bridge)
    }

    pub fn semantic_report(&self) -> SemanticReport {
        let graphs = self.graphs.read().unwrap();
        SemanticReport {
            summary: SemanticSummary {
                frameworks_supported: DomainFramework::ALL.to_vec(),
                total_knowledge_graphs: graphs.len(),
                total_mappings: MAPPING_DOMAINS.iter().map(|(_, table)| table.len()).sum(),
                timestamp: Utc::now(),
            },
            knowledge_graphs: graphs
                .iter()
                .map(|(framework, graph)| {
                    let counts = graph.iter().map(|(kind, concepts)| (kind.clone(), concepts.len())).collect();
                    (*framework, counts)
                })
                .collect(),
            translation_mappings: MAPPING_DOMAINS
                .iter()
                .map(|(domain, table)| (domain.to_string(), table.len()))
                .collect(),
        }
    }
}

// ── Internal ───────────────────────────────────────────────

/// Case-insensitive whole-phrase replacement, table order.
fn apply_translations(text: &str, table: &[(&str, &str)]) -> SemanticResult<String> {
    let mut result = text.to_string();
    for (phrase, replacement) in table {
        let pattern = format!(r"(?i)\b{}\b", regex_lite::escape(phrase));
        let re = Regex::new(&pattern).map_err(|e| PillarError::Semantic(e.to_string()))?;
        result = re.replace_all(&result, NoExpand(replacement)).into_owned();
    }
    Ok(result)
}

/// Lower-cased runs of Unicode word characters (letters, digits, `_`).
///
/// regex-lite's `\w` is ASCII-only, so this splits by hand.
fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn to_content<T: Serialize>(value: &T) -> SemanticResult<Value> {
    serde_json::to_value(value).map_err(|e| PillarError::Semantic(e.to_string()))
}
