use crate::{PillarServices, audit_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::RwLock;
use tracing::{info, warn};
use triad_core::target::str_list;
use triad_core::{MemoryEntry, MemoryType, Result, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    ResponseFormation,
    CognitiveProcessing,
    MethodologyAdherence,
    ConsistencyPatterns,
}

impl PatternType {
    pub const ALL: [PatternType; 4] = [
        Self::ResponseFormation,
        Self::CognitiveProcessing,
        Self::MethodologyAdherence,
        Self::ConsistencyPatterns,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResponseFormation => "response_formation",
            Self::CognitiveProcessing => "cognitive_processing",
            Self::MethodologyAdherence => "methodology_adherence",
            Self::ConsistencyPatterns => "consistency_patterns",
        }
    }

    /// `(definition key, target key, issue prefix)` checked for this type.
    fn requirement(&self) -> Option<(&'static str, &'static str, &'static str)> {
        match self {
            Self::ResponseFormation => Some(("required_elements", "response_elements", "Missing required element")),
            Self::CognitiveProcessing => Some(("steps", "processing_steps", "Missing processing step")),
            Self::MethodologyAdherence => Some(("required_checks", "performed_checks", "Missing methodology check")),
            Self::ConsistencyPatterns => None,
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehavioralPattern {
    pub name: String,
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub definition: Map<String, Value>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub enabled: bool,
    pub version: String,
}

impl BehavioralPattern {
    pub fn new(name: impl Into<String>, pattern_type: PatternType, definition: Value) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            pattern_type,
            definition: match definition {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            description: String::new(),
            created_at: now,
            last_modified: now,
            enabled: true,
            version: "1.0".into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Compare a target against this pattern's requirements.
    pub fn check(&self, target: &Target) -> PatternCheck {
        let mut issues = Vec::new();
        if let Some((required_key, target_key, prefix)) = self.pattern_type.requirement() {
            let present = str_list(target.get(target_key));
            for wanted in str_list(self.definition.get(required_key)) {
                if !present.contains(&wanted) {
                    issues.push(format!("{prefix}: {wanted}"));
                }
            }
        }
        PatternCheck {
            pattern_name: self.name.clone(),
            compliant: issues.is_empty(),
            issues,
            details: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternCheck {
    pub pattern_name: String,
    pub compliant: bool,
    pub issues: Vec<String>,
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternValidation {
    pub pattern_name: String,
    pub pattern_type: PatternType,
    pub result: PatternCheck,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkValidation {
    pub validation_results: Vec<PatternValidation>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehavioralSummary {
    pub total_patterns: usize,
    pub by_type: BTreeMap<PatternType, usize>,
    pub enabled_patterns: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehavioralReport {
    pub summary: BehavioralSummary,
    pub patterns: Vec<BehavioralPattern>,
}

fn default_patterns() -> Vec<BehavioralPattern> {
    vec![
        BehavioralPattern::new(
            "default_response_formation",
            PatternType::ResponseFormation,
            json!({
                "structure": ["context", "analysis", "response"],
                "required_elements": ["acknowledgment", "solution", "follow_up"],
                "tone": "professional",
                "length": "concise",
            }),
        )
        .with_description("Default pattern for forming responses"),
        BehavioralPattern::new(
            "cognitive_processing_flow",
            PatternType::CognitiveProcessing,
            json!({
                "steps": ["perceive", "interpret", "reason", "decide", "act"],
                "validation_points": ["input_quality", "assumption_check", "consistency_check"],
                "feedback_loops": ["confidence_verification", "error_correction"],
            }),
        )
        .with_description("Standard cognitive processing flow"),
        BehavioralPattern::new(
            "methodology_checkpoints",
            PatternType::MethodologyAdherence,
            json!({
                "required_checks": ["validation_gate", "memory_consistency", "role_activation"],
                "compliance_indicators": ["protocol_followed", "standards_met", "requirements_satisfied"],
            }),
        )
        .with_description("Methodology adherence checkpoints"),
    ]
}

/// Owns the behavioral pattern registry and builds architectures and
/// methodologies out of it.
pub struct BehavioralArchitect {
    services: PillarServices,
    patterns: RwLock<Vec<BehavioralPattern>>,
}

impl BehavioralArchitect {
    pub fn new(services: PillarServices) -> Self {
        Self {
            services,
            patterns: RwLock::new(default_patterns()),
        }
    }

    /// Add a pattern. Returns `false` if the name is already taken.
    pub fn register_pattern(&self, pattern: BehavioralPattern) -> Result<bool> {
        {
            let mut patterns = self.patterns.write().unwrap();
            if patterns.iter().any(|p| p.name == pattern.name) {
                warn!(pattern = %pattern.name, "Behavioral pattern already exists");
                return Ok(false);
            }
            patterns.push(pattern.clone());
        }

        self.services.remember(
            MemoryEntry::new(
                format!("behavioral_pattern_{}", pattern.name),
                serde_json::to_value(&pattern)?,
                MemoryType::LongTerm,
            )
            .with_tags(["behavioral", "pattern", pattern.pattern_type.as_str()])
            .with_priority(8),
        );
        info!(pattern = %pattern.name, kind = %pattern.pattern_type, "Behavioral pattern registered");
        Ok(true)
    }

    pub fn pattern(&self, name: &str) -> Option<BehavioralPattern> {
        self.patterns.read().unwrap().iter().find(|p| p.name == name).cloned()
    }

    /// Replace a pattern's definition and/or description.
    pub fn update_pattern(
        &self,
        name: &str,
        definition: Option<Map<String, Value>>,
        description: Option<&str>,
    ) -> Result<bool> {
        let updated = {
            let mut patterns = self.patterns.write().unwrap();
            let Some(pattern) = patterns.iter_mut().find(|p| p.name == name) else {
                return Ok(false);
            };
            if let Some(definition) = definition {
                pattern.definition = definition;
                pattern.last_modified = Utc::now();
            }
            if let Some(description) = description {
                pattern.description = description.to_string();
                pattern.last_modified = Utc::now();
            }
            pattern.clone()
        };

        let id = format!("behavioral_pattern_{name}");
        if self.services.memory.retrieve(&id, None).is_some() {
            self.services.memory.update(&id, serde_json::to_value(&updated)?, None);
        }
        Ok(true)
    }

    /// Check a target against every enabled pattern.
    pub fn validate_behavioral_framework(&self, target: &Target) -> Result<FrameworkValidation> {
        let validation_results: Vec<PatternValidation> = self
            .patterns
            .read()
            .unwrap()
            .iter()
            .filter(|p| p.enabled)
            .map(|p| PatternValidation {
                pattern_name: p.name.clone(),
                pattern_type: p.pattern_type,
                result: p.check(target),
            })
            .collect();

        let validation = FrameworkValidation {
            validation_results,
            timestamp: Utc::now(),
        };
        self.services.remember(
            MemoryEntry::new(
                audit_id("behavioral_validation"),
                json!({
                    "target_behavior": target,
                    "validation_results": serde_json::to_value(&validation.validation_results)?,
                    "timestamp": validation.timestamp,
                }),
                MemoryType::ShortTerm,
            )
            .with_tags(["behavioral", "validation"])
            .with_ttl(self.services.settings.ttl(4)),
        );
        Ok(validation)
    }

    /// Assemble an architecture from components; a component naming a
    /// registered pattern under `based_on_pattern` marks it as used.
    pub fn create_cognitive_architecture(&self, name: &str, components: Vec<Value>) -> Value {
        let patterns_used: Vec<String> = {
            let patterns = self.patterns.read().unwrap();
            components
                .iter()
                .filter_map(|c| c.get("based_on_pattern").and_then(Value::as_str))
                .filter(|wanted| patterns.iter().any(|p| p.name == *wanted))
                .map(str::to_string)
                .collect()
        };

        let architecture = json!({
            "name": name,
            "components": components,
            "created_at": Utc::now(),
            "patterns_used": patterns_used,
            "validation_status": "pending",
        });
        self.services.remember(
            MemoryEntry::new(
                format!("cognitive_architecture_{name}"),
                architecture.clone(),
                MemoryType::LongTerm,
            )
            .with_tags(["behavioral", "architecture", "cognitive"])
            .with_priority(9),
        );
        architecture
    }

    /// Merge the named patterns' steps and checks, keeping first occurrences.
    pub fn generate_methodology<S: AsRef<str>>(&self, name: &str, pattern_names: &[S]) -> Value {
        let mut included = Vec::new();
        let mut steps: Vec<String> = Vec::new();
        let mut requirements: Vec<String> = Vec::new();

        for wanted in pattern_names {
            let Some(pattern) = self.pattern(wanted.as_ref()) else {
                continue;
            };
            for step in str_list(pattern.definition.get("steps")) {
                if !steps.contains(&step) {
                    steps.push(step);
                }
            }
            for check in str_list(pattern.definition.get("required_checks")) {
                if !requirements.contains(&check) {
                    requirements.push(check);
                }
            }
            included.push(json!({
                "name": pattern.name,
                "type": pattern.pattern_type,
                "definition": pattern.definition,
            }));
        }

        let joined: Vec<&str> = pattern_names.iter().map(AsRef::as_ref).collect();
        let methodology = json!({
            "name": name,
            "description": format!("Methodology combining patterns: {}", joined.join(", ")),
            "patterns": included,
            "steps": steps,
            "validation_requirements": requirements,
            "created_at": Utc::now(),
        });
        self.services.remember(
            MemoryEntry::new(format!("methodology_{name}"), methodology.clone(), MemoryType::LongTerm)
                .with_tags(["behavioral", "methodology"])
                .with_priority(8),
        );
        methodology
    }

    pub fn behavioral_report(&self) -> BehavioralReport {
        let patterns = self.patterns.read().unwrap().clone();
        let by_type = PatternType::ALL
            .into_iter()
            .map(|t| (t, patterns.iter().filter(|p| p.pattern_type == t).count()))
            .collect();
        BehavioralReport {
            summary: BehavioralSummary {
                total_patterns: patterns.len(),
                by_type,
                enabled_patterns: patterns.iter().filter(|p| p.enabled).count(),
                timestamp: Utc::now(),
            },
            patterns,
        }
    }

    pub fn enable_pattern(&self, name: &str) -> bool {
        self.set_enabled(name, true)
    }

    pub fn disable_pattern(&self, name: &str) -> bool {
        self.set_enabled(name, false)
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        let mut patterns = self.patterns.write().unwrap();
        match patterns.iter_mut().find(|p| p.name == name) {
            Some(pattern) => {
                pattern.enabled = enabled;
                true
            }
            None => false,
        }
    }
}
