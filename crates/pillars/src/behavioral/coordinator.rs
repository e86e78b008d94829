use crate::{PillarServices, audit_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::RwLock;
use tracing::{info, warn};
use triad_core::target::truthy;
use triad_core::{MemoryEntry, MemoryType, PillarError, Result, Target};
use triad_gates::GateStatus;

/// `(criterion, weight, threshold)`; weights sum to 1.
const QUALITY_CRITERIA: [(&str, f64, f64); 5] = [
    ("accuracy", 0.3, 0.8),
    ("clarity", 0.2, 0.7),
    ("relevance", 0.2, 0.8),
    ("completeness", 0.15, 0.75),
    ("timeliness", 0.15, 0.8),
];

pub const DEFAULT_PROTOCOL: &str = "standards_compliant";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseQuality {
    Excellent,
    Good,
    Adequate,
    Poor,
    Failed,
}

impl ResponseQuality {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 0.9 => Self::Excellent,
            s if s >= 0.8 => Self::Good,
            s if s >= 0.7 => Self::Adequate,
            s if s >= 0.5 => Self::Poor,
            _ => Self::Failed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Adequate => "adequate",
            Self::Poor => "poor",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ResponseQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named sequence of steps plus the gate rules checked afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    pub name: String,
    pub description: String,
    pub requirement_steps: Vec<String>,
    pub validation_gates: Vec<String>,
    #[serde(default)]
    pub quality_checkpoints: Vec<String>,
}

impl Protocol {
    fn new(name: &str, description: &str, steps: &[&str], gates: &[&str], checkpoints: &[&str]) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            requirement_steps: owned(steps),
            validation_gates: owned(gates),
            quality_checkpoints: owned(checkpoints),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepOutcome {
    fn ok(details: &str) -> Self {
        Self {
            success: true,
            details: Some(details.to_string()),
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            details: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExecution {
    pub step: String,
    pub result: StepOutcome,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateCheck {
    pub gate: String,
    pub status: GateStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityCriterion {
    pub weight: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub score: f64,
    pub weight: f64,
    pub threshold: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub individual_scores: BTreeMap<String, CriterionScore>,
    pub weighted_average: f64,
    pub overall_quality: ResponseQuality,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coordination {
    pub protocol: String,
    pub request: Target,
    pub execution_results: Vec<StepExecution>,
    pub validation_results: Vec<GateCheck>,
    pub quality_assessment: QualityAssessment,
    pub overall_success: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationTemplate {
    pub checks: Vec<String>,
    pub required_for: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationCheck {
    pub check: String,
    pub result: StepOutcome,
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub template: String,
    pub observations: BTreeMap<String, ObservationCheck>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolSummary {
    pub name: String,
    pub description: String,
    pub requirement_steps_count: usize,
    pub validation_gates_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationSummary {
    pub registered_protocols: usize,
    pub quality_criteria_count: usize,
    pub observation_templates_count: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationReport {
    pub summary: CoordinationSummary,
    pub protocols: BTreeMap<String, ProtocolSummary>,
    pub quality_criteria: BTreeMap<String, QualityCriterion>,
    pub observation_templates: BTreeMap<String, ObservationTemplate>,
}

fn default_protocols() -> BTreeMap<String, Protocol> {
    BTreeMap::from([
        (
            "standards_compliant".to_string(),
            Protocol::new(
                "Standards Compliant Protocol",
                "Ensures responses meet established standards",
                &[
                    "validate_content_accuracy",
                    "check_formatting_standards",
                    "verify_citation_requirements",
                    "ensure_compliance_with_guidelines",
                ],
                &["tech_implementation_check"],
                &["accuracy", "compliance"],
            ),
        ),
        (
            "quality_assured".to_string(),
            Protocol::new(
                "Quality Assured Protocol",
                "Implements comprehensive quality checks",
                &[
                    "apply_quality_criteria",
                    "perform_systematic_review",
                    "validate_response_quality",
                    "confirm_user_satisfaction_indicators",
                ],
                &["behavior_consistency_check", "semantic_mapping_check"],
                &["quality_score", "consistency", "user_alignment"],
            ),
        ),
        (
            "systematic_observation".to_string(),
            Protocol::new(
                "Systematic Observation Protocol",
                "Applies systematic observation methodology",
                &[
                    "apply_observation_template",
                    "perform_structured_analysis",
                    "document_observations",
                    "apply_improvement_feedback",
                ],
                &["vision_alignment_check"],
                &["observation_completeness", "systematicity", "accuracy"],
            ),
        ),
    ])
}

fn default_templates() -> BTreeMap<String, ObservationTemplate> {
    let template = |checks: &[&str], required_for: &[&str]| ObservationTemplate {
        checks: owned(checks),
        required_for: owned(required_for),
    };
    BTreeMap::from([
        (
            "quality_assessment".to_string(),
            template(
                &[
                    "accuracy_check",
                    "clarity_check",
                    "relevance_check",
                    "completeness_check",
                    "timeliness_check",
                ],
                &["high_priority", "critical"],
            ),
        ),
        (
            "consistency_check".to_string(),
            template(
                &["tone_consistency", "format_consistency", "content_style_consistency"],
                &["all"],
            ),
        ),
    ])
}

/// Runs response protocols and scores response quality.
pub struct ResponseCoordinator {
    services: PillarServices,
    protocols: RwLock<BTreeMap<String, Protocol>>,
    templates: BTreeMap<String, ObservationTemplate>,
}

impl ResponseCoordinator {
    pub fn new(services: PillarServices) -> Self {
        Self {
            services,
            protocols: RwLock::new(default_protocols()),
            templates: default_templates(),
        }
    }

    pub fn protocol(&self, name: &str) -> Option<Protocol> {
        self.protocols.read().unwrap().get(name).cloned()
    }

    /// Execute a protocol's steps, run its gate rules against the request
    /// and score the request's quality.
    pub fn coordinate_response(&self, request: &Target, protocol_name: &str) -> Result<Coordination> {
        let protocol = self
            .protocol(protocol_name)
            .ok_or_else(|| PillarError::UnknownProtocol(protocol_name.to_string()))?;

        let execution_results: Vec<StepExecution> = protocol
            .requirement_steps
            .iter()
            .map(|step| {
                let result = execute_step(step);
                if !result.success {
                    warn!(protocol = %protocol_name, step = %step, "Protocol step failed");
                }
                StepExecution {
                    step: step.clone(),
                    success: result.success,
                    result,
                }
            })
            .collect();

        let validation_results: Vec<GateCheck> = protocol
            .validation_gates
            .iter()
            .filter_map(|rule| {
                let result = self.services.gates.validate_rule(rule, Some(request), None)?;
                Some(GateCheck {
                    gate: rule.clone(),
                    status: result.status,
                    message: result.message,
                })
            })
            .collect();

        let quality_assessment = self.assess_response_quality(request)?;
        let overall_success = execution_results.iter().all(|e| e.success)
            && validation_results.iter().all(|v| v.status != GateStatus::Fail);

        let coordination = Coordination {
            protocol: protocol_name.to_string(),
            request: request.clone(),
            execution_results,
            validation_results,
            quality_assessment,
            overall_success,
            timestamp: Utc::now(),
        };
        self.services.remember(
            MemoryEntry::new(
                audit_id(&format!("response_coordination_{protocol_name}")),
                serde_json::to_value(&coordination)?,
                MemoryType::ShortTerm,
            )
            .with_tags(["response_coordination", "protocol", protocol_name])
            .with_ttl(self.services.settings.ttl(6)),
        );
        info!(protocol = %protocol_name, success = overall_success, "Response coordinated");
        Ok(coordination)
    }

    /// Score a response on the five weighted criteria.
    pub fn assess_response_quality(&self, response: &Target) -> Result<QualityAssessment> {
        let individual_scores: BTreeMap<String, CriterionScore> = QUALITY_CRITERIA
            .iter()
            .map(|&(criterion, weight, threshold)| {
                let score = criterion_score(criterion, response);
                let scored = CriterionScore {
                    score,
                    weight,
                    threshold,
                    passed: score >= threshold,
                };
                (criterion.to_string(), scored)
            })
            .collect();
        let weighted_average = individual_scores.values().map(|s| s.score * s.weight).sum();

        let assessment = QualityAssessment {
            individual_scores,
            weighted_average,
            overall_quality: ResponseQuality::from_score(weighted_average),
            timestamp: Utc::now(),
        };
        self.services.remember(
            MemoryEntry::new(
                audit_id("response_quality_assessment"),
                serde_json::to_value(&assessment)?,
                MemoryType::ShortTerm,
            )
            .with_tags(["response_quality", "assessment"])
            .with_ttl(self.services.settings.ttl(8)),
        );
        Ok(assessment)
    }

    pub fn apply_systematic_observation(&self, _target: &Target, template_name: &str) -> Result<Observation> {
        let template = self
            .templates
            .get(template_name)
            .ok_or_else(|| PillarError::UnknownTemplate(template_name.to_string()))?;

        let observation = Observation {
            template: template_name.to_string(),
            observations: template
                .checks
                .iter()
                .map(|check| (check.clone(), observe(check)))
                .collect(),
            timestamp: Utc::now(),
        };
        self.services.remember(
            MemoryEntry::new(
                audit_id(&format!("systematic_observation_{template_name}")),
                serde_json::to_value(&observation)?,
                MemoryType::ShortTerm,
            )
            .with_tags(["systematic_observation", "quality", template_name])
            .with_ttl(self.services.settings.ttl(7)),
        );
        Ok(observation)
    }

    /// Add a protocol. Returns `false` if the name is already taken.
    pub fn register_custom_protocol(&self, name: &str, protocol: Protocol) -> Result<bool> {
        {
            let mut protocols = self.protocols.write().unwrap();
            if protocols.contains_key(name) {
                warn!(protocol = %name, "Protocol already exists");
                return Ok(false);
            }
            protocols.insert(name.to_string(), protocol.clone());
        }

        self.services.remember(
            MemoryEntry::new(
                format!("response_protocol_{name}"),
                serde_json::to_value(&protocol)?,
                MemoryType::LongTerm,
            )
            .with_tags(["response_protocol", "custom"])
            .with_priority(8),
        );
        info!(protocol = %name, "Custom response protocol registered");
        Ok(true)
    }

    pub fn coordination_report(&self) -> CoordinationReport {
        let protocols = self.protocols.read().unwrap();
        CoordinationReport {
            summary: CoordinationSummary {
                registered_protocols: protocols.len(),
                quality_criteria_count: QUALITY_CRITERIA.len(),
                observation_templates_count: self.templates.len(),
                timestamp: Utc::now(),
            },
            protocols: protocols
                .iter()
                .map(|(key, p)| {
                    let summary = ProtocolSummary {
                        name: p.name.clone(),
                        description: p.description.clone(),
                        requirement_steps_count: p.requirement_steps.len(),
                        validation_gates_count: p.validation_gates.len(),
                    };
                    (key.clone(), summary)
                })
                .collect(),
            quality_criteria: QUALITY_CRITERIA
                .iter()
                .map(|&(name, weight, threshold)| (name.to_string(), QualityCriterion { weight, threshold }))
                .collect(),
            observation_templates: self.templates.clone(),
        }
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn execute_step(step: &str) -> StepOutcome {
    let details = match step {
        "validate_content_accuracy" => "Content accuracy validated",
        "check_formatting_standards" => "Formatting standards met",
        "verify_citation_requirements" => "Citation requirements met",
        "ensure_compliance_with_guidelines" => "Compliance verified",
        "apply_quality_criteria" => "Quality criteria applied",
        "perform_systematic_review" => "Systematic review completed",
        "validate_response_quality" => "Response quality validated",
        "confirm_user_satisfaction_indicators" => "User satisfaction indicators confirmed",
        "apply_observation_template" => "Observation template applied",
        "perform_structured_analysis" => "Structured analysis completed",
        "document_observations" => "Observations documented",
        "apply_improvement_feedback" => "Improvement feedback applied",
        other => return StepOutcome::failed(format!("Unknown protocol step: {other}")),
    };
    StepOutcome::ok(details)
}

fn criterion_score(criterion: &str, response: &Value) -> f64 {
    let has = |key: &str| truthy(response.get(key));
    match criterion {
        "accuracy" if has("facts") || has("citations") => 0.85,
        "accuracy" => 0.6,
        "clarity" if has("structured") => 0.8,
        "clarity" => 0.65,
        "relevance" if has("topic_aligned") => 0.9,
        "relevance" => 0.4,
        "completeness" if has("complete_coverage") => 0.75,
        "completeness" => 0.5,
        "timeliness" => 0.95,
        _ => 0.5,
    }
}

fn observe(check: &str) -> ObservationCheck {
    let details = match check {
        "accuracy_check" => "Content accuracy validated",
        "clarity_check" => "Clarity assessment completed",
        "relevance_check" => "Relevance assessment completed",
        "completeness_check" => "Completeness assessment completed",
        "timeliness_check" => "Timeliness assessment completed",
        "tone_consistency" => "Tone consistency assessment completed",
        "format_consistency" => "Format consistency assessment completed",
        "content_style_consistency" => "Content style consistency assessment completed",
        other => {
            let message = format!("Unknown check: {other}");
            return ObservationCheck {
                check: other.to_string(),
                result: StepOutcome::failed(message.clone()),
                details: message,
            };
        }
    };
    let result = if check == "accuracy_check" {
        execute_step("validate_content_accuracy")
    } else {
        StepOutcome {
            success: true,
            details: None,
            error: None,
        }
    };
    ObservationCheck {
        check: check.to_string(),
        result,
        details: details.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use triad_config::Settings;

    fn coordinator() -> ResponseCoordinator {
        ResponseCoordinator::new(PillarServices::standalone(Settings::default()))
    }

    #[test]
    fn quality_levels_follow_score_bands() {
        assert_eq!(ResponseQuality::from_score(0.95), ResponseQuality::Excellent);
        assert_eq!(ResponseQuality::from_score(0.8), ResponseQuality::Good);
        assert_eq!(ResponseQuality::from_score(0.7), ResponseQuality::Adequate);
        assert_eq!(ResponseQuality::from_score(0.5), ResponseQuality::Poor);
        assert_eq!(ResponseQuality::from_score(0.1), ResponseQuality::Failed);
    }

    #[test]
    fn rich_response_scores_good() {
        let response = json!({
            "facts": ["a"],
            "structured": true,
            "topic_aligned": true,
            "complete_coverage": true,
        });
        let assessment = coordinator().assess_response_quality(&response).unwrap();
        assert!((assessment.weighted_average - 0.85).abs() < 1e-9);
        assert_eq!(assessment.overall_quality, ResponseQuality::Good);
        assert!(assessment.individual_scores.values().all(|s| s.passed));
    }

    #[test]
    fn bare_response_scores_poor() {
        let assessment = coordinator().assess_response_quality(&json!({})).unwrap();
        assert!((assessment.weighted_average - 0.6075).abs() < 1e-9);
        assert_eq!(assessment.overall_quality, ResponseQuality::Poor);
        assert!(!assessment.individual_scores["relevance"].passed);
        assert!(assessment.individual_scores["timeliness"].passed);
    }

    #[test]
    fn standards_protocol_runs_steps_and_gate() {
        let coordinator = coordinator();
        let coordination = coordinator
            .coordinate_response(&json!({"content": "hello"}), DEFAULT_PROTOCOL)
            .unwrap();
        assert_eq!(coordination.execution_results.len(), 4);
        assert!(coordination.execution_results.iter().all(|e| e.success));
        assert_eq!(coordination.validation_results.len(), 1);
        assert_eq!(coordination.validation_results[0].gate, "tech_implementation_check");

        let stored = coordinator
            .services
            .memory
            .search(&["response_coordination"], Some(MemoryType::ShortTerm));
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn unknown_protocol_is_an_error() {
        let err = coordinator()
            .coordinate_response(&json!({}), "fast_track")
            .unwrap_err();
        assert!(err.to_string().contains("fast_track"));
    }

    #[test]
    fn custom_protocol_with_unknown_step_fails_overall() {
        let coordinator = coordinator();
        let protocol = Protocol {
            name: "Draft".into(),
            description: "Draft only".into(),
            requirement_steps: vec!["check_formatting_standards".into(), "summon_reviewer".into()],
            validation_gates: vec![],
            quality_checkpoints: vec![],
        };
        assert!(coordinator.register_custom_protocol("draft", protocol.clone()).unwrap());
        assert!(!coordinator.register_custom_protocol("draft", protocol).unwrap());

        let coordination = coordinator.coordinate_response(&json!({}), "draft").unwrap();
        assert!(!coordination.overall_success);
        assert_eq!(
            coordination.execution_results[1].result.error.as_deref(),
            Some("Unknown protocol step: summon_reviewer")
        );
        assert_eq!(coordinator.coordination_report().summary.registered_protocols, 4);
    }

    #[test]
    fn observation_applies_every_template_check() {
        let coordinator = coordinator();
        let observation = coordinator
            .apply_systematic_observation(&json!({}), "consistency_check")
            .unwrap();
        assert_eq!(observation.observations.len(), 3);
        assert_eq!(
            observation.observations["tone_consistency"].details,
            "Tone consistency assessment completed"
        );

        let err = coordinator
            .apply_systematic_observation(&json!({}), "vibes")
            .unwrap_err();
        assert!(err.to_string().contains("vibes"));
    }
}
