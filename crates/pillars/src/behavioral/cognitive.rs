use crate::PillarServices;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::RwLock;
use tracing::{debug, info, warn};
use triad_core::target::str_list;
use triad_core::{MemoryEntry, MemoryType, Result, Target};
use triad_gates::{GateCategory, GateStatus, ValidationResult, ValidationStats};

/// Steps a reasoning trace must contain, in any order.
const REASONING_STEPS: [&str; 4] = ["perceive", "analyze", "reason", "conclude"];

/// Response fields compared for consistency.
const RESPONSE_TRAITS: [&str; 3] = ["tone", "format", "content_style"];

const DRIFT_HISTORY_REPORTED: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftType {
    ReasoningDeviation,
    ResponseInconsistency,
    MethodologyViolation,
}

impl DriftType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReasoningDeviation => "reasoning_deviation",
            Self::ResponseInconsistency => "response_inconsistency",
            Self::MethodologyViolation => "methodology_violation",
        }
    }
}

impl fmt::Display for DriftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected departure from baseline behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drift {
    pub drift_id: String,
    pub drift_type: DriftType,
    pub severity: String,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedPattern {
    #[serde(rename = "type")]
    pub pattern_type: String,
    pub definition: Value,
    pub last_seen: DateTime<Utc>,
    pub compliance_count: u64,
    pub non_compliance_count: u64,
}

impl TrackedPattern {
    fn new(pattern_type: &str, definition: Value) -> Self {
        Self {
            pattern_type: pattern_type.to_string(),
            definition,
            last_seen: Utc::now(),
            compliance_count: 0,
            non_compliance_count: 0,
        }
    }

    fn observe(&mut self, compliant: bool) {
        self.last_seen = Utc::now();
        if compliant {
            self.compliance_count += 1;
        } else {
            self.non_compliance_count += 1;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub status: GateStatus,
    pub message: String,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehensiveValidation {
    pub validation_results: BTreeMap<String, ValidationSummary>,
    pub detected_drifts: Vec<Drift>,
    pub overall_status: GateStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CognitiveSummary {
    pub tracked_patterns: usize,
    pub detected_drifts: usize,
    pub drift_history_count: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftLog {
    pub current: Vec<Drift>,
    pub history: Vec<Drift>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CognitiveReport {
    pub summary: CognitiveSummary,
    pub drifts: DriftLog,
    pub validation_stats: ValidationStats,
}

/// Checks behavior traces for consistency, methodology adherence and
/// drift away from a baseline.
pub struct CognitiveValidator {
    services: PillarServices,
    tracked: RwLock<BTreeMap<String, TrackedPattern>>,
    drifts: RwLock<DriftLog>,
}

impl CognitiveValidator {
    pub fn new(services: PillarServices) -> Self {
        let tracked = BTreeMap::from([
            (
                "default_reasoning_flow".to_string(),
                TrackedPattern::new(
                    "reasoning_flow",
                    json!({
                        "required_steps": REASONING_STEPS,
                        "validation_points": ["fact_check", "logic_validation", "consistency_check"],
                    }),
                ),
            ),
            (
                "default_response_consistency".to_string(),
                TrackedPattern::new(
                    "response_consistency",
                    json!({
                        "elements_to_track": RESPONSE_TRAITS,
                        "consistency_threshold": 0.8,
                    }),
                ),
            ),
        ]);
        Self {
            services,
            tracked: RwLock::new(tracked),
            drifts: RwLock::new(DriftLog {
                current: Vec::new(),
                history: Vec::new(),
            }),
        }
    }

    pub fn tracked_pattern(&self, name: &str) -> Option<TrackedPattern> {
        self.tracked.read().unwrap().get(name).cloned()
    }

    /// Compare every response against the first one and check that any
    /// reasoning trace covers the full reasoning flow.
    pub fn validate_behavioral_consistency(&self, target: &Target) -> Result<ValidationResult> {
        let mut issues = Vec::new();

        let responses = target.get("responses").and_then(Value::as_array);
        if let Some(responses) = responses.filter(|r| r.len() > 1) {
            let first = &responses[0];
            for (i, response) in responses.iter().enumerate().skip(1) {
                if !same_traits(first, response) {
                    issues.push(format!("Inconsistency detected between response 0 and response {i}"));
                }
            }
            self.observe("default_response_consistency", issues.is_empty());
        }

        let steps = target.get("reasoning_steps").and_then(Value::as_array);
        if let Some(steps) = steps.filter(|s| !s.is_empty()) {
            let types: Vec<&str> = steps
                .iter()
                .filter_map(|s| s.get("type").and_then(Value::as_str))
                .collect();
            let complete = REASONING_STEPS.iter().all(|wanted| types.contains(wanted));
            if !complete {
                issues.push("Reasoning flow deviates from expected pattern".to_string());
            }
            self.observe("default_reasoning_flow", complete);
        }

        self.finish(target, "behavioral_consistency", "Behavioral consistency", issues)
    }

    /// Required methodology steps and gates are only compared when both
    /// sides of the comparison are present.
    pub fn validate_methodology_adherence(&self, target: &Target) -> Result<ValidationResult> {
        let required = target.get("required_methodology");
        let mut issues = Vec::new();

        let required_steps = str_list(required.and_then(|r| r.get("steps")));
        let performed_steps = str_list(target.get("performed_steps"));
        if !required_steps.is_empty() && !performed_steps.is_empty() {
            issues.extend(
                required_steps
                    .iter()
                    .filter(|s| !performed_steps.contains(s))
                    .map(|s| format!("Missing required methodology step: {s}")),
            );
        }

        let required_gates = str_list(required.and_then(|r| r.get("validation_gates")));
        let passed_gates = str_list(target.get("passed_validation_gates"));
        if !required_gates.is_empty() && !passed_gates.is_empty() {
            issues.extend(
                required_gates
                    .iter()
                    .filter(|g| !passed_gates.contains(g))
                    .map(|g| format!("Missing required validation gate: {g}")),
            );
        }

        self.finish(target, "methodology_adherence", "Methodology adherence", issues)
    }

    pub fn validate_cognitive_patterns(&self, target: &Target) -> Result<ValidationResult> {
        let observed = str_list(target.get("observed_patterns"));
        let issues = str_list(target.get("expected_patterns"))
            .into_iter()
            .filter(|p| !observed.contains(p))
            .map(|p| format!("Expected cognitive pattern not found: {p}"))
            .collect();

        self.finish(target, "cognitive_patterns", "Cognitive pattern", issues)
    }

    /// Compare `current` against `baseline`, or against the newest stored
    /// behavioral pattern when no baseline is given.
    pub fn detect_cognitive_drift(&self, current: &Target, baseline: Option<&Target>) -> Result<Vec<Drift>> {
        let stored;
        let baseline = match baseline {
            Some(b) => b,
            None => match self.historical_baseline() {
                Some(b) => {
                    stored = b;
                    &stored
                }
                None => {
                    warn!("No baseline behavior available for drift detection");
                    return Ok(Vec::new());
                }
            },
        };

        let mut detected = Vec::new();
        for (drift_type, severity, details) in compare_behaviors(current, baseline) {
            let drift = {
                let mut log = self.drifts.write().unwrap();
                let drift = Drift {
                    drift_id: format!("drift_{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), log.current.len()),
                    drift_type,
                    severity: severity.to_string(),
                    details,
                    timestamp: Utc::now(),
                };
                log.current.push(drift.clone());
                drift
            };

            self.services.remember(
                MemoryEntry::new(
                    format!("cognitive_drift_{}", drift.drift_id),
                    serde_json::to_value(&drift)?,
                    MemoryType::ShortTerm,
                )
                .with_tags(["cognitive", "drift", drift_type.as_str()])
                .with_priority(9)
                .with_ttl(TimeDelta::hours(24)),
            );
            info!(drift = %drift.drift_id, kind = %drift_type, severity, "Cognitive drift detected");
            detected.push(drift);
        }
        Ok(detected)
    }

    /// Run all three validations plus drift detection against one target.
    pub fn run_comprehensive_validation(&self, target: &Target) -> Result<ComprehensiveValidation> {
        let results = [
            ("behavioral_consistency", self.validate_behavioral_consistency(target)?),
            ("methodology_adherence", self.validate_methodology_adherence(target)?),
            ("cognitive_patterns", self.validate_cognitive_patterns(target)?),
        ];
        let detected_drifts = self.detect_cognitive_drift(target, None)?;

        let overall_status = if results.iter().any(|(_, r)| r.status == GateStatus::Fail) {
            GateStatus::Fail
        } else if results.iter().any(|(_, r)| r.status == GateStatus::Pending) {
            GateStatus::Pending
        } else {
            GateStatus::Pass
        };

        let validation = ComprehensiveValidation {
            validation_results: results
                .into_iter()
                .map(|(name, r)| {
                    let summary = ValidationSummary {
                        status: r.status,
                        message: r.message,
                        metadata: r.metadata,
                    };
                    (name.to_string(), summary)
                })
                .collect(),
            detected_drifts,
            overall_status,
            timestamp: Utc::now(),
        };

        self.services.remember(
            MemoryEntry::new(
                crate::audit_id("comprehensive_cognitive_validation"),
                serde_json::to_value(&validation)?,
                MemoryType::ShortTerm,
            )
            .with_tags(["cognitive_validation", "comprehensive"])
            .with_ttl(self.services.settings.ttl(10)),
        );
        Ok(validation)
    }

    /// Move current drifts into the history, returning how many moved.
    pub fn archive_drifts(&self) -> usize {
        let mut log = self.drifts.write().unwrap();
        let moved = std::mem::take(&mut log.current);
        let count = moved.len();
        log.history.extend(moved);
        count
    }

    pub fn cognitive_report(&self) -> CognitiveReport {
        let log = self.drifts.read().unwrap();
        let skip = log.history.len().saturating_sub(DRIFT_HISTORY_REPORTED);
        CognitiveReport {
            summary: CognitiveSummary {
                tracked_patterns: self.tracked.read().unwrap().len(),
                detected_drifts: log.current.len(),
                drift_history_count: log.history.len(),
                timestamp: Utc::now(),
            },
            drifts: DriftLog {
                current: log.current.clone(),
                history: log.history[skip..].to_vec(),
            },
            validation_stats: self.services.gates.stats(),
        }
    }

    // ── Internal ───────────────────────────────────────────────

    fn observe(&self, pattern: &str, compliant: bool) {
        if let Some(tracked) = self.tracked.write().unwrap().get_mut(pattern) {
            tracked.observe(compliant);
        }
    }

    fn historical_baseline(&self) -> Option<Value> {
        self.services
            .memory
            .search(&["behavioral", "pattern"], Some(MemoryType::LongTerm))
            .into_iter()
            .max_by_key(|e| e.creation_time)
            .map(|e| e.content)
    }

    fn finish(
        &self,
        target: &Target,
        validation_type: &str,
        label: &str,
        issues: Vec<String>,
    ) -> Result<ValidationResult> {
        let (status, message) = if issues.is_empty() {
            (GateStatus::Pass, format!("{label} validation passed"))
        } else {
            (
                GateStatus::Fail,
                format!("{label} validation failed with {} issue(s)", issues.len()),
            )
        };

        let mut result = ValidationResult::new(GateCategory::BehavioralIntegrity, status, message);
        result.metadata.insert("validation_type".into(), json!(validation_type));
        result.metadata.insert("issues_count".into(), json!(issues.len()));
        result.errors = issues;

        self.services.remember(
            MemoryEntry::new(
                crate::audit_id(&format!("validation_result_{}", result.gate)),
                json!({
                    "result": serde_json::to_value(&result)?,
                    "target": target,
                    "timestamp": result.timestamp,
                }),
                MemoryType::ShortTerm,
            )
            .with_tags(["cognitive_validation", "result", result.gate.as_str()])
            .with_ttl(self.services.settings.ttl(5)),
        );
        debug!(validation = validation_type, status = %result.status, "Cognitive validation finished");
        Ok(result)
    }
}

fn same_traits(a: &Value, b: &Value) -> bool {
    RESPONSE_TRAITS.iter().all(|key| a.get(key) == b.get(key))
}

fn step_types(behavior: &Value) -> Vec<Option<&Value>> {
    behavior
        .get("reasoning_steps")
        .and_then(Value::as_array)
        .map(|steps| steps.iter().map(|s| s.get("type")).collect())
        .unwrap_or_default()
}

fn compare_behaviors(current: &Value, baseline: &Value) -> Vec<(DriftType, &'static str, Value)> {
    let mut drifts = Vec::new();

    let current_steps = step_types(current);
    let baseline_steps = step_types(baseline);
    if current_steps != baseline_steps {
        drifts.push((
            DriftType::ReasoningDeviation,
            "high",
            json!({
                "baseline_count": baseline_steps.len(),
                "current_count": current_steps.len(),
            }),
        ));
    }

    let empty = Vec::new();
    let current_responses = current.get("responses").and_then(Value::as_array).unwrap_or(&empty);
    let baseline_responses = baseline.get("responses").and_then(Value::as_array).unwrap_or(&empty);
    let inconsistent = current_responses.len() != baseline_responses.len()
        || current_responses.first().map(|r| r.get("style"))
            != baseline_responses.first().map(|r| r.get("style"));
    if inconsistent {
        drifts.push((
            DriftType::ResponseInconsistency,
            "medium",
            json!({
                "baseline_count": baseline_responses.len(),
                "current_count": current_responses.len(),
            }),
        ));
    }

    let followed: BTreeSet<String> = str_list(current.get("methodology_followed")).into_iter().collect();
    let violated: Vec<String> = str_list(baseline.get("methodology_followed"))
        .into_iter()
        .filter(|step| !followed.contains(step))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if !violated.is_empty() {
        drifts.push((
            DriftType::MethodologyViolation,
            "high",
            json!({ "violated_steps": violated }),
        ));
    }

    drifts
}
