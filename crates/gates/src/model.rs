//! Gate data model: categories, statuses, results and rules.

use crate::GateError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use triad_core::{Context, Target};

/// Fixed classification attached to every rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateCategory {
    TechnicalValidation,
    BehavioralIntegrity,
    SemanticAccuracy,
    IntegrationCoherence,
    PerformanceEfficiency,
    VisionAlignment,
}

impl GateCategory {
    pub const ALL: [GateCategory; 6] = [
        Self::TechnicalValidation,
        Self::BehavioralIntegrity,
        Self::SemanticAccuracy,
        Self::IntegrationCoherence,
        Self::PerformanceEfficiency,
        Self::VisionAlignment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TechnicalValidation => "technical_validation",
            Self::BehavioralIntegrity => "behavioral_integrity",
            Self::SemanticAccuracy => "semantic_accuracy",
            Self::IntegrationCoherence => "integration_coherence",
            Self::PerformanceEfficiency => "performance_efficiency",
            Self::VisionAlignment => "vision_alignment",
        }
    }
}

impl fmt::Display for GateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GateCategory {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|g| g.as_str() == wanted)
            .ok_or_else(|| GateError::UnknownGate(s.to_string()))
    }
}

/// Outcome status of one validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    Pass,
    Fail,
    Pending,
    Skipped,
}

impl GateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Pending => "pending",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fixed-shape validation record, produced fresh on every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub gate: GateCategory,
    pub status: GateStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn new(gate: GateCategory, status: GateStatus, message: impl Into<String>) -> Self {
        Self {
            gate,
            status,
            message: message.into(),
            timestamp: Utc::now(),
            metadata: Map::new(),
            errors: Vec::new(),
        }
    }

    pub fn is_pass(&self) -> bool {
        self.status == GateStatus::Pass
    }

    /// The rule that produced this result, if recorded.
    pub fn rule_id(&self) -> Option<&str> {
        self.metadata.get("rule_id").and_then(Value::as_str)
    }
}

/// What a validator hands back: status, message, metadata and errors.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub status: GateStatus,
    pub message: String,
    pub metadata: Map<String, Value>,
    pub errors: Vec<String>,
}

impl Outcome {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            status: GateStatus::Pass,
            message: message.into(),
            metadata: Map::new(),
            errors: Vec::new(),
        }
    }

    pub fn fail(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            status: GateStatus::Fail,
            message: message.into(),
            metadata: Map::new(),
            errors,
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// A validation check.
///
/// Implementations inspect `target` (absent means "nothing to validate",
/// which is always a pass) and may consult `context`. Returning `Err` is
/// the validator "throwing": the engine turns it into a `fail` result.
pub trait Validator: Send + Sync {
    fn validate(
        &self,
        target: Option<&Target>,
        context: &Context,
        rule: &ValidationRule,
    ) -> Result<Outcome, GateError>;
}

impl<F> Validator for F
where
    F: Fn(Option<&Target>, &Context, &ValidationRule) -> Result<Outcome, GateError> + Send + Sync,
{
    fn validate(
        &self,
        target: Option<&Target>,
        context: &Context,
        rule: &ValidationRule,
    ) -> Result<Outcome, GateError> {
        self(target, context, rule)
    }
}

/// Default rule timeout.
pub const DEFAULT_RULE_TIMEOUT: Duration = Duration::from_secs(30);

/// A registered rule.
#[derive(Clone)]
pub struct ValidationRule {
    pub id: String,
    pub gate: GateCategory,
    pub description: String,
    pub validator: Arc<dyn Validator>,
    pub enabled: bool,
    /// Higher runs first in `validate_all`.
    pub priority: i32,
    /// Rules whose *enabled* flag gates this one.
    pub dependencies: Vec<String>,
    /// Wall-time budget, checked after the validator returns.
    pub timeout: Duration,
}

impl ValidationRule {
    pub fn new(id: impl Into<String>, gate: GateCategory, validator: impl Validator + 'static) -> Self {
        Self {
            id: id.into(),
            gate,
            description: String::new(),
            validator: Arc::new(validator),
            enabled: true,
            priority: 5,
            dependencies: Vec::new(),
            timeout: DEFAULT_RULE_TIMEOUT,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn summary(&self) -> RuleSummary {
        RuleSummary {
            id: self.id.clone(),
            gate: self.gate,
            description: self.description.clone(),
            enabled: self.enabled,
            priority: self.priority,
            dependencies: self.dependencies.clone(),
            timeout_secs: self.timeout.as_secs(),
        }
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("id", &self.id)
            .field("gate", &self.gate)
            .field("enabled", &self.enabled)
            .field("priority", &self.priority)
            .field("dependencies", &self.dependencies)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Serializable view of a rule (everything but the validator).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleSummary {
    pub id: String,
    pub gate: GateCategory,
    pub description: String,
    pub enabled: bool,
    pub priority: i32,
    pub dependencies: Vec<String>,
    pub timeout_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_category_round_trips_through_str() {
        for gate in GateCategory::ALL {
            assert_eq!(gate.as_str().parse::<GateCategory>().unwrap(), gate);
        }
        assert_eq!(
            "Semantic-Accuracy".parse::<GateCategory>().unwrap(),
            GateCategory::SemanticAccuracy
        );
        assert!("security".parse::<GateCategory>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&GateStatus::Skipped).unwrap();
        assert_eq!(json, "\"skipped\"");
    }

    #[test]
    fn closures_are_validators() {
        let rule = ValidationRule::new(
            "always",
            GateCategory::VisionAlignment,
            |_: Option<&Target>, _: &Context, _: &ValidationRule| -> Result<Outcome, GateError> {
                Ok(Outcome::pass("ok"))
            },
        )
        .with_priority(3);
        let outcome = rule
            .validator
            .validate(None, &Context::new(), &rule)
            .unwrap();
        assert_eq!(outcome.status, GateStatus::Pass);
        assert_eq!(rule.summary().priority, 3);
        assert_eq!(rule.summary().timeout_secs, 30);
    }

    #[test]
    fn result_exposes_rule_id() {
        let mut result = ValidationResult::new(GateCategory::SemanticAccuracy, GateStatus::Fail, "x");
        assert!(result.rule_id().is_none());
        result.metadata.insert("rule_id".into(), "r1".into());
        assert_eq!(result.rule_id(), Some("r1"));
        assert!(!result.is_pass());
    }
}
