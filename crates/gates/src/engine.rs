//! Rule registry and execution.

use crate::model::{GateCategory, GateStatus, RuleSummary, ValidationResult, ValidationRule};
use crate::validators;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use triad_core::{Context, MemoryEntry, MemoryType, Target};
use triad_memory::MemoryStore;

/// Results kept in the in-memory history.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// How long `validate_all` results stay in the memory store.
const RESULT_TTL_HOURS: i64 = 24;

/// Aggregate view over the result history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationStats {
    pub total_validations: usize,
    pub pass_count: usize,
    pub fail_count: usize,
    pub pending_count: usize,
    pub skipped_count: usize,
    pub validation_counts_by_gate: BTreeMap<GateCategory, usize>,
    pub latest_result_timestamp: Option<DateTime<Utc>>,
    pub timestamp: DateTime<Utc>,
}

/// The validation gate engine.
///
/// Thread-safe. Rules are kept in registration order, which is the order
/// `validate_gate` runs them in.
pub struct ValidationGates {
    rules: RwLock<Vec<ValidationRule>>,
    history: RwLock<VecDeque<ValidationResult>>,
    history_limit: usize,
    memory: Arc<MemoryStore>,
}

impl ValidationGates {
    /// An engine with no rules registered.
    pub fn new(memory: Arc<MemoryStore>) -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
            history: RwLock::new(VecDeque::with_capacity(DEFAULT_HISTORY_LIMIT)),
            history_limit: DEFAULT_HISTORY_LIMIT,
            memory,
        }
    }

    /// An engine loaded with the nine built-in rules.
    pub fn with_default_rules(memory: Arc<MemoryStore>) -> Self {
        let gates = Self::new(memory);
        for rule in validators::default_rules() {
            gates.add_rule(rule);
        }
        info!(rules = gates.rules.read().unwrap().len(), "Validation gates initialized");
        gates
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    /// Register a rule. Returns `false` if the id is already taken.
    pub fn add_rule(&self, rule: ValidationRule) -> bool {
        let mut rules = self.rules.write().unwrap();
        if rules.iter().any(|r| r.id == rule.id) {
            warn!(rule = %rule.id, "Rule id already registered");
            return false;
        }
        debug!(rule = %rule.id, gate = %rule.gate, priority = rule.priority, "Rule added");
        rules.push(rule);
        true
    }

    pub fn remove_rule(&self, rule_id: &str) -> bool {
        let mut rules = self.rules.write().unwrap();
        let before = rules.len();
        rules.retain(|r| r.id != rule_id);
        before != rules.len()
    }

    pub fn enable_rule(&self, rule_id: &str) -> bool {
        self.set_rule_enabled(rule_id, true)
    }

    pub fn disable_rule(&self, rule_id: &str) -> bool {
        self.set_rule_enabled(rule_id, false)
    }

    /// Enable every rule of a gate. Returns how many rules belong to it.
    pub fn enable_gate(&self, gate: GateCategory) -> usize {
        self.set_gate_enabled(gate, true)
    }

    /// Disable every rule of a gate. Returns how many rules belong to it.
    pub fn disable_gate(&self, gate: GateCategory) -> usize {
        self.set_gate_enabled(gate, false)
    }

    /// Summaries of every registered rule, in registration order.
    pub fn rules(&self) -> Vec<RuleSummary> {
        self.rules.read().unwrap().iter().map(ValidationRule::summary).collect()
    }

    /// Run one rule.
    ///
    /// Returns `None` for an unknown or disabled rule. A rule with a
    /// disabled dependency yields a `skipped` result without running.
    pub fn validate_rule(
        &self,
        rule_id: &str,
        target: Option<&Target>,
        context: Option<&Context>,
    ) -> Option<ValidationResult> {
        // Clone out so the validator runs without the registry lock held.
        let (rule, disabled_dep) = {
            let rules = self.rules.read().unwrap();
            let rule = rules.iter().find(|r| r.id == rule_id)?.clone();
            if !rule.enabled {
                debug!(rule = %rule_id, "Rule disabled, no result");
                return None;
            }
            let disabled_dep = rule
                .dependencies
                .iter()
                .find(|dep| rules.iter().any(|r| &r.id == *dep && !r.enabled))
                .cloned();
            (rule, disabled_dep)
        };

        let result = match disabled_dep {
            Some(dep) => {
                info!(rule = %rule_id, dependency = %dep, "Rule skipped");
                let mut result = ValidationResult::new(
                    rule.gate,
                    GateStatus::Skipped,
                    format!("Skipped due to disabled dependency: {dep}"),
                );
                result.metadata.insert("rule_id".into(), rule_id.into());
                result.metadata.insert("dependency".into(), dep.into());
                result
            }
            None => self.execute(&rule, target, context),
        };

        self.record(result.clone());
        Some(result)
    }

    /// Run every enabled rule of one gate, in registration order.
    pub fn validate_gate(
        &self,
        gate: GateCategory,
        target: Option<&Target>,
        context: Option<&Context>,
    ) -> Vec<ValidationResult> {
        let ids: Vec<String> = self
            .rules
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.gate == gate && r.enabled)
            .map(|r| r.id.clone())
            .collect();

        ids.iter()
            .filter_map(|id| self.validate_rule(id, target, context))
            .collect()
    }

    /// Run every enabled rule, highest priority first, and persist the
    /// results to the memory store.
    pub fn validate_all(
        &self,
        target: Option<&Target>,
        context: Option<&Context>,
    ) -> Vec<ValidationResult> {
        let mut ordered: Vec<(String, i32)> = self
            .rules
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.enabled)
            .map(|r| (r.id.clone(), r.priority))
            .collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1));

        let results: Vec<ValidationResult> = ordered
            .iter()
            .filter_map(|(id, _)| self.validate_rule(id, target, context))
            .collect();

        self.persist(&results);
        let failed = results.iter().filter(|r| r.status == GateStatus::Fail).count();
        info!(total = results.len(), failed, "Validation run complete");
        results
    }

    pub fn stats(&self) -> ValidationStats {
        let history = self.history.read().unwrap();
        let count = |status: GateStatus| history.iter().filter(|r| r.status == status).count();

        let validation_counts_by_gate = GateCategory::ALL
            .into_iter()
            .map(|gate| (gate, history.iter().filter(|r| r.gate == gate).count()))
            .collect();

        ValidationStats {
            total_validations: history.len(),
            pass_count: count(GateStatus::Pass),
            fail_count: count(GateStatus::Fail),
            pending_count: count(GateStatus::Pending),
            skipped_count: count(GateStatus::Skipped),
            validation_counts_by_gate,
            latest_result_timestamp: history.iter().map(|r| r.timestamp).max(),
            timestamp: Utc::now(),
        }
    }

    /// The last `limit` results (oldest first), then filtered by gate.
    pub fn recent_results(&self, gate: Option<GateCategory>, limit: usize) -> Vec<ValidationResult> {
        let history = self.history.read().unwrap();
        let skip = history.len().saturating_sub(limit);
        history
            .iter()
            .skip(skip)
            .filter(|r| gate.is_none_or(|g| r.gate == g))
            .cloned()
            .collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.read().unwrap().len()
    }

    // ── Internal ───────────────────────────────────────────────────

    fn set_rule_enabled(&self, rule_id: &str, enabled: bool) -> bool {
        let mut rules = self.rules.write().unwrap();
        match rules.iter_mut().find(|r| r.id == rule_id) {
            Some(rule) => {
                rule.enabled = enabled;
                true
            }
            None => false,
        }
    }

    fn set_gate_enabled(&self, gate: GateCategory, enabled: bool) -> usize {
        let mut rules = self.rules.write().unwrap();
        let mut touched = 0;
        for rule in rules.iter_mut().filter(|r| r.gate == gate) {
            rule.enabled = enabled;
            touched += 1;
        }
        info!(gate = %gate, enabled, rules = touched, "Gate toggled");
        touched
    }

    fn execute(
        &self,
        rule: &ValidationRule,
        target: Option<&Target>,
        context: Option<&Context>,
    ) -> ValidationResult {
        let empty = Context::new();
        let context = context.unwrap_or(&empty);

        let started = Instant::now();
        let outcome = rule.validator.validate(target, context, rule);
        let elapsed = started.elapsed();

        let mut result = match outcome {
            Ok(outcome) => {
                let mut result = ValidationResult::new(rule.gate, outcome.status, outcome.message);
                result.metadata = outcome.metadata;
                result.errors = outcome.errors;
                result
            }
            Err(e) => {
                error!(rule = %rule.id, error = %e, "Validation rule raised an error");
                let mut result = ValidationResult::new(
                    rule.gate,
                    GateStatus::Fail,
                    format!("Validation rule failed with exception: {e}"),
                );
                result.errors.push(e.to_string());
                result
            }
        };
        result.metadata.insert("rule_id".into(), rule.id.clone().into());
        result
            .metadata
            .insert("elapsed_ms".into(), json!(elapsed.as_millis() as u64));

        if elapsed > rule.timeout {
            let message = format!(
                "Validation rule exceeded timeout of {}s",
                rule.timeout.as_secs()
            );
            warn!(rule = %rule.id, elapsed_ms = elapsed.as_millis() as u64, "{message}");
            result.status = GateStatus::Fail;
            result.message = message.clone();
            result.errors.push(message);
        }

        debug!(rule = %rule.id, status = %result.status, "Rule evaluated");
        result
    }

    fn record(&self, result: ValidationResult) {
        let mut history = self.history.write().unwrap();
        while history.len() >= self.history_limit {
            history.pop_front();
        }
        history.push_back(result);
    }

    fn persist(&self, results: &[ValidationResult]) {
        for result in results {
            let gate = result.gate.as_str();
            let status = result.status.as_str();
            let content = json!({
                "gate": gate,
                "status": status,
                "message": result.message,
                "metadata": Value::Object(result.metadata.clone()),
                "errors": result.errors,
            });
            let entry = MemoryEntry::new(
                format!("validation_{gate}_{}", uuid::Uuid::new_v4()),
                content,
                MemoryType::ShortTerm,
            )
            .with_tags(["validation", gate, status])
            .with_ttl(TimeDelta::hours(RESULT_TTL_HOURS))
            .created_at(result.timestamp);
            self.memory.store(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GateError;
    use crate::model::Outcome;
    use std::time::Duration;

    fn passing(_: Option<&Target>, _: &Context, _: &ValidationRule) -> Result<Outcome, GateError> {
        Ok(Outcome::pass("ok"))
    }

    fn raising(_: Option<&Target>, _: &Context, _: &ValidationRule) -> Result<Outcome, GateError> {
        Err(GateError::Failed("boom".into()))
    }

    fn engine() -> ValidationGates {
        ValidationGates::new(Arc::new(MemoryStore::empty()))
    }

    #[test]
    fn default_rules_are_registered() {
        let gates = ValidationGates::with_default_rules(Arc::new(MemoryStore::empty()));
        let rules = gates.rules();
        assert_eq!(rules.len(), 9);
        assert!(rules.iter().any(|r| r.id == "cross_pillar_integration_check" && r.priority == 10));
    }

    #[test]
    fn duplicate_rule_ids_are_rejected() {
        let gates = engine();
        assert!(gates.add_rule(ValidationRule::new("a", GateCategory::VisionAlignment, passing)));
        assert!(!gates.add_rule(ValidationRule::new("a", GateCategory::SemanticAccuracy, passing)));
        assert!(gates.remove_rule("a"));
        assert!(!gates.remove_rule("a"));
    }

    #[test]
    fn disabled_rule_yields_no_result() {
        let gates = engine();
        gates.add_rule(ValidationRule::new("a", GateCategory::VisionAlignment, passing).disabled());
        assert!(gates.validate_rule("a", None, None).is_none());
        assert!(gates.validate_rule("missing", None, None).is_none());
        assert_eq!(gates.history_len(), 0);
    }

    #[test]
    fn disabled_dependency_skips() {
        let gates = engine();
        gates.add_rule(ValidationRule::new("base", GateCategory::TechnicalValidation, passing).disabled());
        gates.add_rule(
            ValidationRule::new("child", GateCategory::TechnicalValidation, passing).depends_on(["base"]),
        );
        let result = gates.validate_rule("child", None, None).unwrap();
        assert_eq!(result.status, GateStatus::Skipped);
        assert_eq!(result.message, "Skipped due to disabled dependency: base");
        assert_eq!(result.metadata["dependency"], "base");
        assert_eq!(result.rule_id(), Some("child"));
        assert_eq!(gates.history_len(), 1);
    }

    #[test]
    fn unknown_dependency_does_not_skip() {
        let gates = engine();
        gates.add_rule(
            ValidationRule::new("child", GateCategory::TechnicalValidation, passing).depends_on(["ghost"]),
        );
        let result = gates.validate_rule("child", None, None).unwrap();
        assert_eq!(result.status, GateStatus::Pass);
    }

    #[test]
    fn validator_errors_become_failures() {
        let gates = engine();
        gates.add_rule(ValidationRule::new("bad", GateCategory::SemanticAccuracy, raising));
        let result = gates.validate_rule("bad", None, None).unwrap();
        assert_eq!(result.status, GateStatus::Fail);
        assert_eq!(result.message, "Validation rule failed with exception: boom");
        assert_eq!(result.errors, vec!["boom".to_string()]);
        assert!(result.metadata.contains_key("elapsed_ms"));
    }

    #[test]
    fn exceeding_timeout_fails_the_result() {
        let gates = engine();
        let slow = |_: Option<&Target>, _: &Context, _: &ValidationRule| -> Result<Outcome, GateError> {
            std::thread::sleep(Duration::from_millis(20));
            Ok(Outcome::pass("eventually"))
        };
        gates.add_rule(
            ValidationRule::new("slow", GateCategory::PerformanceEfficiency, slow)
                .with_timeout(Duration::from_millis(1)),
        );
        let result = gates.validate_rule("slow", None, None).unwrap();
        assert_eq!(result.status, GateStatus::Fail);
        assert_eq!(result.message, "Validation rule exceeded timeout of 0s");
    }

    #[test]
    fn validate_all_orders_by_priority_and_persists() {
        let memory = Arc::new(MemoryStore::empty());
        let gates = ValidationGates::new(memory.clone());
        gates.add_rule(ValidationRule::new("low", GateCategory::VisionAlignment, passing).with_priority(1));
        gates.add_rule(ValidationRule::new("high", GateCategory::TechnicalValidation, passing).with_priority(9));
        gates.add_rule(ValidationRule::new("off", GateCategory::TechnicalValidation, passing).disabled());
        gates.add_rule(ValidationRule::new("mid", GateCategory::SemanticAccuracy, passing).with_priority(5));

        let results = gates.validate_all(None, None);
        let order: Vec<_> = results.iter().filter_map(|r| r.rule_id()).collect();
        assert_eq!(order, vec!["high", "mid", "low"]);

        let stored = memory.search(&["validation"], Some(MemoryType::ShortTerm));
        assert_eq!(stored.len(), 3);
        assert!(stored.iter().all(|e| e.id.starts_with("validation_")));
        assert!(stored.iter().any(|e| e.has_any_tag(&["technical_validation"])));
        assert!(stored.iter().all(|e| e.ttl == Some(TimeDelta::hours(24))));
    }

    #[test]
    fn validate_gate_runs_only_that_gate() {
        let gates = ValidationGates::with_default_rules(Arc::new(MemoryStore::empty()));
        let results = gates.validate_gate(GateCategory::BehavioralIntegrity, None, None);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.gate == GateCategory::BehavioralIntegrity));
    }

    #[test]
    fn gate_toggling_counts_rules() {
        let gates = ValidationGates::with_default_rules(Arc::new(MemoryStore::empty()));
        assert_eq!(gates.disable_gate(GateCategory::SemanticAccuracy), 2);
        assert!(gates.validate_gate(GateCategory::SemanticAccuracy, None, None).is_empty());
        assert_eq!(gates.enable_gate(GateCategory::SemanticAccuracy), 2);
        assert_eq!(gates.validate_gate(GateCategory::SemanticAccuracy, None, None).len(), 2);
    }

    #[test]
    fn history_is_capped() {
        let gates = engine().with_history_limit(5);
        gates.add_rule(ValidationRule::new("a", GateCategory::VisionAlignment, passing));
        for _ in 0..8 {
            gates.validate_rule("a", None, None);
        }
        assert_eq!(gates.history_len(), 5);
    }

    #[test]
    fn stats_and_recent_results() {
        let gates = engine();
        gates.add_rule(ValidationRule::new("ok", GateCategory::VisionAlignment, passing));
        gates.add_rule(ValidationRule::new("bad", GateCategory::SemanticAccuracy, raising));
        gates.validate_rule("ok", None, None);
        gates.validate_rule("bad", None, None);
        gates.validate_rule("ok", None, None);

        let stats = gates.stats();
        assert_eq!(stats.total_validations, 3);
        assert_eq!(stats.pass_count, 2);
        assert_eq!(stats.fail_count, 1);
        assert_eq!(stats.validation_counts_by_gate[&GateCategory::VisionAlignment], 2);
        assert_eq!(stats.validation_counts_by_gate[&GateCategory::TechnicalValidation], 0);
        assert!(stats.latest_result_timestamp.is_some());

        let recent = gates.recent_results(None, 2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].rule_id(), Some("bad"));
        let vision = gates.recent_results(Some(GateCategory::VisionAlignment), 10);
        assert_eq!(vision.len(), 2);
    }

    #[test]
    fn empty_stats() {
        let stats = engine().stats();
        assert_eq!(stats.total_validations, 0);
        assert!(stats.latest_result_timestamp.is_none());
        assert_eq!(stats.validation_counts_by_gate.len(), 6);
    }
}
