//! Frequency-based activation predictor.
//!
//! Not a learned model: "training" counts, per (profile, context), how many
//! recorded events were activations, and prediction looks that ratio up.

use crate::model::ActivationContext;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};
use triad_core::{MemoryEntry, MemoryType};
use triad_memory::MemoryStore;

/// Retrain after every this many recorded events.
pub const RETRAIN_EVERY: usize = 10;

/// `train` refuses to run on fewer records.
pub const MIN_TRAINING_RECORDS: usize = 5;

const BASELINE_PROBABILITY: f64 = 0.5;
const UNSEEN_CONFIDENCE: f64 = 0.5;
const MAX_CONFIDENCE: f64 = 0.95;
const FULL_CONFIDENCE_SAMPLES: f64 = 20.0;
const RECORD_TTL_DAYS: i64 = 30;

const TAG: &str = "ml_prediction";
const HISTORY_TAG: &str = "history";

/// Label for the kind of model in use. Only frequency counting is
/// implemented whatever the label says.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    #[default]
    LinearRegression,
    DecisionTree,
    RandomForest,
    NeuralNetwork,
    Ensemble,
}

/// One observed activation or deactivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationRecord {
    pub profile_id: String,
    pub context: ActivationContext,
    #[serde(default)]
    pub conditions: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
    pub was_activated: bool,
}

/// Learned ratio for one (profile, context) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternStats {
    pub probability: f64,
    pub activation_count: usize,
    pub total_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationPrediction {
    pub profile_id: String,
    pub probability: f64,
    pub confidence: f64,
    pub context: ActivationContext,
    pub predicted_at: DateTime<Utc>,
    pub model_used: ModelType,
}

#[derive(Default)]
struct State {
    history: Vec<ActivationRecord>,
    patterns: HashMap<String, HashMap<ActivationContext, PatternStats>>,
    trained: bool,
}

/// Thread-safe frequency predictor backed by the memory store.
pub struct FrequencyPredictor {
    state: RwLock<State>,
    model_type: ModelType,
    memory: Arc<MemoryStore>,
}

impl FrequencyPredictor {
    /// Create a predictor, reloading any history already in `memory`.
    pub fn new(memory: Arc<MemoryStore>) -> Self {
        let predictor = Self {
            state: RwLock::new(State::default()),
            model_type: ModelType::default(),
            memory,
        };
        predictor.load_history();
        predictor
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    pub fn is_trained(&self) -> bool {
        self.state.read().unwrap().trained
    }

    pub fn history_len(&self) -> usize {
        self.state.read().unwrap().history.len()
    }

    pub fn record_activation(
        &self,
        profile_id: &str,
        context: ActivationContext,
        conditions: Map<String, Value>,
    ) {
        self.record(profile_id, context, conditions, true);
    }

    pub fn record_deactivation(
        &self,
        profile_id: &str,
        context: ActivationContext,
        conditions: Map<String, Value>,
    ) {
        self.record(profile_id, context, conditions, false);
    }

    /// Rebuild the ratio table from the full history.
    ///
    /// Returns `false` (and leaves the model untouched) with fewer than
    /// [`MIN_TRAINING_RECORDS`] records.
    pub fn train(&self) -> bool {
        let mut state = self.state.write().unwrap();
        if state.history.len() < MIN_TRAINING_RECORDS {
            info!(records = state.history.len(), "Not enough data to train prediction model yet");
            return false;
        }

        let mut counts: HashMap<(String, ActivationContext), (usize, usize)> = HashMap::new();
        for record in &state.history {
            let slot = counts
                .entry((record.profile_id.clone(), record.context))
                .or_default();
            slot.1 += 1;
            if record.was_activated {
                slot.0 += 1;
            }
        }

        let mut patterns: HashMap<String, HashMap<ActivationContext, PatternStats>> = HashMap::new();
        for ((profile_id, context), (activated, total)) in counts {
            patterns.entry(profile_id).or_default().insert(
                context,
                PatternStats {
                    probability: activated as f64 / total as f64,
                    activation_count: activated,
                    total_count: total,
                },
            );
        }
        state.patterns = patterns;
        state.trained = true;

        let records = state.history.len();
        let snapshot = json!({
            "model_type": self.model_type,
            "training_records_count": records,
            "training_timestamp": Utc::now(),
            "context_patterns": state.patterns,
        });
        drop(state);

        self.memory.store(
            MemoryEntry::new(
                format!("prediction_model_{}", uuid::Uuid::new_v4()),
                snapshot,
                MemoryType::LongTerm,
            )
            .with_tags([TAG, "model", "trained"])
            .with_ttl(TimeDelta::days(RECORD_TTL_DAYS)),
        );
        info!(records, "Prediction model trained");
        true
    }

    pub fn predict(
        &self,
        profile_id: &str,
        context: ActivationContext,
        conditions: &Map<String, Value>,
    ) -> ActivationPrediction {
        let state = self.state.read().unwrap();
        if !state.trained {
            return ActivationPrediction {
                profile_id: profile_id.to_string(),
                probability: BASELINE_PROBABILITY,
                confidence: 0.0,
                context,
                predicted_at: Utc::now(),
                model_used: self.model_type,
            };
        }
        let (mut probability, confidence) =
            match state.patterns.get(profile_id).and_then(|p| p.get(&context)) {
                Some(pattern) => (
                    pattern.probability,
                    (pattern.total_count as f64 / FULL_CONFIDENCE_SAMPLES).min(MAX_CONFIDENCE),
                ),
                None => (BASELINE_PROBABILITY, UNSEEN_CONFIDENCE),
            };
        drop(state);

        // Conditions only adjust a trained model's estimate.
        let priority = conditions
            .get("priority")
            .map(triad_core::target::as_text)
            .unwrap_or_default()
            .to_lowercase();
        if priority.contains("urgent") {
            probability = (probability * 1.5).min(1.0);
        } else if priority.contains("low_priority") {
            probability = (probability * 0.7).max(0.0);
        }

        ActivationPrediction {
            profile_id: profile_id.to_string(),
            probability,
            confidence,
            context,
            predicted_at: Utc::now(),
            model_used: self.model_type,
        }
    }

    /// Predict for each profile id, most likely first.
    pub fn predict_for_context<S: AsRef<str>>(
        &self,
        context: ActivationContext,
        profile_ids: &[S],
        conditions: &Map<String, Value>,
    ) -> Vec<ActivationPrediction> {
        let mut predictions: Vec<_> = profile_ids
            .iter()
            .map(|id| self.predict(id.as_ref(), context, conditions))
            .collect();
        predictions.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        predictions
    }

    /// The learned table entry for a pair, if trained and seen.
    pub fn pattern(&self, profile_id: &str, context: ActivationContext) -> Option<PatternStats> {
        self.state
            .read()
            .unwrap()
            .patterns
            .get(profile_id)
            .and_then(|p| p.get(&context))
            .copied()
    }

    // ── Internal ───────────────────────────────────────────────────

    fn record(
        &self,
        profile_id: &str,
        context: ActivationContext,
        conditions: Map<String, Value>,
        was_activated: bool,
    ) {
        let record = ActivationRecord {
            profile_id: profile_id.to_string(),
            context,
            conditions,
            timestamp: Utc::now(),
            was_activated,
        };
        let kind = if was_activated { "activation" } else { "deactivation" };

        match serde_json::to_value(&record) {
            Ok(content) => self.memory.store(
                MemoryEntry::new(
                    format!("{kind}_record_{profile_id}_{}", uuid::Uuid::new_v4()),
                    content,
                    MemoryType::LongTerm,
                )
                .with_tags([TAG, kind, HISTORY_TAG])
                .with_ttl(TimeDelta::days(RECORD_TTL_DAYS))
                .created_at(record.timestamp),
            ),
            Err(e) => warn!(profile = %profile_id, error = %e, "Could not persist activation record"),
        }

        let len = {
            let mut state = self.state.write().unwrap();
            state.history.push(record);
            state.history.len()
        };
        debug!(profile = %profile_id, context = %context, kind, records = len, "Activation event recorded");

        if len % RETRAIN_EVERY == 0 {
            self.train();
        }
    }

    fn load_history(&self) {
        let mut records: Vec<ActivationRecord> = self
            .memory
            .search(&[TAG], Some(MemoryType::LongTerm))
            .into_iter()
            .filter(|e| e.has_any_tag(&[HISTORY_TAG]) && e.content.get("profile_id").is_some())
            .filter_map(|e| serde_json::from_value(e.content).ok())
            .collect();
        records.sort_by_key(|r| r.timestamp);

        let mut state = self.state.write().unwrap();
        state.history = records;
        info!(records = state.history.len(), "Loaded activation history for prediction");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn predictor() -> FrequencyPredictor {
        FrequencyPredictor::new(Arc::new(MemoryStore::empty()))
    }

    fn none() -> Map<String, Value> {
        Map::new()
    }

    /// Three activations and one deactivation of ("x", technical), padded
    /// with other profiles to `total` events.
    fn seed(p: &FrequencyPredictor, total: usize) {
        for _ in 0..3 {
            p.record_activation("x", ActivationContext::Technical, none());
        }
        p.record_deactivation("x", ActivationContext::Technical, none());
        for i in 4..total {
            p.record_activation(&format!("other-{i}"), ActivationContext::Semantic, none());
        }
    }

    #[test]
    fn untrained_predictor_returns_baseline() {
        let p = predictor();
        seed(&p, 9);
        assert!(!p.is_trained());
        let prediction = p.predict("x", ActivationContext::Technical, &none());
        assert_eq!(prediction.probability, 0.5);
        assert_eq!(prediction.confidence, 0.0);
    }

    #[test]
    fn untrained_predictor_ignores_priority_conditions() {
        let p = predictor();
        p.record_activation("x", ActivationContext::Technical, none());
        assert!(!p.is_trained());

        let mut urgent = Map::new();
        urgent.insert("priority".into(), Value::from("urgent"));
        let prediction = p.predict("x", ActivationContext::Technical, &urgent);
        assert_eq!(prediction.probability, 0.5);
        assert_eq!(prediction.confidence, 0.0);

        let mut low = Map::new();
        low.insert("priority".into(), Value::from("low_priority"));
        assert_eq!(p.predict("x", ActivationContext::Technical, &low).probability, 0.5);
    }

    #[test]
    fn tenth_event_retrains_with_empirical_ratio() {
        let p = predictor();
        seed(&p, 10);
        assert!(p.is_trained());
        let prediction = p.predict("x", ActivationContext::Technical, &none());
        assert!((prediction.probability - 0.75).abs() < 1e-9);
        assert!((prediction.confidence - 0.2).abs() < 1e-9);

        let pattern = p.pattern("x", ActivationContext::Technical).unwrap();
        assert_eq!(pattern.activation_count, 3);
        assert_eq!(pattern.total_count, 4);
    }

    #[test]
    fn unseen_pair_after_training() {
        let p = predictor();
        seed(&p, 10);
        let prediction = p.predict("nobody", ActivationContext::Behavioral, &none());
        assert_eq!(prediction.probability, 0.5);
        assert_eq!(prediction.confidence, 0.5);
    }

    #[test]
    fn train_needs_minimum_records() {
        let p = predictor();
        seed(&p, 4);
        assert!(!p.train());
        p.record_activation("y", ActivationContext::Integration, none());
        assert!(p.train());
    }

    #[test]
    fn priority_conditions_adjust_probability() {
        let p = predictor();
        seed(&p, 10);
        let mut urgent = none();
        urgent.insert("priority".into(), "URGENT".into());
        let prediction = p.predict("x", ActivationContext::Technical, &urgent);
        assert_eq!(prediction.probability, 1.0);

        let mut low = none();
        low.insert("priority".into(), "low_priority".into());
        let prediction = p.predict("x", ActivationContext::Technical, &low);
        assert!((prediction.probability - 0.525).abs() < 1e-9);
    }

    #[test]
    fn context_predictions_are_sorted() {
        let p = predictor();
        seed(&p, 10);
        let predictions = p.predict_for_context(ActivationContext::Technical, &["nobody", "x"], &none());
        assert_eq!(predictions[0].profile_id, "x");
        assert_eq!(predictions[1].profile_id, "nobody");
    }

    #[test]
    fn history_survives_in_memory() {
        let memory = Arc::new(MemoryStore::empty());
        let first = FrequencyPredictor::new(memory.clone());
        first.record_activation("x", ActivationContext::Technical, none());
        first.record_deactivation("x", ActivationContext::Technical, none());
        first.record_activation("y", ActivationContext::Semantic, none());

        let second = FrequencyPredictor::new(memory.clone());
        assert_eq!(second.history_len(), 3);

        let records = memory.search(&["history"], Some(MemoryType::LongTerm));
        assert!(records.iter().any(|e| e.id.starts_with("deactivation_record_x_")));
    }

    #[test]
    fn training_stores_a_model_snapshot() {
        let memory = Arc::new(MemoryStore::empty());
        let p = FrequencyPredictor::new(memory.clone());
        seed(&p, 10);
        let models = memory.search(&["model"], Some(MemoryType::LongTerm));
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].content["training_records_count"], 10);
        assert_eq!(models[0].content["model_type"], "linear_regression");
    }
}
