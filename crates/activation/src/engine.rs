//! The activation system.

use crate::model::{ActivationContext, ActivationProfile};
use crate::predictor::FrequencyPredictor;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, json};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info, warn};
use triad_core::{MemoryEntry, MemoryType};
use triad_memory::MemoryStore;

/// Activation records live this long in short-term memory.
const ACTIVATION_RECORD_TTL_HOURS: i64 = 1;

/// Predicted probability a profile needs before prediction lets it activate.
const PREDICTION_THRESHOLD: f64 = 0.5;

/// The seven pillar specialists every system starts with.
pub fn default_profiles() -> Vec<ActivationProfile> {
    use ActivationContext::*;
    vec![
        ActivationProfile::new("infrastructure-architect", "Infrastructure Architect", Technical)
            .with_priority(8),
        ActivationProfile::new("validation-engineer", "Validation Engineer", Technical).with_priority(7),
        ActivationProfile::new("sre-specialist", "SRE Specialist", Technical).with_priority(9),
        ActivationProfile::new("behavioral-architect", "Behavioral Architect", Behavioral)
            .with_priority(8),
        ActivationProfile::new("cognitive-validator", "Cognitive Validator", Behavioral)
            .with_priority(7)
            .depends_on(["behavioral-architect"]),
        ActivationProfile::new("response-coordinator", "Response Coordinator", Behavioral)
            .with_priority(8)
            .depends_on(["behavioral-architect", "cognitive-validator"]),
        ActivationProfile::new("domain-linguist", "Domain Linguist", Semantic).with_priority(9),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationStats {
    pub total_profiles: usize,
    pub active_profiles: usize,
    pub activation_counts_by_context: BTreeMap<ActivationContext, usize>,
    pub timestamp: DateTime<Utc>,
}

/// Holds every registered profile and switches them on and off.
///
/// Thread-safe. Profiles keep their registration order.
pub struct ActivationSystem {
    profiles: RwLock<Vec<ActivationProfile>>,
    memory: Arc<MemoryStore>,
    predictor: Option<Arc<FrequencyPredictor>>,
}

impl ActivationSystem {
    /// A system with no profiles registered.
    pub fn empty(memory: Arc<MemoryStore>) -> Self {
        Self {
            profiles: RwLock::new(Vec::new()),
            memory,
            predictor: None,
        }
    }

    /// A system seeded with [`default_profiles`].
    pub fn new(memory: Arc<MemoryStore>) -> Self {
        let system = Self::empty(memory);
        for profile in default_profiles() {
            system.register_profile(profile);
        }
        system
    }

    /// Report activations to `predictor` and allow prediction-gated
    /// context activation.
    pub fn with_predictor(mut self, predictor: Arc<FrequencyPredictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn predictor(&self) -> Option<&Arc<FrequencyPredictor>> {
        self.predictor.as_ref()
    }

    /// Add a profile. Returns `false` if the id is already taken.
    pub fn register_profile(&self, profile: ActivationProfile) -> bool {
        let mut profiles = self.profiles.write().unwrap();
        if profiles.iter().any(|p| p.id == profile.id) {
            return false;
        }
        debug!(profile = %profile.id, context = %profile.context, "Profile registered");
        profiles.push(profile);
        true
    }

    pub fn profile(&self, profile_id: &str) -> Option<ActivationProfile> {
        self.profiles
            .read()
            .unwrap()
            .iter()
            .find(|p| p.id == profile_id)
            .cloned()
    }

    pub fn profiles(&self) -> Vec<ActivationProfile> {
        self.profiles.read().unwrap().clone()
    }

    /// Attach a deactivation callback to an existing profile.
    pub fn add_callback<F>(&self, profile_id: &str, callback: F) -> bool
    where
        F: Fn() -> Result<(), String> + Send + Sync + 'static,
    {
        let mut profiles = self.profiles.write().unwrap();
        match profiles.iter_mut().find(|p| p.id == profile_id) {
            Some(profile) => {
                profile.callbacks.push(Arc::new(callback));
                true
            }
            None => false,
        }
    }

    /// Activate a profile, optionally for a limited time.
    ///
    /// Fails if the profile is unknown or any dependency is not active.
    /// Dependencies are checked one level deep.
    pub fn activate_profile(&self, profile_id: &str, duration: Option<TimeDelta>) -> bool {
        let (context, priority, activation_time, expiry_time) = {
            let mut profiles = self.profiles.write().unwrap();
            let Some(index) = profiles.iter().position(|p| p.id == profile_id) else {
                warn!(profile = %profile_id, "Cannot activate unknown profile");
                return false;
            };

            let missing = profiles[index]
                .dependencies
                .iter()
                .find(|dep| !profiles.iter().any(|p| &p.id == *dep && p.active))
                .cloned();
            if let Some(dep) = missing {
                warn!(profile = %profile_id, dependency = %dep, "Cannot activate, dependency not active");
                return false;
            }

            let now = Utc::now();
            let profile = &mut profiles[index];
            profile.active = true;
            profile.activation_time = Some(now);
            profile.expiry_time = duration.map(|d| now + d);
            (profile.context, profile.priority, now, profile.expiry_time)
        };

        self.memory.store(
            MemoryEntry::new(
                format!("activation_{profile_id}"),
                json!({
                    "profile_id": profile_id,
                    "activation_time": activation_time,
                    "expiry_time": expiry_time,
                    "context": context,
                    "priority": priority,
                }),
                MemoryType::ShortTerm,
            )
            .with_tags(["activation", context.as_str()])
            .with_ttl(TimeDelta::hours(ACTIVATION_RECORD_TTL_HOURS))
            .created_at(activation_time),
        );
        if let Some(predictor) = &self.predictor {
            predictor.record_activation(profile_id, context, Map::new());
        }

        info!(profile = %profile_id, context = %context, "Profile activated");
        true
    }

    /// Deactivate an active profile and run its callbacks.
    ///
    /// Returns `false` for unknown or already inactive profiles. When
    /// callers race, only the one that flips the flag runs the callbacks.
    /// Profiles that depend on this one stay active.
    pub fn deactivate_profile(&self, profile_id: &str) -> bool {
        let (context, callbacks) = {
            let mut profiles = self.profiles.write().unwrap();
            let Some(profile) = profiles.iter_mut().find(|p| p.id == profile_id && p.active)
            else {
                return false;
            };
            profile.active = false;
            profile.activation_time = None;
            profile.expiry_time = None;
            (profile.context, profile.callbacks.clone())
        };

        for callback in &callbacks {
            if let Err(e) = callback() {
                error!(profile = %profile_id, error = %e, "Deactivation callback failed");
            }
        }

        self.memory.delete(&format!("activation_{profile_id}"), None);
        if let Some(predictor) = &self.predictor {
            predictor.record_deactivation(profile_id, context, Map::new());
        }

        info!(profile = %profile_id, "Profile deactivated");
        true
    }

    pub fn is_active(&self, profile_id: &str) -> bool {
        self.profiles
            .read()
            .unwrap()
            .iter()
            .any(|p| p.id == profile_id && p.active)
    }

    /// Active profiles that have not yet passed their expiry.
    pub fn active_profiles(&self) -> Vec<ActivationProfile> {
        let now = Utc::now();
        self.profiles
            .read()
            .unwrap()
            .iter()
            .filter(|p| p.is_live_at(now))
            .cloned()
            .collect()
    }

    /// Activate every profile of `context`, highest priority first.
    ///
    /// With `use_prediction` and a predictor attached, profiles predicted
    /// below 0.5 are left alone. Returns the ids that were activated.
    pub fn activate_by_context(
        &self,
        context: ActivationContext,
        duration: Option<TimeDelta>,
        use_prediction: bool,
    ) -> Vec<String> {
        let mut candidates: Vec<(String, i32)> = self
            .profiles
            .read()
            .unwrap()
            .iter()
            .filter(|p| p.context == context)
            .map(|p| (p.id.clone(), p.priority))
            .collect();
        candidates.sort_by(|a, b| b.1.cmp(&a.1));

        let predictor = match (use_prediction, &self.predictor) {
            (true, Some(predictor)) => Some(predictor),
            (true, None) => {
                debug!(context = %context, "Prediction requested without a predictor");
                None
            }
            _ => None,
        };
        let conditions = Map::new();

        let mut activated = Vec::new();
        for (id, _) in candidates {
            if let Some(predictor) = predictor {
                let prediction = predictor.predict(&id, context, &conditions);
                if prediction.probability < PREDICTION_THRESHOLD {
                    debug!(profile = %id, probability = prediction.probability, "Prediction skipped profile");
                    continue;
                }
            }
            if self.activate_profile(&id, duration) {
                activated.push(id);
            }
        }
        activated
    }

    /// Deactivate every active profile of `context`.
    pub fn deactivate_by_context(&self, context: ActivationContext) -> Vec<String> {
        let ids: Vec<String> = self
            .profiles
            .read()
            .unwrap()
            .iter()
            .filter(|p| p.context == context && p.active)
            .map(|p| p.id.clone())
            .collect();

        ids.into_iter()
            .filter(|id| self.deactivate_profile(id))
            .collect()
    }

    /// Activate `context` when `condition` names one of its trigger words.
    pub fn trigger_contextual_activation(
        &self,
        context: ActivationContext,
        condition: &str,
    ) -> Vec<String> {
        let condition = condition.trim().to_lowercase();
        if context.trigger_keywords().contains(&condition.as_str()) {
            self.activate_by_context(context, None, false)
        } else {
            debug!(context = %context, condition = %condition, "No activation trigger matched");
            Vec::new()
        }
    }

    /// Deactivate every profile past its expiry. Returns their ids.
    pub fn cleanup_expired(&self) -> Vec<String> {
        let now = Utc::now();
        let expired: Vec<String> = self
            .profiles
            .read()
            .unwrap()
            .iter()
            .filter(|p| p.is_expired_at(now))
            .map(|p| p.id.clone())
            .collect();

        expired
            .into_iter()
            .filter(|id| self.deactivate_profile(id))
            .collect()
    }

    pub fn stats(&self) -> ActivationStats {
        self.cleanup_expired();
        let active = self.active_profiles();
        let activation_counts_by_context = ActivationContext::ALL
            .into_iter()
            .map(|ctx| (ctx, active.iter().filter(|p| p.context == ctx).count()))
            .collect();

        ActivationStats {
            total_profiles: self.profiles.read().unwrap().len(),
            active_profiles: active.len(),
            activation_counts_by_context,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn system() -> (ActivationSystem, Arc<MemoryStore>) {
        let memory = Arc::new(MemoryStore::empty());
        (ActivationSystem::new(memory.clone()), memory)
    }

    #[test]
    fn default_profiles_are_registered() {
        let (system, _) = system();
        assert_eq!(system.profiles().len(), 7);
        assert!(!system.register_profile(ActivationProfile::new(
            "domain-linguist",
            "Duplicate",
            ActivationContext::Semantic
        )));
    }

    #[test]
    fn missing_dependency_blocks_activation() {
        let (system, _) = system();
        assert!(!system.activate_profile("cognitive-validator", None));
        assert!(!system.is_active("cognitive-validator"));
        assert!(!system.activate_profile("nobody", None));
    }

    #[test]
    fn deactivating_a_dependency_does_not_cascade() {
        let (system, _) = system();
        assert!(system.activate_profile("behavioral-architect", None));
        assert!(system.activate_profile("cognitive-validator", None));
        assert!(system.deactivate_profile("behavioral-architect"));
        assert!(system.is_active("cognitive-validator"));
    }

    #[test]
    fn activation_is_recorded_in_memory() {
        let (system, memory) = system();
        system.activate_profile("domain-linguist", None);
        let entry = memory.retrieve("activation_domain-linguist", None).unwrap();
        assert_eq!(entry.content["context"], "semantic");
        assert!(entry.has_any_tag(&["activation"]));

        system.deactivate_profile("domain-linguist");
        assert!(memory.retrieve("activation_domain-linguist", None).is_none());
        assert!(!system.deactivate_profile("domain-linguist"));
    }

    #[test]
    fn failing_callback_does_not_stop_others() {
        let (system, _) = system();
        let calls = Arc::new(AtomicUsize::new(0));
        system.add_callback("sre-specialist", || Err("boom".to_string()));
        let counter = calls.clone();
        system.add_callback("sre-specialist", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        system.activate_profile("sre-specialist", None);
        assert!(system.deactivate_profile("sre-specialist"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!system.add_callback("nobody", || Ok(())));
    }

    #[test]
    fn context_activation_follows_priority() {
        let (system, _) = system();
        let activated = system.activate_by_context(ActivationContext::Technical, None, false);
        assert_eq!(
            activated,
            vec!["sre-specialist", "infrastructure-architect", "validation-engineer"]
        );
        assert_eq!(
            system.deactivate_by_context(ActivationContext::Technical).len(),
            3
        );
    }

    #[test]
    fn behavioral_chain_activates_in_dependency_order() {
        let (system, _) = system();
        let activated = system.activate_by_context(ActivationContext::Behavioral, None, false);
        // response-coordinator (8) is tried before cognitive-validator (7) is up.
        assert_eq!(activated, vec!["behavioral-architect", "cognitive-validator"]);
        assert!(system.activate_profile("response-coordinator", None));
    }

    #[test]
    fn expired_profiles_are_cleaned_up() {
        let (system, _) = system();
        system.activate_profile("domain-linguist", Some(TimeDelta::milliseconds(-1)));
        assert!(system.active_profiles().is_empty());
        assert_eq!(system.cleanup_expired(), vec!["domain-linguist"]);
        assert!(!system.is_active("domain-linguist"));
    }

    #[test]
    fn concurrent_deactivation_runs_callbacks_once() {
        let memory = Arc::new(MemoryStore::empty());
        let predictor = Arc::new(FrequencyPredictor::new(memory.clone()));
        let system = Arc::new(ActivationSystem::new(memory).with_predictor(predictor.clone()));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        system.add_callback("domain-linguist", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        for _ in 0..20 {
            assert!(system.activate_profile("domain-linguist", None));
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let system = system.clone();
                    std::thread::spawn(move || system.deactivate_profile("domain-linguist"))
                })
                .collect();
            let winners = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|deactivated| *deactivated)
                .count();
            assert_eq!(winners, 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 20);
        // One positive and one negative sample per round.
        assert_eq!(predictor.history_len(), 40);
    }

    #[test]
    fn stats_clean_up_expired_profiles_first() {
        let (system, _) = system();
        system.activate_profile("domain-linguist", Some(TimeDelta::milliseconds(-1)));
        assert!(system.is_active("domain-linguist"));

        let stats = system.stats();
        assert!(!system.is_active("domain-linguist"));
        assert_eq!(stats.active_profiles, 0);
        assert_eq!(stats.activation_counts_by_context[&ActivationContext::Semantic], 0);
    }

    #[test]
    fn stats_count_active_by_context() {
        let (system, _) = system();
        system.activate_profile("domain-linguist", None);
        system.activate_profile("sre-specialist", None);
        let stats = system.stats();
        assert_eq!(stats.total_profiles, 7);
        assert_eq!(stats.active_profiles, 2);
        assert_eq!(stats.activation_counts_by_context[&ActivationContext::Semantic], 1);
        assert_eq!(stats.activation_counts_by_context[&ActivationContext::Integration], 0);
    }

    #[test]
    fn trigger_words_activate_context() {
        let (system, _) = system();
        assert!(system
            .trigger_contextual_activation(ActivationContext::Semantic, "weather")
            .is_empty());
        assert_eq!(
            system.trigger_contextual_activation(ActivationContext::Semantic, "Ontology"),
            vec!["domain-linguist"]
        );
    }

    #[test]
    fn prediction_gates_context_activation() {
        let memory = Arc::new(MemoryStore::empty());
        let predictor = Arc::new(FrequencyPredictor::new(memory.clone()));
        let system = ActivationSystem::new(memory).with_predictor(predictor.clone());

        // Untrained baseline is 0.5, so everything in the context activates.
        let activated = system.activate_by_context(ActivationContext::Technical, None, true);
        assert_eq!(activated.len(), 3);

        // Teach the predictor that validation-engineer is usually switched off.
        for _ in 0..3 {
            system.deactivate_profile("validation-engineer");
            predictor.record_deactivation("validation-engineer", ActivationContext::Technical, Map::new());
        }
        system.deactivate_by_context(ActivationContext::Technical);
        assert!(predictor.train());

        let activated = system.activate_by_context(ActivationContext::Technical, None, true);
        assert!(!activated.contains(&"validation-engineer".to_string()));
        assert!(activated.contains(&"sre-specialist".to_string()));
    }
}
