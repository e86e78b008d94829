//! The integration layer: one shared set of stores, gates and pillar
//! managers, plus the cross-pillar operations built on top of them.

use crate::event::{EventBus, IntegrationEvent, IntegrationEventType};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use triad_activation::{ActivationContext, ActivationProfile, ActivationStats, ActivationSystem, FrequencyPredictor};
use triad_config::Settings;
use triad_core::target::as_text;
use triad_core::{MemoryEntry, MemoryType, Result, Target};
use triad_gates::{GateCategory, ValidationGates, ValidationResult, ValidationStats};
use triad_memory::MemoryStore;
use triad_pillars::PillarServices;
use triad_pillars::behavioral::{
    BehavioralArchitect, BehavioralReport, CognitiveReport, CognitiveValidator, Coordination,
    CoordinationReport, DEFAULT_PROTOCOL, ResponseCoordinator,
};
use triad_pillars::semantic::{DomainLinguist, SemanticBridge, SemanticReport};
use triad_pillars::technical::{
    GateSummary, InfrastructureArchitect, InfrastructureReport, InfrastructureStatus, SreDashboard,
    SreSpecialist, ValidationEngineer,
};

pub const INTEGRATED_PROFILING: &str = "integrated_profiling";
pub const CROSS_PILLAR_VALIDATION: &str = "cross_pillar_validation";

const DEFAULT_FRAMEWORK: &str = "autogen";
const DEFAULT_EXPECTED_CONCEPT: &str = "general_term";

// Integration score weights.
const TECHNICAL_WEIGHT: f64 = 0.4;
const BEHAVIORAL_WEIGHT: f64 = 0.3;
const SEMANTIC_WEIGHT: f64 = 0.2;
const ALIGNMENT_WEIGHT: f64 = 0.1;

/// Status and message of one pillar check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusMessage {
    pub status: String,
    pub message: String,
}

impl From<&ValidationResult> for StatusMessage {
    fn from(result: &ValidationResult) -> Self {
        Self {
            status: result.status.to_string(),
            message: result.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TechnicalProfile {
    pub infrastructure: InfrastructureStatus,
    pub validation_tests: Vec<GateSummary>,
    pub sre_metrics: SreDashboard,
    pub timestamp: DateTime<Utc>,
}

impl TechnicalProfile {
    pub fn passed_tests(&self) -> usize {
        self.validation_tests.iter().filter(|t| t.status == "pass").count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BehavioralProfile {
    pub behavioral_consistency: StatusMessage,
    pub methodology_adherence: StatusMessage,
    pub cognitive_patterns: StatusMessage,
    pub response_coordination: Coordination,
    pub timestamp: DateTime<Utc>,
}

/// The semantic bridge, or what was left when building it failed.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BridgeOutcome {
    Built(SemanticBridge),
    Fallback { error: String, fallback: String },
}

impl BridgeOutcome {
    pub fn bridge(&self) -> Option<&SemanticBridge> {
        match self {
            Self::Built(bridge) => Some(bridge),
            Self::Fallback { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HallucinationOutcome {
    pub success: bool,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SemanticProfile {
    pub semantic_bridge: BridgeOutcome,
    pub mapping_validation: StatusMessage,
    pub hallucination_prevention: HallucinationOutcome,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrossPillarValidation {
    pub alignment_issues: Vec<String>,
    pub technical_results_count: usize,
    pub semantic_intents_count: usize,
    pub timestamp: DateTime<Utc>,
}

/// Everything one integrated profiling run produced.
#[derive(Debug, Clone, Serialize)]
pub struct IntegratedProfile {
    pub input: Target,
    pub technical_pillar: TechnicalProfile,
    pub behavioral_pillar: BehavioralProfile,
    pub semantic_pillar: SemanticProfile,
    pub cross_pillar_validation: CrossPillarValidation,
    pub integration_score: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TechnicalMetrics {
    pub activation_stats: ActivationStats,
    pub validation_stats: ValidationStats,
    pub infrastructure_report: InfrastructureReport,
    pub sre_dashboard: SreDashboard,
}

#[derive(Debug, Clone, Serialize)]
pub struct BehavioralMetrics {
    pub cognitive_report: CognitiveReport,
    pub patterns_report: BehavioralReport,
    pub coordination_report: CoordinationReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct SemanticMetrics {
    pub semantic_report: SemanticReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerMetrics {
    pub active_events: usize,
    pub last_event_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnifiedReport {
    pub technical_pillar: TechnicalMetrics,
    pub behavioral_pillar: BehavioralMetrics,
    pub semantic_pillar: SemanticMetrics,
    pub integration_layer: LayerMetrics,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardOverview {
    pub total_integrated_events: usize,
    pub last_integration_time: Option<DateTime<Utc>>,
    pub active_pillars: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PillarHealth {
    /// `healthy` or `degraded`.
    pub status: String,
    pub components_monitored: usize,
    pub last_validation: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PillarHealthMap {
    pub technical: PillarHealth,
    pub behavioral: PillarHealth,
    pub semantic: PillarHealth,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrationMetrics {
    pub cross_pillar_validations: usize,
    pub unified_monitoring_runs: usize,
    pub coordination_events: usize,
    pub integration_validations: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrationDashboard {
    pub overview: DashboardOverview,
    pub pillar_health: PillarHealthMap,
    pub integration_metrics: IntegrationMetrics,
}

/// Owns the shared services and all seven pillar managers.
///
/// Every operation runs to completion on the calling thread. Nothing here
/// is transactional: a technical or behavioral error aborts a profiling run
/// after earlier steps have already written to memory.
pub struct IntegrationLayer {
    services: PillarServices,
    activation: Arc<ActivationSystem>,
    infrastructure: InfrastructureArchitect,
    validation: ValidationEngineer,
    sre: SreSpecialist,
    architect: BehavioralArchitect,
    cognitive: CognitiveValidator,
    coordinator: ResponseCoordinator,
    linguist: DomainLinguist,
    events: RwLock<Vec<IntegrationEvent>>,
    bus: EventBus,
}

impl IntegrationLayer {
    /// Build the memory store, gates, activation system and managers from
    /// `settings`, and register the integration profiles.
    pub fn new(settings: Arc<Settings>) -> Self {
        let memory = Arc::new(MemoryStore::new());
        let gates = Arc::new(ValidationGates::with_default_rules(memory.clone()));
        let predictor = Arc::new(FrequencyPredictor::new(memory.clone()));
        let activation = Arc::new(ActivationSystem::new(memory.clone()).with_predictor(predictor));
        Self::with_services(PillarServices::new(settings, memory, gates), activation)
    }

    pub fn with_services(services: PillarServices, activation: Arc<ActivationSystem>) -> Self {
        let layer = Self {
            infrastructure: InfrastructureArchitect::new(services.clone()),
            validation: ValidationEngineer::new(services.clone()),
            sre: SreSpecialist::new(services.clone()),
            architect: BehavioralArchitect::new(services.clone()),
            cognitive: CognitiveValidator::new(services.clone()),
            coordinator: ResponseCoordinator::new(services.clone()),
            linguist: DomainLinguist::new(services.clone()),
            services,
            activation,
            events: RwLock::new(Vec::new()),
            bus: EventBus::default(),
        };
        layer.register_integration_profiles();
        layer
    }

    pub fn settings(&self) -> &Settings {
        &self.services.settings
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.services.memory
    }

    pub fn gates(&self) -> &Arc<ValidationGates> {
        &self.services.gates
    }

    pub fn activation(&self) -> &Arc<ActivationSystem> {
        &self.activation
    }

    pub fn infrastructure_architect(&self) -> &InfrastructureArchitect {
        &self.infrastructure
    }

    pub fn validation_engineer(&self) -> &ValidationEngineer {
        &self.validation
    }

    pub fn sre_specialist(&self) -> &SreSpecialist {
        &self.sre
    }

    pub fn behavioral_architect(&self) -> &BehavioralArchitect {
        &self.architect
    }

    pub fn cognitive_validator(&self) -> &CognitiveValidator {
        &self.cognitive
    }

    pub fn response_coordinator(&self) -> &ResponseCoordinator {
        &self.coordinator
    }

    pub fn domain_linguist(&self) -> &DomainLinguist {
        &self.linguist
    }

    /// Every event logged so far, oldest first.
    pub fn events(&self) -> Vec<IntegrationEvent> {
        self.events.read().unwrap().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<IntegrationEvent>> {
        self.bus.subscribe()
    }

    /// Run all three pillars against `target`, cross-check them and score
    /// the result.
    ///
    /// Semantic steps degrade to fallback values on error; technical and
    /// behavioral errors propagate. The `integrated_profiling` profile is
    /// deactivated on every path.
    pub fn execute_integrated_profiling(&self, target: &Target) -> Result<IntegratedProfile> {
        self.activation.activate_profile(INTEGRATED_PROFILING, None);
        let outcome = self.run_profiling(target);
        self.activation.deactivate_profile(INTEGRATED_PROFILING);
        outcome
    }

    pub fn unified_monitoring(&self) -> Result<UnifiedReport> {
        let (active_events, last_event_time) = {
            let events = self.events.read().unwrap();
            (events.len(), events.last().map(|e| e.timestamp))
        };

        let report = UnifiedReport {
            technical_pillar: TechnicalMetrics {
                activation_stats: self.activation.stats(),
                validation_stats: self.services.gates.stats(),
                infrastructure_report: self.infrastructure.infrastructure_report(),
                sre_dashboard: self.sre.dashboard(),
            },
            behavioral_pillar: BehavioralMetrics {
                cognitive_report: self.cognitive.cognitive_report(),
                patterns_report: self.architect.behavioral_report(),
                coordination_report: self.coordinator.coordination_report(),
            },
            semantic_pillar: SemanticMetrics {
                semantic_report: self.linguist.semantic_report(),
            },
            integration_layer: LayerMetrics {
                active_events,
                last_event_time,
            },
            timestamp: Utc::now(),
        };

        let content = serde_json::to_value(&report)?;
        let report_size = content.to_string().len();
        self.store(
            "unified_monitoring",
            content,
            ["integration", "monitoring", "unified"],
            self.services.settings.ttl(5),
        );
        self.log_event(
            IntegrationEventType::UnifiedMonitoring,
            "Unified monitoring executed",
            json!({ "report_size": report_size }),
        );
        Ok(report)
    }

    pub fn integration_dashboard(&self) -> IntegrationDashboard {
        let events = self.events.read().unwrap();
        let count = |kind: IntegrationEventType| events.iter().filter(|e| e.event_type == kind).count();

        let technical_degraded = !self.sre.active_incidents().is_empty();
        let behavioral_degraded = !self.cognitive.cognitive_report().drifts.current.is_empty();

        IntegrationDashboard {
            overview: DashboardOverview {
                total_integrated_events: events.len(),
                last_integration_time: events.last().map(|e| e.timestamp),
                active_pillars: 3,
                timestamp: Utc::now(),
            },
            pillar_health: PillarHealthMap {
                technical: self.health(technical_degraded, 3, GateCategory::TechnicalValidation),
                behavioral: self.health(behavioral_degraded, 3, GateCategory::BehavioralIntegrity),
                semantic: self.health(false, 1, GateCategory::SemanticAccuracy),
            },
            integration_metrics: IntegrationMetrics {
                cross_pillar_validations: count(IntegrationEventType::CrossPillarCommunication),
                unified_monitoring_runs: count(IntegrationEventType::UnifiedMonitoring),
                coordination_events: count(IntegrationEventType::CoordinationEvent),
                integration_validations: count(IntegrationEventType::IntegrationValidation),
            },
        }
    }

    /// Activate every profile of `context`; the integration context also
    /// tries both integration profiles. Returns what `activate_by_context`
    /// switched on.
    pub fn trigger_synergy_activation(&self, context: ActivationContext) -> Vec<String> {
        self.log_event(
            IntegrationEventType::CoordinationEvent,
            format!("Synergy activation triggered for context: {context}"),
            json!({ "context": context.as_str() }),
        );

        let activated = self.activation.activate_by_context(context, None, false);
        if context == ActivationContext::Integration {
            self.activation.activate_profile(INTEGRATED_PROFILING, None);
            self.activation.activate_profile(CROSS_PILLAR_VALIDATION, None);
        }
        info!(context = %context, activated = activated.len(), "Synergy activation");
        activated
    }

    // ── Internal ────────────────────────────────────────────

    fn register_integration_profiles(&self) {
        let profiles = [
            ActivationProfile::new(INTEGRATED_PROFILING, "Integrated Profiling", ActivationContext::Integration)
                .with_priority(10)
                .depends_on([
                    "infrastructure-architect",
                    "validation-engineer",
                    "sre-specialist",
                    "behavioral-architect",
                    "cognitive-validator",
                    "response-coordinator",
                    "domain-linguist",
                ]),
            ActivationProfile::new(
                CROSS_PILLAR_VALIDATION,
                "Cross-Pillar Validation",
                ActivationContext::Integration,
            )
            .with_priority(9)
            .depends_on(["validation-engineer", "cognitive-validator", "domain-linguist"]),
        ];
        for profile in profiles {
            if !self.activation.register_profile(profile) {
                debug!("Integration profile already registered");
            }
        }
    }

    fn run_profiling(&self, target: &Target) -> Result<IntegratedProfile> {
        let technical_pillar = self.technical_profile(target)?;
        let behavioral_pillar = self.behavioral_profile(target)?;
        let semantic_pillar = self.semantic_profile(target);
        let cross_pillar_validation = self.cross_pillar_validation(&technical_pillar, &semantic_pillar);
        let integration_score = integration_score(&technical_pillar, &semantic_pillar, &cross_pillar_validation);

        let profile = IntegratedProfile {
            input: target.clone(),
            technical_pillar,
            behavioral_pillar,
            semantic_pillar,
            cross_pillar_validation,
            integration_score,
            timestamp: Utc::now(),
        };

        let content = serde_json::to_value(&profile)?;
        self.store(
            "integrated_profiling",
            content.clone(),
            ["integration", "profiling", "comprehensive"],
            self.services.settings.ttl(20),
        );
        self.log_event(
            IntegrationEventType::IntegrationValidation,
            "Integrated profiling executed",
            json!({ "target": target, "results": content }),
        );
        info!(score = integration_score, "Integrated profiling complete");
        Ok(profile)
    }

    fn technical_profile(&self, target: &Target) -> Result<TechnicalProfile> {
        let infrastructure = self.infrastructure.validate_infrastructure(Some(target))?;
        let validation_tests = self
            .validation
            .run_all_tests(Some(target))?
            .iter()
            .map(GateSummary::from)
            .collect();
        Ok(TechnicalProfile {
            infrastructure,
            validation_tests,
            sre_metrics: self.sre.dashboard(),
            timestamp: Utc::now(),
        })
    }

    fn behavioral_profile(&self, target: &Target) -> Result<BehavioralProfile> {
        let consistency = self.cognitive.validate_behavioral_consistency(target)?;
        let methodology = self.cognitive.validate_methodology_adherence(target)?;
        let patterns = self.cognitive.validate_cognitive_patterns(target)?;
        let coordination = self.coordinator.coordinate_response(target, DEFAULT_PROTOCOL)?;
        Ok(BehavioralProfile {
            behavioral_consistency: StatusMessage::from(&consistency),
            methodology_adherence: StatusMessage::from(&methodology),
            cognitive_patterns: StatusMessage::from(&patterns),
            response_coordination: coordination,
            timestamp: Utc::now(),
        })
    }

    fn semantic_profile(&self, target: &Target) -> SemanticProfile {
        let intent = target
            .get("user_intent")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| as_text(target));
        let framework = target
            .get("target_framework")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_FRAMEWORK);
        let expected = target
            .get("expected_concept")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_EXPECTED_CONCEPT);

        let semantic_bridge = match self.linguist.build_semantic_bridge(&intent, framework) {
            Ok(bridge) => BridgeOutcome::Built(bridge),
            Err(e) => {
                error!(error = %e, "Error in building semantic bridge");
                BridgeOutcome::Fallback {
                    error: e.to_string(),
                    fallback: "Basic semantic bridge".into(),
                }
            }
        };

        let mapping_validation = match self.linguist.validate_semantic_mapping(&intent, expected) {
            Ok(result) => StatusMessage::from(&result),
            Err(e) => {
                error!(error = %e, "Error in semantic mapping validation");
                StatusMessage {
                    status: "error".into(),
                    message: format!("Mapping validation failed: {e}"),
                }
            }
        };

        let hallucination_prevention = match self.linguist.prevent_hallucination(&intent) {
            Ok(check) => HallucinationOutcome {
                success: check.success,
                confidence: check.confidence,
            },
            Err(e) => {
                error!(error = %e, "Error in hallucination prevention");
                HallucinationOutcome {
                    success: false,
                    confidence: 0.0,
                }
            }
        };

        SemanticProfile {
            semantic_bridge,
            mapping_validation,
            hallucination_prevention,
            timestamp: Utc::now(),
        }
    }

    /// Compare the gates that passed against the terms the semantic bridge
    /// recognized.
    fn cross_pillar_validation(&self, technical: &TechnicalProfile, semantic: &SemanticProfile) -> CrossPillarValidation {
        self.activation.activate_profile(CROSS_PILLAR_VALIDATION, None);

        let intended: BTreeSet<&str> = semantic
            .semantic_bridge
            .bridge()
            .map(|b| b.translation_result.translated_terms.keys().map(String::as_str).collect())
            .unwrap_or_default();

        let mut alignment_issues = Vec::new();
        if !technical.validation_tests.is_empty() && !intended.is_empty() {
            let implemented: BTreeSet<&str> = technical
                .validation_tests
                .iter()
                .filter(|t| t.status == "pass")
                .map(|t| t.gate.as_str())
                .collect();

            let missing: Vec<&str> = intended.difference(&implemented).copied().collect();
            let extra: Vec<&str> = implemented.difference(&intended).copied().collect();
            if !missing.is_empty() {
                alignment_issues.push(format!(
                    "Missing implementation for intended features: {}",
                    missing.join(", ")
                ));
            }
            if !extra.is_empty() {
                alignment_issues.push(format!(
                    "Extra implementation not in semantic intent: {}",
                    extra.join(", ")
                ));
            }
        }

        let validation = CrossPillarValidation {
            alignment_issues,
            technical_results_count: technical.validation_tests.len(),
            semantic_intents_count: intended.len(),
            timestamp: Utc::now(),
        };

        let details = json!({
            "alignment_issues": validation.alignment_issues,
            "technical_results_count": validation.technical_results_count,
            "semantic_intents_count": validation.semantic_intents_count,
            "timestamp": validation.timestamp,
        });
        self.store(
            "cross_pillar_validation",
            details.clone(),
            ["integration", "cross_pillar", "validation"],
            self.services.settings.ttl(15),
        );
        self.log_event(
            IntegrationEventType::CrossPillarCommunication,
            "Cross-pillar validation completed",
            details,
        );
        if !validation.alignment_issues.is_empty() {
            warn!(issues = validation.alignment_issues.len(), "Cross-pillar misalignment");
        }

        self.activation.deactivate_profile(CROSS_PILLAR_VALIDATION);
        validation
    }

    fn health(&self, degraded: bool, components_monitored: usize, gate: GateCategory) -> PillarHealth {
        let gates = &self.services.gates;
        let last_validation = gates
            .recent_results(Some(gate), gates.history_len())
            .last()
            .map(|r| r.timestamp);
        PillarHealth {
            status: if degraded { "degraded" } else { "healthy" }.into(),
            components_monitored,
            last_validation,
        }
    }

    fn log_event(&self, event_type: IntegrationEventType, description: impl Into<String>, details: Value) {
        let event = IntegrationEvent::new(event_type, description, details);
        debug!(event = %event_type, "{}", event.description);

        let content = match serde_json::to_value(&event) {
            Ok(content) => content,
            Err(e) => {
                error!(error = %e, "Failed to serialize integration event");
                Value::Null
            }
        };
        self.store(
            &format!("integration_event_{event_type}"),
            content,
            ["integration", "event", event_type.as_str()],
            self.services.settings.ttl(10),
        );

        self.events.write().unwrap().push(event.clone());
        self.bus.publish(event);
    }

    fn store<const N: usize>(&self, prefix: &str, content: Value, tags: [&str; N], ttl: TimeDelta) {
        self.services.memory.store(
            MemoryEntry::new(
                format!("{prefix}_{}", uuid::Uuid::new_v4().simple()),
                content,
                MemoryType::ShortTerm,
            )
            .with_tags(tags)
            .with_ttl(ttl),
        );
    }
}

/// `0.4·tech + 0.3·behavioral + 0.2·semantic + 0.1·alignment`.
///
/// The behavioral term is fixed at 1.0. With no technical tests the
/// technical term counts as fully passed.
pub fn integration_score(
    technical: &TechnicalProfile,
    semantic: &SemanticProfile,
    cross: &CrossPillarValidation,
) -> f64 {
    let total = technical.validation_tests.len();
    let tech = if total > 0 {
        technical.passed_tests() as f64 / total as f64
    } else {
        1.0
    };
    let behavioral = 1.0;
    let sem = if semantic.hallucination_prevention.success { 1.0 } else { 0.5 };
    let alignment = if cross.alignment_issues.is_empty() { 1.0 } else { 0.0 };

    tech * TECHNICAL_WEIGHT + behavioral * BEHAVIORAL_WEIGHT + sem * SEMANTIC_WEIGHT + alignment * ALIGNMENT_WEIGHT
}
