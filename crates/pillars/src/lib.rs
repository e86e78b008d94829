//! The three analysis pillars.
//!
//! ```text
//!   technical   InfrastructureArchitect · ValidationEngineer · SreSpecialist
//!   behavioral  BehavioralArchitect · CognitiveValidator · ResponseCoordinator
//!   semantic    DomainLinguist
//! ```
//!
//! Every manager shares one [`PillarServices`] bundle (settings, memory
//! store, validation gates) and writes an audit record to memory for each
//! operation it performs. Technical and behavioral operations propagate
//! their errors; semantic operations return [`PillarError`] so callers can
//! degrade each step on its own.

pub mod behavioral;
pub mod semantic;
pub mod technical;

pub use behavioral::{
    BehavioralArchitect, BehavioralPattern, CognitiveValidator, PatternType, ResponseCoordinator,
    ResponseQuality,
};
pub use semantic::{DomainFramework, DomainLinguist, SemanticBridge, SemanticValidationResult};
pub use technical::{
    ComponentType, InfrastructureArchitect, InfrastructureComponent, Severity, SreSpecialist,
    TestType, ValidationEngineer, ValidationTest,
};
pub use triad_core::PillarError;

use std::sync::Arc;
use triad_config::Settings;
use triad_core::MemoryEntry;
use triad_gates::ValidationGates;
use triad_memory::MemoryStore;

/// The collaborators every pillar manager is built from.
#[derive(Clone)]
pub struct PillarServices {
    pub settings: Arc<Settings>,
    pub memory: Arc<MemoryStore>,
    pub gates: Arc<ValidationGates>,
}

impl PillarServices {
    pub fn new(settings: Arc<Settings>, memory: Arc<MemoryStore>, gates: Arc<ValidationGates>) -> Self {
        Self {
            settings,
            memory,
            gates,
        }
    }

    /// A fresh memory store and the built-in rules.
    pub fn standalone(settings: Settings) -> Self {
        let memory = Arc::new(MemoryStore::new());
        let gates = Arc::new(ValidationGates::with_default_rules(memory.clone()));
        Self::new(Arc::new(settings), memory, gates)
    }

    pub(crate) fn remember(&self, entry: MemoryEntry) {
        self.memory.store(entry);
    }
}

/// A unique audit record id: `{prefix}_{uuid}`.
pub(crate) fn audit_id(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}
