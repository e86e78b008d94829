//! Cross-pillar integration for triad.
//!
//! [`IntegrationLayer`] owns one memory store, one set of validation gates,
//! the activation system and all seven pillar managers. Its main operation
//! runs every pillar against a target, compares their outputs and scores
//! how well they line up:
//!
//! ```text
//!   activate integrated_profiling
//!     → technical   (infrastructure, tests, SRE dashboard)     errors propagate
//!     → behavioral  (consistency, methodology, coordination)   errors propagate
//!     → semantic    (bridge, mapping, hallucination)           each step degrades
//!     → cross-pillar alignment → score → memory + event
//!   deactivate integrated_profiling
//! ```
//!
//! [`ConversationalProfiler`] wraps the layer for free-text requests and
//! turns a profile into framework recommendations.

pub mod event;
pub mod layer;
pub mod profiler;

pub use event::{EventBus, IntegrationEvent, IntegrationEventType};
pub use layer::{
    BridgeOutcome, CROSS_PILLAR_VALIDATION, CrossPillarValidation, INTEGRATED_PROFILING,
    IntegratedProfile, IntegrationDashboard, IntegrationLayer, StatusMessage, UnifiedReport,
    integration_score,
};
pub use profiler::{
    ConversationalProfiler, ProfilerResponse, Recommendations, analysis_summary,
    configuration_confidence, configuration_template,
};
