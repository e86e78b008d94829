//! Technical pillar: infrastructure inventory, validation tests and
//! reliability engineering.

mod infrastructure;
mod sre;
mod validation_engineer;

pub use infrastructure::{
    ComponentType, DependencyStatus, GateSummary, InfrastructureArchitect, InfrastructureComponent,
    InfrastructureReport, InfrastructureStatus,
};
pub use sre::{
    Incident, IncidentStatus, ReliabilityMetrics, Severity, SreDashboard, SreReport, SreSpecialist,
};
pub use validation_engineer::{TestReport, TestType, ValidationEngineer, ValidationTest};
