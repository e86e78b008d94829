use crate::{PillarServices, audit_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::RwLock;
use tracing::{debug, info, warn};
use triad_core::{MemoryEntry, MemoryType, PillarError, Result, Target};

/// Rule the infrastructure check runs.
const INFRASTRUCTURE_RULE: &str = "tech_infrastructure_check";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Compute,
    Storage,
    Network,
    Security,
    Monitoring,
}

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compute => "compute",
            Self::Storage => "storage",
            Self::Network => "network",
            Self::Security => "security",
            Self::Monitoring => "monitoring",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A placeholder piece of infrastructure with a free-form status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfrastructureComponent {
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub properties: Map<String, Value>,
    pub dependencies: Vec<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl InfrastructureComponent {
    pub fn new(name: impl Into<String>, component_type: ComponentType) -> Self {
        Self {
            name: name.into(),
            component_type,
            properties: Map::new(),
            dependencies: Vec::new(),
            status: "unknown".into(),
            created_at: Utc::now(),
        }
    }

    pub fn with_properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = properties;
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
}

/// One gate outcome, flattened for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateSummary {
    pub gate: String,
    pub status: String,
    pub message: String,
}

impl From<&triad_gates::ValidationResult> for GateSummary {
    fn from(result: &triad_gates::ValidationResult) -> Self {
        Self {
            gate: result.gate.to_string(),
            status: result.status.to_string(),
            message: result.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfrastructureStatus {
    pub components_count: usize,
    pub components_by_type: BTreeMap<ComponentType, usize>,
    pub validation_results: Vec<GateSummary>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyStatus {
    pub component: String,
    pub dependencies: Vec<String>,
    /// Dependency name to its status, or `missing`.
    pub dependency_status: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfrastructureSummary {
    pub total_components: usize,
    pub by_type: BTreeMap<ComponentType, usize>,
    pub status_distribution: BTreeMap<String, usize>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfrastructureReport {
    pub summary: InfrastructureSummary,
    pub components: BTreeMap<String, InfrastructureComponent>,
}

/// Keeps the component inventory and checks it against the technical gate.
pub struct InfrastructureArchitect {
    services: PillarServices,
    components: RwLock<BTreeMap<String, InfrastructureComponent>>,
}

impl InfrastructureArchitect {
    /// An architect seeded with the monitoring, config store and logging
    /// components.
    pub fn new(services: PillarServices) -> Self {
        let architect = Self {
            services,
            components: RwLock::new(BTreeMap::new()),
        };
        for (name, kind) in [
            ("system_monitoring", ComponentType::Monitoring),
            ("config_store", ComponentType::Storage),
            ("logging_system", ComponentType::Monitoring),
        ] {
            architect.register_component(InfrastructureComponent::new(name, kind));
        }
        architect
    }

    /// Add a component. Returns `false` if the name is already taken.
    pub fn register_component(&self, component: InfrastructureComponent) -> bool {
        {
            let mut components = self.components.write().unwrap();
            if components.contains_key(&component.name) {
                warn!(component = %component.name, "Component already registered");
                return false;
            }
            components.insert(component.name.clone(), component.clone());
        }

        self.services.remember(
            MemoryEntry::new(
                format!("infra_component_{}", component.name),
                component_content(&component),
                MemoryType::LongTerm,
            )
            .with_tags(["infrastructure", "component", component.component_type.as_str()])
            .with_priority(7),
        );
        info!(component = %component.name, kind = %component.component_type, "Component registered");
        true
    }

    pub fn component(&self, name: &str) -> Option<InfrastructureComponent> {
        self.components.read().unwrap().get(name).cloned()
    }

    /// Run the infrastructure rule and summarize the inventory.
    pub fn validate_infrastructure(&self, target: Option<&Target>) -> Result<InfrastructureStatus> {
        let validation_results = self
            .services
            .gates
            .validate_rule(INFRASTRUCTURE_RULE, target, None)
            .iter()
            .map(GateSummary::from)
            .collect();

        let (components_count, components_by_type) = {
            let components = self.components.read().unwrap();
            (components.len(), count_by_type(components.values()))
        };

        let status = InfrastructureStatus {
            components_count,
            components_by_type,
            validation_results,
            timestamp: Utc::now(),
        };

        self.services.remember(
            MemoryEntry::new(
                audit_id("infra_status"),
                serde_json::to_value(&status)?,
                MemoryType::ShortTerm,
            )
            .with_tags(["infrastructure", "status"])
            .with_ttl(self.services.settings.ttl(2)),
        );
        debug!(components = status.components_count, "Infrastructure validated");
        Ok(status)
    }

    pub fn check_component_dependencies(&self, name: &str) -> Result<DependencyStatus> {
        let components = self.components.read().unwrap();
        let component = components
            .get(name)
            .ok_or_else(|| PillarError::UnknownComponent(name.to_string()))?;

        let dependency_status = component
            .dependencies
            .iter()
            .map(|dep| {
                let status = components
                    .get(dep)
                    .map_or_else(|| "missing".to_string(), |c| c.status.clone());
                (dep.clone(), status)
            })
            .collect();

        Ok(DependencyStatus {
            component: name.to_string(),
            dependencies: component.dependencies.clone(),
            dependency_status,
            timestamp: Utc::now(),
        })
    }

    /// Set a component's status, mirroring it into the stored record.
    pub fn update_component_status(&self, name: &str, status: &str) -> bool {
        {
            let mut components = self.components.write().unwrap();
            let Some(component) = components.get_mut(name) else {
                return false;
            };
            component.status = status.to_string();
        }

        let id = format!("infra_component_{name}");
        if let Some(entry) = self.services.memory.retrieve(&id, Some(MemoryType::LongTerm)) {
            let mut content = entry.content;
            if let Some(obj) = content.as_object_mut() {
                obj.insert("status".into(), json!(status));
            }
            self.services.memory.update(&id, content, None);
        }
        info!(component = %name, status, "Component status updated");
        true
    }

    pub fn infrastructure_report(&self) -> InfrastructureReport {
        let components = self.components.read().unwrap().clone();
        let mut status_distribution = BTreeMap::new();
        for component in components.values() {
            *status_distribution.entry(component.status.clone()).or_insert(0) += 1;
        }

        InfrastructureReport {
            summary: InfrastructureSummary {
                total_components: components.len(),
                by_type: count_by_type(components.values()),
                status_distribution,
                timestamp: Utc::now(),
            },
            components,
        }
    }
}

fn count_by_type<'a>(
    components: impl Iterator<Item = &'a InfrastructureComponent>,
) -> BTreeMap<ComponentType, usize> {
    let mut counts = BTreeMap::new();
    for component in components {
        *counts.entry(component.component_type).or_insert(0) += 1;
    }
    counts
}

fn component_content(component: &InfrastructureComponent) -> Value {
    json!({
        "name": component.name,
        "type": component.component_type,
        "properties": component.properties,
        "dependencies": component.dependencies,
        "status": component.status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use triad_config::Settings;

    fn architect() -> InfrastructureArchitect {
        InfrastructureArchitect::new(PillarServices::standalone(Settings::default()))
    }

    #[test]
    fn starts_with_three_unknown_components() {
        let report = architect().infrastructure_report();
        assert_eq!(report.summary.total_components, 3);
        assert_eq!(report.summary.by_type[&ComponentType::Monitoring], 2);
        assert_eq!(report.summary.status_distribution["unknown"], 3);
    }

    #[test]
    fn duplicate_component_is_rejected() {
        let architect = architect();
        let dup = InfrastructureComponent::new("config_store", ComponentType::Storage);
        assert!(!architect.register_component(dup));
    }

    #[test]
    fn registration_is_persisted() {
        let architect = architect();
        let db = InfrastructureComponent::new("primary_db", ComponentType::Storage);
        assert!(architect.register_component(db));

        let entry = architect
            .services
            .memory
            .retrieve("infra_component_primary_db", Some(MemoryType::LongTerm))
            .unwrap();
        assert_eq!(entry.priority, 7);
        assert!(entry.has_any_tag(&["storage"]));
    }

    #[test]
    fn dependency_status_marks_missing() {
        let architect = architect();
        architect.update_component_status("config_store", "healthy");
        architect.register_component(
            InfrastructureComponent::new("api", ComponentType::Compute)
                .depends_on(["config_store", "cache"]),
        );

        let status = architect.check_component_dependencies("api").unwrap();
        assert_eq!(status.dependency_status["config_store"], "healthy");
        assert_eq!(status.dependency_status["cache"], "missing");
    }

    #[test]
    fn unknown_component_dependencies_error() {
        let err = architect().check_component_dependencies("ghost").unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn status_update_reaches_memory() {
        let architect = architect();
        assert!(architect.update_component_status("logging_system", "degraded"));
        assert!(!architect.update_component_status("ghost", "up"));

        let entry = architect
            .services
            .memory
            .retrieve("infra_component_logging_system", None)
            .unwrap();
        assert_eq!(entry.content["status"], "degraded");
    }

    #[test]
    fn validation_runs_the_infrastructure_rule() {
        let architect = architect();
        let status = architect
            .validate_infrastructure(Some(&json!({"service": "api"})))
            .unwrap();
        assert_eq!(status.components_count, 3);
        assert_eq!(status.validation_results.len(), 1);
        assert_eq!(status.validation_results[0].gate, "technical_validation");
        assert_eq!(architect.services.memory.search(&["status"], None).len(), 1);
    }
}
