use crate::{PillarServices, audit_id};
use chrono::{DateTime, Local, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{error, info, warn};
use triad_core::{MemoryEntry, MemoryType, PillarError, Result};

const METRICS_ID: &str = "sre_reliability_metrics";
const METRICS_TTL_HOURS: i64 = 1;
const REPORT_TTL_HOURS: i64 = 6;
const OPTIMIZATION_TTL_HOURS: i64 = 4;

/// A probe run on every monitoring cycle. An `Err` is recorded in the
/// cycle output instead of aborting it.
pub type MonitoringCallback = Arc<dyn Fn() -> std::result::Result<Value, String> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub status: IncidentStatus,
    pub assignee: Option<String>,
    pub resolution_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityMetrics {
    pub uptime_percentage: f64,
    pub response_time_ms: f64,
    pub error_rate: f64,
    pub last_incident: Option<DateTime<Utc>>,
    pub incidents_count: usize,
    pub timestamp: DateTime<Utc>,
}

impl Default for ReliabilityMetrics {
    fn default() -> Self {
        Self {
            uptime_percentage: 99.9,
            response_time_ms: 100.0,
            error_rate: 0.001,
            last_incident: None,
            incidents_count: 0,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SreReport {
    pub id: String,
    #[serde(rename = "type")]
    pub report_type: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SreDashboard {
    pub reliability_metrics: Value,
    pub incidents: Value,
    pub monitoring: Value,
    pub active_incidents: Vec<Value>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Default)]
struct Incidents {
    active: Vec<Incident>,
    history: Vec<Incident>,
}

/// Reliability metrics, monitoring probes and incident tracking.
pub struct SreSpecialist {
    services: PillarServices,
    metrics: RwLock<ReliabilityMetrics>,
    incidents: RwLock<Incidents>,
    callbacks: RwLock<Vec<(String, MonitoringCallback)>>,
}

impl SreSpecialist {
    /// A specialist with the `system_health` and `resource_usage` probes.
    pub fn new(services: PillarServices) -> Self {
        let sre = Self {
            services,
            metrics: RwLock::new(ReliabilityMetrics::default()),
            incidents: RwLock::new(Incidents::default()),
            callbacks: RwLock::new(Vec::new()),
        };
        sre.persist_metrics();
        sre.register_monitoring_callback("system_health", || {
            Ok(json!({
                "status": "healthy",
                "timestamp": Utc::now(),
                "checks": {
                    "memory_manager": "active",
                    "validation_gates": "active",
                    "config_manager": "active",
                },
            }))
        });
        sre.register_monitoring_callback("resource_usage", || {
            Ok(json!({
                "cpu_usage": 10,
                "memory_usage": 25,
                "disk_usage": 60,
                "timestamp": Utc::now(),
            }))
        });
        sre
    }

    /// Returns `false` if a probe with that name exists.
    pub fn register_monitoring_callback<F>(&self, name: &str, callback: F) -> bool
    where
        F: Fn() -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        let mut callbacks = self.callbacks.write().unwrap();
        if callbacks.iter().any(|(n, _)| n == name) {
            warn!(callback = %name, "Monitoring callback already exists");
            return false;
        }
        callbacks.push((name.to_string(), Arc::new(callback)));
        info!(callback = %name, "Monitoring callback registered");
        true
    }

    /// Run every probe once and record the combined output.
    pub fn run_monitoring_cycle(&self) -> Map<String, Value> {
        let callbacks = self.callbacks.read().unwrap().clone();
        let mut results = Map::new();
        for (name, callback) in callbacks {
            let outcome = callback().unwrap_or_else(|e| {
                error!(callback = %name, error = %e, "Monitoring callback failed");
                json!({"status": "error", "error": e, "timestamp": Utc::now()})
            });
            results.insert(name, outcome);
        }

        self.services.remember(
            MemoryEntry::new(
                audit_id("monitoring_cycle"),
                Value::Object(results.clone()),
                MemoryType::ShortTerm,
            )
            .with_tags(["monitoring", "cycle"])
            .with_ttl(self.services.settings.ttl(3)),
        );
        results
    }

    /// Open an incident and return its id.
    pub fn create_incident(
        &self,
        title: &str,
        description: &str,
        severity: Severity,
        source: &str,
    ) -> Result<String> {
        let now = Utc::now();
        let sequence = {
            let mut metrics = self.metrics.write().unwrap();
            metrics.incidents_count += 1;
            metrics.last_incident = Some(now);
            metrics.incidents_count
        };
        let incident = Incident {
            id: format!("incident_{}_{sequence}", now.format("%Y%m%d_%H%M%S")),
            title: title.to_string(),
            description: description.to_string(),
            severity,
            source: source.to_string(),
            created_at: now,
            status: IncidentStatus::Open,
            assignee: None,
            resolution_time: None,
            resolution_notes: None,
        };

        self.services.remember(
            MemoryEntry::new(incident.id.clone(), serde_json::to_value(&incident)?, MemoryType::LongTerm)
                .with_tags(["incident", severity.as_str(), "active"])
                .with_priority(if severity == Severity::Critical { 10 } else { 5 }),
        );
        warn!(incident = %incident.id, severity = %severity, title, "Incident created");

        let id = incident.id.clone();
        self.incidents.write().unwrap().active.push(incident);
        self.persist_metrics();
        Ok(id)
    }

    /// Close an open incident and move it to the history.
    pub fn resolve_incident(&self, incident_id: &str, notes: &str) -> Result<()> {
        let incident = {
            let mut incidents = self.incidents.write().unwrap();
            let index = incidents
                .active
                .iter()
                .position(|i| i.id == incident_id)
                .ok_or_else(|| PillarError::UnknownIncident(incident_id.to_string()))?;
            let mut incident = incidents.active.remove(index);
            incident.status = IncidentStatus::Resolved;
            incident.resolution_time = Some(Utc::now());
            incident.resolution_notes = Some(notes.to_string());
            incidents.history.push(incident.clone());
            incident
        };

        let content = serde_json::to_value(&incident)?;
        if let Some(mut entry) = self.services.memory.retrieve(incident_id, Some(MemoryType::LongTerm)) {
            entry.content = content.clone();
            entry.tags = vec!["incident".into(), incident.severity.as_str().into(), "resolved".into()];
            self.services.remember(entry);
        }
        self.services.remember(
            MemoryEntry::new(
                format!("incident_resolution_{incident_id}"),
                json!({
                    "incident_id": incident_id,
                    "resolution": content,
                    "resolved_at": incident.resolution_time,
                }),
                MemoryType::LongTerm,
            )
            .with_tags(["incident", "resolution"])
            .with_priority(7),
        );
        info!(incident = %incident_id, "Incident resolved");
        Ok(())
    }

    pub fn active_incidents(&self) -> Vec<Incident> {
        self.incidents.read().unwrap().active.clone()
    }

    /// The last `limit` resolved incidents, oldest first.
    pub fn incident_history(&self, limit: usize) -> Vec<Incident> {
        let incidents = self.incidents.read().unwrap();
        let skip = incidents.history.len().saturating_sub(limit);
        incidents.history[skip..].to_vec()
    }

    pub fn metrics(&self) -> ReliabilityMetrics {
        self.metrics.read().unwrap().clone()
    }

    /// Overwrite whichever metrics are given. Returns whether anything changed.
    pub fn update_reliability_metrics(
        &self,
        uptime: Option<f64>,
        response_time_ms: Option<f64>,
        error_rate: Option<f64>,
    ) -> bool {
        {
            let mut guard = self.metrics.write().unwrap();
            let metrics = &mut *guard;
            let mut updated = false;
            for (slot, value) in [
                (&mut metrics.uptime_percentage, uptime),
                (&mut metrics.response_time_ms, response_time_ms),
                (&mut metrics.error_rate, error_rate),
            ] {
                if let Some(value) = value {
                    *slot = value;
                    updated = true;
                }
            }
            if !updated {
                return false;
            }
            metrics.timestamp = Utc::now();
        }
        self.persist_metrics();
        true
    }

    /// Build a `reliability` or `incident_summary` report. Any other kind
    /// produces a report carrying an `error` field.
    pub fn generate_report(&self, report_type: &str) -> Result<SreReport> {
        let data = match report_type {
            "reliability" => {
                let metrics = self.metrics();
                let incidents = self.incidents.read().unwrap();
                let monitoring: Map<String, Value> = self
                    .callbacks
                    .read()
                    .unwrap()
                    .iter()
                    .map(|(name, _)| (name.clone(), json!("registered")))
                    .collect();
                json!({
                    "metrics": {
                        "uptime_percentage": metrics.uptime_percentage,
                        "response_time_ms": metrics.response_time_ms,
                        "error_rate": metrics.error_rate,
                    },
                    "incidents": {
                        "active_count": incidents.active.len(),
                        "total_count": metrics.incidents_count,
                        "history_count": incidents.history.len(),
                    },
                    "monitoring_status": monitoring,
                })
            }
            "incident_summary" => {
                let incidents = self.incidents.read().unwrap();
                let active = incidents
                    .active
                    .iter()
                    .map(|i| -> Result<Value> {
                        let mut value = serde_json::to_value(i)?;
                        if let Some(obj) = value.as_object_mut() {
                            obj.remove("description");
                        }
                        Ok(value)
                    })
                    .collect::<Result<Vec<_>>>()?;
                let skip = incidents.history.len().saturating_sub(10);
                let resolved: Vec<Value> = incidents.history[skip..]
                    .iter()
                    .map(|i| {
                        json!({
                            "id": i.id,
                            "title": i.title,
                            "severity": i.severity,
                            "created_at": i.created_at,
                            "resolution_time": i.resolution_time,
                        })
                    })
                    .collect();
                json!({"active_incidents": active, "recent_resolved": resolved})
            }
            other => json!({"error": format!("Unknown report type: {other}")}),
        };

        let report = SreReport {
            id: audit_id(&format!("sre_report_{report_type}")),
            report_type: report_type.to_string(),
            data,
            timestamp: Utc::now(),
        };
        self.services.remember(
            MemoryEntry::new(report.id.clone(), serde_json::to_value(&report)?, MemoryType::ShortTerm)
                .created_at(report.timestamp)
                .with_tags(["sre", "report", report_type])
                .with_ttl(TimeDelta::hours(REPORT_TTL_HOURS)),
        );
        Ok(report)
    }

    /// Record an optimization pass. Nothing is tuned; the improvement
    /// figures are always zero.
    pub fn run_performance_optimization(&self, component: Option<&str>) -> Value {
        let result = json!({
            "component": component.unwrap_or("system-wide"),
            "optimizations_applied": [],
            "performance_improvement": {
                "response_time_reduction": 0,
                "resource_efficiency": 0,
                "throughput_improvement": 0,
            },
            "timestamp": Utc::now(),
        });
        self.services.remember(
            MemoryEntry::new(
                audit_id(&format!("optimization_{}", component.unwrap_or("system"))),
                result.clone(),
                MemoryType::ShortTerm,
            )
            .with_tags(["sre", "optimization"])
            .with_ttl(TimeDelta::hours(OPTIMIZATION_TTL_HOURS)),
        );
        result
    }

    pub fn dashboard(&self) -> SreDashboard {
        let metrics = self.metrics();
        let incidents = self.incidents.read().unwrap();
        let midnight = Local::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .and_then(|t| t.and_local_timezone(Local).earliest())
            .map(|t| t.with_timezone(&Utc));
        let today = incidents
            .active
            .iter()
            .filter(|i| midnight.is_none_or(|m| i.created_at >= m))
            .count();

        SreDashboard {
            reliability_metrics: json!({
                "uptime": format!("{}%", metrics.uptime_percentage),
                "avg_response_time": format!("{}ms", metrics.response_time_ms),
                "error_rate": format!("{}%", metrics.error_rate * 100.0),
            }),
            incidents: json!({
                "active": incidents.active.len(),
                "today": today,
                "total_count": metrics.incidents_count,
            }),
            monitoring: json!({
                "registered_callbacks": self.callbacks.read().unwrap().len(),
                "last_cycle": Utc::now(),
            }),
            active_incidents: incidents
                .active
                .iter()
                .map(|i| json!({"id": i.id, "title": i.title, "severity": i.severity, "created_at": i.created_at}))
                .collect(),
            timestamp: Utc::now(),
        }
    }

    // ── Internal ───────────────────────────────────────────────────

    fn persist_metrics(&self) {
        let metrics = self.metrics();
        self.services.remember(
            MemoryEntry::new(
                METRICS_ID,
                json!({
                    "uptime_percentage": metrics.uptime_percentage,
                    "response_time_ms": metrics.response_time_ms,
                    "error_rate": metrics.error_rate,
                    "last_incident": metrics.last_incident,
                    "incidents_count": metrics.incidents_count,
                    "timestamp": metrics.timestamp,
                }),
                MemoryType::ShortTerm,
            )
            .created_at(metrics.timestamp)
            .with_tags(["sre", "metrics", "reliability"])
            .with_ttl(TimeDelta::hours(METRICS_TTL_HOURS)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triad_config::Settings;

    fn sre() -> SreSpecialist {
        SreSpecialist::new(PillarServices::standalone(Settings::default()))
    }

    #[test]
    fn metrics_are_published_on_start() {
        let sre = sre();
        let entry = sre.services.memory.retrieve(METRICS_ID, None).unwrap();
        assert_eq!(entry.content["uptime_percentage"], 99.9);
        assert_eq!(entry.content["incidents_count"], 0);
    }

    #[test]
    fn monitoring_cycle_runs_every_probe() {
        let sre = sre();
        assert!(!sre.register_monitoring_callback("system_health", || Ok(json!({}))));
        assert!(sre.register_monitoring_callback("flaky", || Err("probe timed out".into())));

        let results = sre.run_monitoring_cycle();
        assert_eq!(results["system_health"]["status"], "healthy");
        assert_eq!(results["resource_usage"]["disk_usage"], 60);
        assert_eq!(results["flaky"]["status"], "error");
        assert_eq!(results["flaky"]["error"], "probe timed out");
        assert_eq!(sre.services.memory.search(&["cycle"], None).len(), 1);
    }

    #[test]
    fn incident_lifecycle() {
        let sre = sre();
        let id = sre
            .create_incident("DB down", "primary unreachable", Severity::Critical, "monitor")
            .unwrap();
        assert_eq!(sre.active_incidents().len(), 1);

        let stored = sre.services.memory.retrieve(&id, Some(MemoryType::LongTerm)).unwrap();
        assert_eq!(stored.priority, 10);
        assert_eq!(stored.content["status"], "open");

        sre.resolve_incident(&id, "failover").unwrap();
        assert!(sre.active_incidents().is_empty());
        let history = sre.incident_history(50);
        assert_eq!(history[0].status, IncidentStatus::Resolved);
        assert_eq!(history[0].resolution_notes.as_deref(), Some("failover"));
        assert!(
            sre.services
                .memory
                .retrieve(&format!("incident_resolution_{id}"), None)
                .is_some()
        );
        assert_eq!(sre.metrics().incidents_count, 1);
    }

    #[test]
    fn resolving_unknown_incident_errors() {
        assert!(sre().resolve_incident("incident_nope", "").is_err());
    }

    #[test]
    fn metric_updates_are_partial() {
        let sre = sre();
        assert!(!sre.update_reliability_metrics(None, None, None));
        assert!(sre.update_reliability_metrics(Some(98.5), None, None));
        let metrics = sre.metrics();
        assert_eq!(metrics.uptime_percentage, 98.5);
        assert_eq!(metrics.response_time_ms, 100.0);
    }

    #[test]
    fn reports_by_kind() {
        let sre = sre();
        sre.create_incident("slow", "p99 up", Severity::Low, "system").unwrap();

        let reliability = sre.generate_report("reliability").unwrap();
        assert_eq!(reliability.data["incidents"]["active_count"], 1);
        assert_eq!(reliability.data["monitoring_status"]["resource_usage"], "registered");

        let summary = sre.generate_report("incident_summary").unwrap();
        assert!(summary.data["active_incidents"][0].get("description").is_none());

        let unknown = sre.generate_report("weekly").unwrap();
        assert_eq!(unknown.data["error"], "Unknown report type: weekly");
        assert_eq!(sre.services.memory.search(&["report"], None).len(), 3);
    }

    #[test]
    fn dashboard_formats_metrics() {
        let sre = sre();
        sre.create_incident("x", "y", Severity::High, "system").unwrap();
        let dash = sre.dashboard();
        assert_eq!(dash.reliability_metrics["uptime"], "99.9%");
        assert_eq!(dash.reliability_metrics["avg_response_time"], "100ms");
        assert_eq!(dash.incidents["active"], 1);
        assert_eq!(dash.incidents["today"], 1);
        assert_eq!(dash.monitoring["registered_callbacks"], 2);
    }

    #[test]
    fn optimization_is_recorded() {
        let sre = sre();
        let result = sre.run_performance_optimization(None);
        assert_eq!(result["component"], "system-wide");
        assert_eq!(sre.services.memory.search(&["optimization"], None).len(), 1);
    }
}
