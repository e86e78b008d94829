use super::{Verdict, label};
use crate::GateError;
use crate::model::{Outcome, ValidationRule, Validator};
use serde_json::{Map, Value};
use triad_core::target::{number, path, truthy};
use triad_core::{Context, Target};

const PERFORMANCE: Verdict = Verdict {
    subject: "Performance metrics",
    status_key: "performance_status",
    good: "acceptable",
    bad: "unacceptable",
    pass_message: "Performance metrics are within acceptable ranges",
};

const MIN_UPTIME_PCT: f64 = 99.0;
const MAX_RESPONSE_MS: f64 = 500.0;
const MAX_ERROR_RATE_PCT: f64 = 1.0;
const MAX_CPU_PCT: f64 = 80.0;
const MAX_MEMORY_PCT: f64 = 85.0;

/// Reliability and resource metrics within their thresholds.
pub struct PerformanceMetrics;

impl Validator for PerformanceMetrics {
    fn validate(
        &self,
        target: Option<&Target>,
        _context: &Context,
        _rule: &ValidationRule,
    ) -> Result<Outcome, GateError> {
        let Some(target) = target else {
            return Ok(Outcome::pass("No target to validate for performance metrics"));
        };
        if !target.is_object() {
            return Ok(PERFORMANCE.judge(Vec::new()));
        }

        let mut issues = Vec::new();
        if let Some(reliability) = path(target, &["sre_metrics", "reliability_metrics"])
            .and_then(Value::as_object)
            .filter(|m| !m.is_empty())
        {
            check_reliability(reliability, &mut issues);
        }
        if let Some(resources) = target
            .get("resource_metrics")
            .and_then(Value::as_object)
            .filter(|m| !m.is_empty())
        {
            check_resources(resources, &mut issues);
        }

        Ok(PERFORMANCE.judge(issues))
    }
}

/// Parse `"99.5%"`. `None` when the value is not a percent string at all.
fn percent(raw: &str) -> Option<Result<f64, ()>> {
    raw.contains('%')
        .then(|| raw.replace('%', "").trim().parse::<f64>().map_err(|_| ()))
}

fn check_reliability(metrics: &Map<String, Value>, issues: &mut Vec<String>) {
    let uptime = metrics.get("uptime").and_then(Value::as_str).unwrap_or("100%");
    match percent(uptime) {
        Some(Ok(pct)) if pct < MIN_UPTIME_PCT => issues.push(format!(
            "Uptime {uptime} is below acceptable threshold (99%)"
        )),
        Some(Err(())) => issues.push(format!("Invalid uptime format: {uptime}")),
        _ => {}
    }

    let response = metrics
        .get("avg_response_time")
        .and_then(Value::as_str)
        .unwrap_or("0ms");
    match response.replace("ms", "").trim().parse::<f64>() {
        Ok(ms) if ms > MAX_RESPONSE_MS => issues.push(format!(
            "Average response time {ms}ms is above acceptable threshold (500ms)"
        )),
        Ok(_) => {}
        Err(_) => issues.push(format!("Invalid response time format: {response}")),
    }

    let error_rate = metrics.get("error_rate").and_then(Value::as_str).unwrap_or("0%");
    match percent(error_rate) {
        Some(Ok(pct)) if pct > MAX_ERROR_RATE_PCT => issues.push(format!(
            "Error rate {error_rate} is above acceptable threshold (1%)"
        )),
        Some(Err(())) => issues.push(format!("Invalid error rate format: {error_rate}")),
        _ => {}
    }
}

fn check_resources(metrics: &Map<String, Value>, issues: &mut Vec<String>) {
    let limits = [("cpu_usage", "CPU", MAX_CPU_PCT), ("memory_usage", "Memory", MAX_MEMORY_PCT)];
    for (key, name, limit) in limits {
        let raw = metrics.get(key).filter(|v| truthy(Some(v)));
        if let Some(raw) = raw {
            if number(Some(raw)).is_some_and(|v| v > limit) {
                issues.push(format!(
                    "{name} usage {}% is above acceptable threshold ({limit}%)",
                    label(raw)
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GateCategory, GateStatus};
    use serde_json::json;

    fn check(target: Value) -> Outcome {
        let rule = ValidationRule::new("p", GateCategory::PerformanceEfficiency, PerformanceMetrics);
        PerformanceMetrics
            .validate(Some(&target), &Context::new(), &rule)
            .unwrap()
    }

    #[test]
    fn healthy_metrics_pass() {
        let outcome = check(json!({
            "sre_metrics": {"reliability_metrics": {
                "uptime": "99.95%", "avg_response_time": "120ms", "error_rate": "0.1%"
            }},
            "resource_metrics": {"cpu_usage": 40, "memory_usage": 60}
        }));
        assert_eq!(outcome.status, GateStatus::Pass);
    }

    #[test]
    fn every_threshold_is_checked() {
        let outcome = check(json!({
            "sre_metrics": {"reliability_metrics": {
                "uptime": "97.5%", "avg_response_time": "750ms", "error_rate": "2.5%"
            }},
            "resource_metrics": {"cpu_usage": 92.5, "memory_usage": 90}
        }));
        assert_eq!(
            outcome.errors,
            vec![
                "Uptime 97.5% is below acceptable threshold (99%)",
                "Average response time 750ms is above acceptable threshold (500ms)",
                "Error rate 2.5% is above acceptable threshold (1%)",
                "CPU usage 92.5% is above acceptable threshold (80%)",
                "Memory usage 90% is above acceptable threshold (85%)",
            ]
        );
    }

    #[test]
    fn malformed_values_are_reported() {
        let outcome = check(json!({
            "sre_metrics": {"reliability_metrics": {
                "uptime": "high%", "avg_response_time": "fast"
            }}
        }));
        assert_eq!(
            outcome.errors,
            vec!["Invalid uptime format: high%", "Invalid response time format: fast"]
        );
    }
}
