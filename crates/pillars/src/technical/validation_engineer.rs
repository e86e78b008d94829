use crate::{PillarServices, audit_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::RwLock;
use std::time::Instant;
use tracing::{debug, info, warn};
use triad_config::{Settings, VALID_LOG_LEVELS};
use triad_core::target::{as_text, kind, number};
use triad_core::{MemoryEntry, MemoryType, Result, Target};
use triad_gates::{GateCategory, GateStatus, ValidationResult};

const MAX_MEMORY_MB: f64 = 500.0;
const MAX_CPU_PERCENT: f64 = 80.0;

/// Text patterns the security test flags, with what they mean.
const SECURITY_PATTERNS: &[(&str, &str)] = &[
    ("password", "Hardcoded password detected"),
    ("secret", "Hardcoded secret detected"),
    ("api_key", "Hardcoded API key detected"),
    ("http://", "Unencrypted HTTP connection in config"),
    ("unsafe-eval", "Potentially unsafe code evaluation"),
];

/// Substrings that make a security pattern hit harmless.
const SECURITY_FALSE_POSITIVES: &[&str] = &["http://example.com", "password_hash", "password_reset"];

const COMPLIANCE_PATTERNS: &[(&str, &str)] = &[
    ("print(", "Direct print statements found - should use logging"),
    ("input(", "Direct input statements found - potential security issue"),
    ("eval(", "Use of eval() - security risk"),
    ("exec(", "Use of exec() - security risk"),
];

const VALID_ENVIRONMENTS: &[&str] = &["development", "staging", "production"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    Configuration,
    Implementation,
    Performance,
    Security,
    Compliance,
}

impl TestType {
    pub const ALL: [TestType; 5] = [
        Self::Configuration,
        Self::Implementation,
        Self::Performance,
        Self::Security,
        Self::Compliance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Implementation => "implementation",
            Self::Performance => "performance",
            Self::Security => "security",
            Self::Compliance => "compliance",
        }
    }

    /// The gate a test's results are filed under.
    pub fn gate(&self) -> GateCategory {
        match self {
            Self::Configuration | Self::Implementation | Self::Security => {
                GateCategory::TechnicalValidation
            }
            Self::Performance => GateCategory::PerformanceEfficiency,
            Self::Compliance => GateCategory::VisionAlignment,
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationTest {
    pub name: String,
    #[serde(rename = "type")]
    pub test_type: TestType,
    pub description: String,
    pub parameters: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub enabled: bool,
}

impl ValidationTest {
    pub fn new(name: impl Into<String>, test_type: TestType) -> Self {
        Self {
            name: name.into(),
            test_type,
            description: String::new(),
            parameters: Map::new(),
            created_at: Utc::now(),
            enabled: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSummary {
    pub total_tests: usize,
    pub enabled_tests: usize,
    pub by_type: BTreeMap<TestType, usize>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    pub summary: TestSummary,
    pub tests: Vec<ValidationTest>,
}

/// Runs typed checks (configuration, implementation, performance,
/// security, compliance) against a target.
pub struct ValidationEngineer {
    services: PillarServices,
    /// Registration order is run order.
    tests: RwLock<Vec<ValidationTest>>,
}

impl ValidationEngineer {
    pub fn new(services: PillarServices) -> Self {
        let defaults = vec![
            ValidationTest::new("config_validation_test", TestType::Configuration)
                .with_description("Validates configuration parameters and values"),
            ValidationTest::new("implementation_test", TestType::Implementation)
                .with_description("Validates implementation correctness"),
            ValidationTest::new("performance_benchmark", TestType::Performance)
                .with_description("Measures system performance metrics"),
            ValidationTest::new("security_check", TestType::Security)
                .with_description("Verifies security parameters"),
        ];
        Self {
            services,
            tests: RwLock::new(defaults),
        }
    }

    /// Add a test. Returns `false` if the name is already taken.
    pub fn register_test(&self, test: ValidationTest) -> Result<bool> {
        {
            let mut tests = self.tests.write().unwrap();
            if tests.iter().any(|t| t.name == test.name) {
                warn!(test = %test.name, "Validation test already exists");
                return Ok(false);
            }
            tests.push(test.clone());
        }

        self.services.remember(
            MemoryEntry::new(
                format!("validation_test_{}", test.name),
                serde_json::to_value(&test)?,
                MemoryType::LongTerm,
            )
            .with_tags(["validation", "test", test.test_type.as_str()])
            .with_priority(6),
        );
        info!(test = %test.name, kind = %test.test_type, "Validation test registered");
        Ok(true)
    }

    pub fn test(&self, name: &str) -> Option<ValidationTest> {
        self.tests.read().unwrap().iter().find(|t| t.name == name).cloned()
    }

    /// Run one test. `None` for an unknown name; a disabled test yields a
    /// `skipped` result and is not recorded.
    pub fn run_test(&self, name: &str, target: Option<&Target>) -> Result<Option<ValidationResult>> {
        let Some(test) = self.test(name) else {
            warn!(test = %name, "Validation test not found");
            return Ok(None);
        };

        if !test.enabled {
            info!(test = %name, "Validation test disabled, skipping");
            let mut result = ValidationResult::new(
                test.test_type.gate(),
                GateStatus::Skipped,
                format!("Test {name} is disabled"),
            );
            result.metadata.insert("test_name".into(), json!(name));
            result.metadata.insert("test_type".into(), json!(test.test_type));
            return Ok(Some(result));
        }

        let started = Instant::now();
        let mut result = self.execute(&test, target);
        result
            .metadata
            .insert("execution_time".into(), json!(started.elapsed().as_secs_f64()));

        self.services.remember(
            MemoryEntry::new(
                audit_id(&format!("validation_result_{name}")),
                json!({
                    "test_name": name,
                    "test_type": test.test_type,
                    "result": {
                        "status": result.status,
                        "message": result.message,
                        "metadata": result.metadata,
                        "errors": result.errors,
                    },
                    "timestamp": result.timestamp,
                }),
                MemoryType::ShortTerm,
            )
            .created_at(result.timestamp)
            .with_tags(["validation", "result", test.test_type.as_str()])
            .with_ttl(self.services.settings.ttl(5)),
        );
        debug!(test = %name, status = %result.status, "Validation test finished");
        Ok(Some(result))
    }

    /// Run every registered test in registration order.
    pub fn run_all_tests(&self, target: Option<&Target>) -> Result<Vec<ValidationResult>> {
        let names: Vec<String> = self.tests.read().unwrap().iter().map(|t| t.name.clone()).collect();
        let mut results = Vec::with_capacity(names.len());
        for name in names {
            if let Some(result) = self.run_test(&name, target)? {
                results.push(result);
            }
        }
        Ok(results)
    }

    pub fn test_report(&self) -> TestReport {
        let tests = self.tests.read().unwrap().clone();
        let by_type = TestType::ALL
            .into_iter()
            .map(|t| (t, tests.iter().filter(|x| x.test_type == t).count()))
            .collect();
        TestReport {
            summary: TestSummary {
                total_tests: tests.len(),
                enabled_tests: tests.iter().filter(|t| t.enabled).count(),
                by_type,
                timestamp: Utc::now(),
            },
            tests,
        }
    }

    pub fn enable_test(&self, name: &str) -> bool {
        self.set_enabled(name, true)
    }

    pub fn disable_test(&self, name: &str) -> bool {
        self.set_enabled(name, false)
    }

    // ── Internal ───────────────────────────────────────────────────

    fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        let mut tests = self.tests.write().unwrap();
        match tests.iter_mut().find(|t| t.name == name) {
            Some(test) => {
                test.enabled = enabled;
                true
            }
            None => false,
        }
    }

    fn execute(&self, test: &ValidationTest, target: Option<&Target>) -> ValidationResult {
        let settings = &self.services.settings;
        let (errors, failed, passed) = match test.test_type {
            TestType::Configuration => (
                configuration_issues(target, settings),
                "Configuration validation failed with {n} error(s)",
                "Configuration validation passed",
            ),
            TestType::Implementation => (
                implementation_issues(target),
                "Implementation validation failed with {n} error(s)",
                "Implementation validation passed",
            ),
            TestType::Performance => (
                performance_issues(target, settings),
                "Performance test failed with {n} error(s)",
                "Performance test passed",
            ),
            TestType::Security => (
                security_issues(target),
                "Security validation failed with {n} security issue(s)",
                "Security validation passed",
            ),
            TestType::Compliance => (
                compliance_issues(target),
                "Compliance validation failed with {n} compliance issue(s)",
                "Compliance validation passed",
            ),
        };

        let mut result = if errors.is_empty() {
            ValidationResult::new(test.test_type.gate(), GateStatus::Pass, passed)
        } else {
            let message = failed.replace("{n}", &errors.len().to_string());
            let mut result = ValidationResult::new(test.test_type.gate(), GateStatus::Fail, message);
            result.errors = errors;
            result
        };
        result.metadata.insert("test_name".into(), json!(test.name));
        result
    }
}

// ── Checks ─────────────────────────────────────────────────────────

/// With no target the engineer checks its own settings.
fn configuration_issues(target: Option<&Target>, settings: &Settings) -> Vec<String> {
    let own;
    let target = match target {
        Some(t) => t,
        None => {
            own = serde_json::to_value(settings).unwrap_or(Value::Null);
            &own
        }
    };

    let mut errors = Vec::new();
    let empty = Map::new();
    let config = match target.as_object() {
        Some(obj) => obj,
        None => {
            errors.push("Target is not a valid configuration object or dictionary".to_string());
            &empty
        }
    };

    for field in ["environment", "log_level", "max_workers"] {
        if config.get(field).is_none_or(Value::is_null) {
            errors.push(format!("Missing required configuration field: {field}"));
        }
    }

    if let Some(level) = config.get("log_level").filter(|v| !v.is_null()) {
        let level = as_text(level).to_uppercase();
        if !level.is_empty() && !VALID_LOG_LEVELS.contains(&level.as_str()) {
            errors.push(format!("Invalid log level: {level}"));
        }
    }
    if let Some(workers) = config.get("max_workers").and_then(Value::as_i64) {
        if workers <= 0 {
            errors.push(format!("Invalid max_workers value: {workers}. Must be positive."));
        }
    }
    if let Some(timeout) = config.get("timeout_seconds").and_then(Value::as_i64) {
        if timeout <= 0 {
            errors.push(format!("Invalid timeout value: {timeout}. Must be positive."));
        }
    }
    errors
}

fn implementation_issues(target: Option<&Target>) -> Vec<String> {
    match target {
        Some(Value::String(code)) => unbalanced_delimiter(code)
            .map(|e| vec![format!("Syntax error in implementation: {e}")])
            .unwrap_or_default(),
        Some(Value::Object(obj)) if obj.is_empty() => {
            vec!["Empty dictionary provided as implementation".to_string()]
        }
        _ => Vec::new(),
    }
}

/// First bracket mismatch in `code`, skipping quoted text.
fn unbalanced_delimiter(code: &str) -> Option<String> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in code.char_indices() {
        if let Some(q) = quote {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                _ if c == q => quote = None,
                _ => {}
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => stack.push((c, offset)),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    _ => return Some(format!("unmatched '{c}' at offset {offset}")),
                }
            }
            _ => {}
        }
    }

    if let Some(q) = quote {
        return Some(format!("unterminated string starting with {q}"));
    }
    stack
        .pop()
        .map(|(open, offset)| format!("'{open}' at offset {offset} was never closed"))
}

fn performance_issues(target: Option<&Target>, settings: &Settings) -> Vec<String> {
    let Some(metrics) = target.and_then(Value::as_object) else {
        return Vec::new();
    };
    let max_response = f64::from(settings.timeout_seconds);
    let mut errors = Vec::new();

    if let Some(response) = number(metrics.get("response_time")).filter(|r| *r > max_response) {
        errors.push(format!(
            "Response time too high: {response}s, max allowed: {}s",
            settings.timeout_seconds
        ));
    }
    if let Some(memory) = number(metrics.get("memory_usage")).filter(|m| *m > MAX_MEMORY_MB) {
        errors.push(format!(
            "Memory usage too high: {memory}MB, max allowed: {MAX_MEMORY_MB}MB"
        ));
    }
    if let Some(cpu) = number(metrics.get("cpu_usage")).filter(|c| *c > MAX_CPU_PERCENT) {
        errors.push(format!("CPU usage too high: {cpu}%, max allowed: {MAX_CPU_PERCENT}%"));
    }
    errors
}

fn security_issues(target: Option<&Target>) -> Vec<String> {
    let Some(target) = target else {
        return vec!["No target provided for security test".to_string()];
    };

    match target {
        Value::Object(config) => {
            let mut errors = Vec::new();
            let debug = config.get("debug").and_then(Value::as_bool).unwrap_or(false);
            let environment = config.get("environment").and_then(Value::as_str);
            if debug && environment == Some("production") {
                errors.push("Security issue: Debug mode enabled in production environment".to_string());
            }

            let db_url = config
                .get("database_url")
                .or_else(|| config.get("db_url"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            if db_url.starts_with("http://") {
                errors.push("Security issue: Insecure HTTP database connection".to_string());
            } else if !db_url.is_empty()
                && !db_url.contains("localhost")
                && !["https://", "postgresql://", "mysql://"]
                    .iter()
                    .any(|scheme| db_url.starts_with(scheme))
            {
                errors.push(format!("Security issue: Potentially insecure database URL: {db_url}"));
            }
            errors
        }
        Value::String(text) => {
            let lower = text.to_lowercase();
            if SECURITY_FALSE_POSITIVES.iter().any(|fp| lower.contains(fp)) {
                return Vec::new();
            }
            SECURITY_PATTERNS
                .iter()
                .filter(|(pattern, _)| lower.contains(pattern))
                .map(|(_, issue)| format!("Security issue: {issue}"))
                .collect()
        }
        other => vec![format!(
            "Unsupported target type for security validation: {}",
            kind(other)
        )],
    }
}

fn compliance_issues(target: Option<&Target>) -> Vec<String> {
    let Some(target) = target else {
        return vec!["No target provided for compliance test".to_string()];
    };

    match target {
        Value::Object(record) => {
            let mut errors: Vec<String> = ["timestamp", "version", "environment"]
                .iter()
                .filter(|f| !record.contains_key(**f))
                .map(|f| format!("Missing required compliance field: {f}"))
                .collect();

            if let Some(version) = record.get("version") {
                let text = as_text(version);
                let digits: String = text.chars().filter(|c| *c != '.' && *c != 'v').collect();
                if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                    errors.push(format!("Invalid version format: {text}"));
                }
            }
            if let Some(env) = record.get("environment") {
                let env = as_text(env);
                if !VALID_ENVIRONMENTS.contains(&env.as_str()) {
                    errors.push(format!("Invalid environment value: {env}"));
                }
            }
            errors
        }
        Value::String(code) => COMPLIANCE_PATTERNS
            .iter()
            .filter(|(pattern, _)| code.contains(pattern))
            .map(|(_, issue)| format!("Compliance issue: {issue}"))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engineer() -> ValidationEngineer {
        ValidationEngineer::new(PillarServices::standalone(Settings::default()))
    }

    fn run(engineer: &ValidationEngineer, name: &str, target: Option<Value>) -> ValidationResult {
        engineer.run_test(name, target.as_ref()).unwrap().unwrap()
    }

    #[test]
    fn unknown_test_has_no_result() {
        assert!(engineer().run_test("nope", None).unwrap().is_none());
    }

    #[test]
    fn disabled_test_is_skipped() {
        let engineer = engineer();
        assert!(engineer.disable_test("security_check"));
        let result = run(&engineer, "security_check", None);
        assert_eq!(result.status, GateStatus::Skipped);
        assert_eq!(result.message, "Test security_check is disabled");
        assert_eq!(result.metadata["test_type"], "security");
    }

    #[test]
    fn configuration_defaults_to_own_settings() {
        let engineer = engineer();
        let result = run(&engineer, "config_validation_test", None);
        assert_eq!(result.status, GateStatus::Pass);
        assert!(result.metadata.contains_key("execution_time"));
        assert_eq!(result.gate, GateCategory::TechnicalValidation);
    }

    #[test]
    fn configuration_reports_each_problem() {
        let engineer = engineer();
        let result = run(
            &engineer,
            "config_validation_test",
            Some(json!({"environment": "dev", "log_level": "loud", "max_workers": 0, "timeout_seconds": -1})),
        );
        assert_eq!(result.message, "Configuration validation failed with 3 error(s)");
        assert_eq!(
            result.errors,
            vec![
                "Invalid log level: LOUD",
                "Invalid max_workers value: 0. Must be positive.",
                "Invalid timeout value: -1. Must be positive.",
            ]
        );
    }

    #[test]
    fn configuration_rejects_plain_text() {
        let result = run(&engineer(), "config_validation_test", Some(json!("not a config")));
        assert_eq!(result.errors.len(), 4);
        assert_eq!(result.errors[0], "Target is not a valid configuration object or dictionary");
    }

    #[test]
    fn implementation_checks_brackets_and_empty_objects() {
        let engineer = engineer();
        assert_eq!(
            run(&engineer, "implementation_test", Some(json!("fn main() { call(\")\"); }"))).status,
            GateStatus::Pass
        );

        let broken = run(&engineer, "implementation_test", Some(json!("fn main() { call(1; }")));
        assert_eq!(broken.status, GateStatus::Fail);
        assert!(broken.errors[0].starts_with("Syntax error in implementation:"));

        let empty = run(&engineer, "implementation_test", Some(json!({})));
        assert_eq!(empty.errors, vec!["Empty dictionary provided as implementation"]);
    }

    #[test]
    fn performance_thresholds() {
        let result = run(
            &engineer(),
            "performance_benchmark",
            Some(json!({"response_time": 45, "memory_usage": 200, "cpu_usage": 95})),
        );
        assert_eq!(result.gate, GateCategory::PerformanceEfficiency);
        assert_eq!(
            result.errors,
            vec![
                "Response time too high: 45s, max allowed: 30s",
                "CPU usage too high: 95%, max allowed: 80%",
            ]
        );
    }

    #[test]
    fn security_needs_a_target() {
        let result = run(&engineer(), "security_check", None);
        assert_eq!(result.errors, vec!["No target provided for security test"]);
    }

    #[test]
    fn security_flags_production_debug_and_plain_http() {
        let result = run(
            &engineer(),
            "security_check",
            Some(json!({"debug": true, "environment": "production", "database_url": "http://db"})),
        );
        assert_eq!(result.message, "Security validation failed with 2 security issue(s)");

        let odd = run(
            &engineer(),
            "security_check",
            Some(json!({"database_url": "ftp://db.internal"})),
        );
        assert_eq!(
            odd.errors,
            vec!["Security issue: Potentially insecure database URL: ftp://db.internal"]
        );
    }

    #[test]
    fn security_scans_text_with_false_positives() {
        let engineer = engineer();
        let leaky = run(&engineer, "security_check", Some(json!("api_key = 'abc'")));
        assert_eq!(leaky.errors, vec!["Security issue: Hardcoded API key detected"]);

        let fine = run(&engineer, "security_check", Some(json!("store the password_hash only")));
        assert_eq!(fine.status, GateStatus::Pass);

        let number = run(&engineer, "security_check", Some(json!(42)));
        assert_eq!(
            number.errors,
            vec!["Unsupported target type for security validation: number"]
        );
    }

    #[test]
    fn compliance_test_once_registered() {
        let engineer = engineer();
        let compliance = ValidationTest::new("release_compliance", TestType::Compliance);
        assert!(engineer.register_test(compliance.clone()).unwrap());
        assert!(!engineer.register_test(compliance).unwrap());

        let result = run(
            &engineer,
            "release_compliance",
            Some(json!({"version": "v1.2.x", "environment": "qa"})),
        );
        assert_eq!(result.gate, GateCategory::VisionAlignment);
        assert_eq!(
            result.errors,
            vec![
                "Missing required compliance field: timestamp",
                "Invalid version format: v1.2.x",
                "Invalid environment value: qa",
            ]
        );

        let code = run(&engineer, "release_compliance", Some(json!("print(x); eval(y)")));
        assert_eq!(code.errors.len(), 2);
    }

    #[test]
    fn run_all_covers_every_default_and_persists() {
        let engineer = engineer();
        let results = engineer.run_all_tests(Some(&json!({"service": "api"}))).unwrap();
        assert_eq!(results.len(), 4);
        let stored = engineer.services.memory.search(&["result"], Some(MemoryType::ShortTerm));
        assert_eq!(stored.len(), 4);
    }

    #[test]
    fn report_counts_by_type() {
        let engineer = engineer();
        engineer.disable_test("performance_benchmark");
        let report = engineer.test_report();
        assert_eq!(report.summary.total_tests, 4);
        assert_eq!(report.summary.enabled_tests, 3);
        assert_eq!(report.summary.by_type[&TestType::Compliance], 0);
        assert!(!engineer.enable_test("ghost"));
    }
}
