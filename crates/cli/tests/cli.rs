//! Runs the `triad` binary against a throwaway settings file.

use std::path::Path;
use std::process::{Command, Output};

fn triad(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_triad"))
        .args(args)
        .arg("--config")
        .arg(config)
        .env("RUST_LOG", "off")
        .env_remove("ENVIRONMENT")
        .output()
        .expect("failed to run triad")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn config_path_does_not_create_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("dev.yaml");

    let output = triad(&config, &["config", "path"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), config.display().to_string());
    assert!(!config.exists());
}

#[test]
fn config_init_then_show() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("configs").join("dev.yaml");

    assert!(triad(&config, &["config", "init"]).status.success());
    assert!(config.exists());

    let output = triad(&config, &["config", "show"]);
    assert!(output.status.success());
    let shown = stdout(&output);
    assert!(shown.contains("timeout_seconds: 30"));
    assert!(shown.contains("log_level: INFO"));
}

#[test]
fn invalid_settings_fail_fast() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bad.yaml");
    std::fs::write(&config, "log_level: LOUD\n").unwrap();

    let output = triad(&config, &["status"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load config"));
}

#[test]
fn analyze_json_carries_profile_and_recommendations() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("dev.yaml");

    let output = triad(
        &config,
        &["analyze", "make the agents talk to each other", "--framework", "autogen", "--json"],
    );
    assert!(output.status.success());

    let response: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let score = response["analysis"]["integration_score"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&score));
    assert_eq!(
        response["recommendations"]["framework_specific_configurations"]["target_framework"],
        "autogen"
    );
}

#[test]
fn gates_run_rejects_unknown_gate() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("dev.yaml");

    let output = triad(&config, &["gates", "run", "--gate", "nonsense"]);
    assert!(!output.status.success());
}

#[test]
fn profiles_activate_technical() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("dev.yaml");

    let output = triad(&config, &["profiles", "activate", "technical"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("infrastructure-architect"));
}
