//! `triad gates`: List or run validation rules.

use std::sync::Arc;
use triad_config::Settings;
use triad_core::Target;
use triad_gates::{GateCategory, GateStatus, ValidationGates};
use triad_memory::MemoryStore;

pub async fn list() -> Result<(), Box<dyn std::error::Error>> {
    let gates = ValidationGates::with_default_rules(Arc::new(MemoryStore::new()));

    println!("🚦 Validation Rules");
    println!("===================");
    for rule in gates.rules() {
        let mark = if rule.enabled { "✅" } else { "⏸️ " };
        println!(
            "  {mark} {:<34} {:<24} priority {:>2}",
            rule.id,
            rule.gate.as_str(),
            rule.priority
        );
        if !rule.dependencies.is_empty() {
            println!("       depends on: {}", rule.dependencies.join(", "));
        }
    }
    Ok(())
}

pub async fn run(
    settings: Settings,
    gate: Option<&str>,
    target: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !settings.enable_validation {
        println!("⚠️  Validation is disabled in settings");
        return Ok(());
    }

    let target: Option<Target> = target.map(serde_json::from_str::<Target>).transpose()?;
    let gates = ValidationGates::with_default_rules(Arc::new(MemoryStore::new()));

    let results = match gate {
        Some(name) => {
            let category: GateCategory = name.parse()?;
            gates.validate_gate(category, target.as_ref(), None)
        }
        None => gates.validate_all(target.as_ref(), None),
    };

    println!("🚦 Validation Results");
    println!("=====================");
    for result in &results {
        let mark = match result.status {
            GateStatus::Pass => "✅",
            GateStatus::Fail => "❌",
            GateStatus::Pending => "⏳",
            GateStatus::Skipped => "⏭️ ",
        };
        let rule = result.rule_id().unwrap_or("-");
        println!("  {mark} {rule:<34} {}", result.message);
        for error in &result.errors {
            println!("       - {error}");
        }
    }

    let passed = results.iter().filter(|r| r.is_pass()).count();
    println!("\n  {passed}/{} passed", results.len());
    Ok(())
}
