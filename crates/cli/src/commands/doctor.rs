//! `triad doctor`: Diagnose configuration and engine health.

use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use triad_config::Settings;
use triad_integration::IntegrationLayer;

pub async fn run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 triad Doctor: System Diagnostics");
    println!("===================================\n");

    let mut issues = 0;

    let settings = match Settings::load_from(config_path) {
        Ok(settings) => {
            println!("  ✅ Config file valid ({})", config_path.display());
            settings
        }
        Err(e) => {
            println!("  ❌ Config file invalid: {e}");
            println!("\n  ⚠️  Fix the settings file and run `triad doctor` again.");
            return Ok(());
        }
    };

    if settings.is_production() && settings.debug {
        println!("  ⚠️  Debug is enabled in production");
        issues += 1;
    }
    if !settings.enable_validation {
        println!("  ⚠️  Validation is disabled");
        issues += 1;
    }

    let layer = IntegrationLayer::new(Arc::new(settings));

    let results = layer.gates().validate_all(Some(&json!({})), None);
    let errored = results
        .iter()
        .filter(|r| r.message.starts_with("Validation rule failed with exception"))
        .count();
    if errored == 0 {
        println!("  ✅ {} validation rules ran without errors", results.len());
    } else {
        println!("  ❌ {errored} validation rule(s) raised errors");
        issues += 1;
    }

    let infrastructure = layer.infrastructure_architect().validate_infrastructure(None)?;
    println!(
        "  ✅ Infrastructure inventory: {} components",
        infrastructure.components_count
    );

    let bridge = layer
        .domain_linguist()
        .build_semantic_bridge("make the agents talk to each other", "autogen")?;
    if bridge.overall_success {
        println!("  ✅ Semantic bridge healthy");
    } else {
        println!("  ⚠️  Semantic bridge did not succeed on the reference phrase");
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
