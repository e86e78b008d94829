//! `triad monitor`: Unified monitoring across all pillars.

use std::sync::Arc;
use triad_config::Settings;
use triad_integration::IntegrationLayer;

pub async fn run(settings: Settings, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !settings.enable_monitoring {
        println!("⚠️  Monitoring is disabled in settings");
        return Ok(());
    }

    let layer = IntegrationLayer::new(Arc::new(settings));
    let report = layer.unified_monitoring()?;
    let dashboard = layer.integration_dashboard();

    if json {
        let combined = serde_json::json!({ "report": report, "dashboard": dashboard });
        println!("{}", serde_json::to_string_pretty(&combined)?);
        return Ok(());
    }

    let technical = &report.technical_pillar;
    let behavioral = &report.behavioral_pillar;
    let semantic = &report.semantic_pillar.semantic_report;

    println!("📊 triad Monitor");
    println!("================");
    println!("  Technical");
    println!(
        "    Profiles active:     {}/{}",
        technical.activation_stats.active_profiles, technical.activation_stats.total_profiles
    );
    println!("    Validations run:     {}", technical.validation_stats.total_validations);
    println!(
        "    Components:          {}",
        technical.infrastructure_report.summary.total_components
    );
    println!("    Reliability:         {}", technical.sre_dashboard.reliability_metrics);
    println!("  Behavioral");
    println!(
        "    Patterns:            {}",
        behavioral.patterns_report.summary.total_patterns
    );
    println!(
        "    Current drifts:      {}",
        behavioral.cognitive_report.drifts.current.len()
    );
    println!("  Semantic");
    println!("    Phrase mappings:     {}", semantic.summary.total_mappings);
    println!("    Knowledge graphs:    {}", semantic.summary.total_knowledge_graphs);

    println!();
    for (name, health) in [
        ("technical", &dashboard.pillar_health.technical),
        ("behavioral", &dashboard.pillar_health.behavioral),
        ("semantic", &dashboard.pillar_health.semantic),
    ] {
        let mark = if health.status == "healthy" { "✅" } else { "⚠️ " };
        println!(
            "  {mark} {name:<11} {} ({} components)",
            health.status, health.components_monitored
        );
    }
    println!(
        "\n  Integration events: {}",
        dashboard.overview.total_integrated_events
    );
    Ok(())
}
