//! `triad analyze`: Profile a request and recommend a configuration.

use std::sync::Arc;
use tracing::info;
use triad_config::Settings;
use triad_integration::{ConversationalProfiler, analysis_summary};

pub async fn run(
    settings: Settings,
    text: &str,
    framework: Option<&str>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(framework = framework.unwrap_or("universal"), "Analyzing request");
    let profiler = ConversationalProfiler::new(Arc::new(settings));
    let response = profiler.process_user_request(text, framework)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("🔺 triad analysis");
    println!("=================\n");
    println!("{}\n", analysis_summary(&response.analysis));

    let config = &response.recommendations.framework_specific_configurations;
    println!("## Recommended configuration ({})", config.target_framework);
    println!("- Identified requirements: {}", config.identified_requirements);
    println!("- Confidence: {:.2}", config.confidence_score);
    for advice in &response.recommendations.technical_recommendations.performance_recommendations {
        println!("- {advice}");
    }
    println!();
    println!("{}", config.configuration_template);

    Ok(())
}
