//! `triad status`: Show settings and subsystem inventory.

use std::path::Path;
use std::sync::Arc;
use triad_config::Settings;
use triad_integration::IntegrationLayer;

pub async fn run(settings: Settings, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔺 triad Status");
    println!("===============");
    println!("  Config file:   {}", config_path.display());
    println!("  Environment:   {}", settings.environment);
    println!("  Log level:     {}", settings.log_level);
    println!("  Debug:         {}", on_off(settings.debug));
    println!("  Monitoring:    {}", on_off(settings.enable_monitoring));
    println!("  Validation:    {}", on_off(settings.enable_validation));
    println!("  Timeout:       {}s", settings.timeout_seconds);
    println!("  Max workers:   {}", settings.max_workers);

    let layer = IntegrationLayer::new(Arc::new(settings));
    let memory = layer.memory().statistics();
    let rules = layer.gates().rules();
    let enabled = rules.iter().filter(|r| r.enabled).count();
    let infrastructure = layer.infrastructure_architect().infrastructure_report();
    let semantic = layer.domain_linguist().semantic_report();

    println!();
    println!("  Gate rules:    {enabled}/{} enabled", rules.len());
    println!("  Profiles:      {}", layer.activation().profiles().len());
    println!("  Components:    {}", infrastructure.summary.total_components);
    println!(
        "  Frameworks:    {}",
        semantic
            .summary
            .frameworks_supported
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "  Memory:        {} short-term, {} long-term",
        memory.short_term.count, memory.long_term.count
    );

    Ok(())
}

fn on_off(flag: bool) -> &'static str {
    if flag { "enabled" } else { "disabled" }
}
