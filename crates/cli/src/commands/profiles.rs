//! `triad profiles`: List or activate activation profiles.

use std::sync::Arc;
use triad_activation::ActivationContext;
use triad_config::Settings;
use triad_integration::IntegrationLayer;

pub async fn list(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let layer = IntegrationLayer::new(Arc::new(settings));
    print_profiles(&layer);
    Ok(())
}

/// Activation state lives in this process only; the listing shows what one
/// synergy activation switches on from a cold start.
pub async fn activate(
    settings: Settings,
    context: &str,
    predict: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let context: ActivationContext = context.parse()?;
    let layer = IntegrationLayer::new(Arc::new(settings));

    let activated = if predict {
        layer.activation().activate_by_context(context, None, true)
    } else {
        layer.trigger_synergy_activation(context)
    };

    if activated.is_empty() {
        println!("⚠️  No {context} profiles could be activated");
    } else {
        println!("⚡ Activated: {}", activated.join(", "));
    }
    println!();
    print_profiles(&layer);
    Ok(())
}

fn print_profiles(layer: &IntegrationLayer) {
    println!("🎛️  Activation Profiles");
    println!("======================");
    for profile in layer.activation().profiles() {
        let mark = if profile.active { "🟢" } else { "⚪" };
        println!(
            "  {mark} {:<26} {:<12} priority {:>2}",
            profile.id,
            profile.context.as_str(),
            profile.priority
        );
        if !profile.dependencies.is_empty() {
            println!("       depends on: {}", profile.dependencies.join(", "));
        }
    }
    let stats = layer.activation().stats();
    println!("\n  {}/{} active", stats.active_profiles, stats.total_profiles);
}
