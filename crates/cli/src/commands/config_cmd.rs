//! `triad config`: Settings file management.

use std::path::Path;
use triad_config::Settings;

pub async fn show(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load_from(path).map_err(|e| format!("Failed to load config: {e}"))?;
    print!("{}", settings.to_yaml()?);
    Ok(())
}

pub async fn path(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", path.display());
    Ok(())
}

pub async fn init(path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if !force {
            println!("⚠️  {} already exists (use --force to overwrite)", path.display());
            return Ok(());
        }
        std::fs::remove_file(path)?;
    }

    // Loading a missing file writes the defaults.
    let settings = Settings::load_from(path)?;
    println!("✅ Wrote {} ({} environment)", path.display(), settings.environment);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_creates_then_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configs").join("test.yaml");

        init(&path, false).await.unwrap();
        assert!(path.exists());

        std::fs::write(&path, "timeout_seconds: 7\n").unwrap();
        init(&path, false).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "timeout_seconds: 7\n");

        init(&path, true).await.unwrap();
        let reloaded = Settings::load_from(&path).unwrap();
        assert_eq!(reloaded.timeout_seconds, 30);
    }
}
