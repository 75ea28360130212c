//! Write a default config file.

use clipcraft_common::config::SettingsStore;
use clipcraft_model::AppSettings;

pub fn run(store: &SettingsStore, force: bool) -> anyhow::Result<()> {
    let path = store.path();
    if path.exists() && !force {
        println!("Config already exists at {}", path.display());
        println!("Use --force to overwrite it with defaults.");
        return Ok(());
    }

    store
        .save(&AppSettings::default())
        .map_err(|e| anyhow::anyhow!("Failed to write config: {e}"))?;

    println!("Wrote default config to {}", path.display());
    Ok(())
}
