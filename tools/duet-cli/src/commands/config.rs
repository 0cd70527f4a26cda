//! Show or initialize the configuration file.

use anyhow::Context;

use duet_common::config::AppConfig;

pub fn show() -> anyhow::Result<()> {
    let path = AppConfig::path();
    let source = if path.exists() { "file" } else { "defaults" };
    println!("# {} ({source})", path.display());
    println!("{}", serde_json::to_string_pretty(&AppConfig::load())?);
    Ok(())
}

pub fn init(force: bool) -> anyhow::Result<()> {
    let path = AppConfig::path();
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    AppConfig::default()
        .save()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
