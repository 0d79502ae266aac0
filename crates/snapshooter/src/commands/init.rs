use std::path::Path;

use anyhow::{Result, bail};

use snapshooter::config;

/// `snapshooter init`: create .snapshooter/config.toml.
pub fn init(reference_dir: &Path, force: bool) -> Result<()> {
    if !force && config::config_file_exists() {
        bail!(".snapshooter/config.toml already exists (use --force to overwrite)");
    }

    config::write_template(reference_dir)?;

    let verb = if force { "Regenerated" } else { "Created" };
    println!("{verb} .snapshooter/config.toml");
    println!("  store.reference_dir = {}", reference_dir.display());
    Ok(())
}
