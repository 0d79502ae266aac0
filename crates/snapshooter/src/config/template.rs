use std::path::Path;

use anyhow::{Context, Result};

use super::{CONFIG_DIR, config_path};

/// Hand-crafted config template with commented-out keys.
/// Used by `snapshooter init` instead of `toml::to_string_pretty()` so that
/// users can see the available knobs and their defaults.
const CONFIG_TEMPLATE: &str = r#"# ─────────────────────────────────────────────────────────
# Comparison: all fields optional.
# ─────────────────────────────────────────────────────────
[compare]
# tolerance = 0                     # max per-channel difference (0 = exact)
# threshold = 0.98                  # min similarity for a snapshot to pass

# ─────────────────────────────────────────────────────────
# Snapshot storage: all fields optional.
# ─────────────────────────────────────────────────────────
[store]
reference_dir = "{reference_dir}"
# output_dir = "/tmp/Snapshots"     # failure artifacts (default: system temp dir)
# scale = 3.0                       # display scale of reference PNGs
"#;

pub fn config_file_exists() -> bool {
    config_path().exists()
}

pub fn render_template(reference_dir: &Path) -> String {
    CONFIG_TEMPLATE.replace("{reference_dir}", &reference_dir.to_string_lossy())
}

/// Write the hand-crafted config template (with commented-out keys).
pub fn write_template(reference_dir: &Path) -> Result<()> {
    let dir = Path::new(CONFIG_DIR);
    std::fs::create_dir_all(dir).context("Failed to create .snapshooter directory")?;
    let path = config_path();
    std::fs::write(&path, render_template(reference_dir))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
