//! Config commands (show, paths, validate)

use std::path::Path;

use anyhow::{Context, Result};
use nudge_core::{default_config_path, default_model_path, EngineConfig};

use super::{load_config, EngineArgs};

pub fn cmd_config_show(engine: &EngineArgs<'_>, json: bool) -> Result<()> {
    let config = load_config(engine)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let a = &config.anomaly;
    let w = &config.weights;
    let r = &config.risk;

    println!();
    println!("⚙️  Engine Configuration");
    println!("   ─────────────────────────────");
    println!("   Anomaly z-threshold:     {}", a.z_threshold);
    println!("   High severity above:     {:.2}", a.high_severity_cutoff());
    println!(
        "   Overspend window:        {} days at {}x",
        a.overspend_window_days, a.overspend_ratio
    );
    println!(
        "   Weights:                 delivery {} / volatility {} / anomalies {} / overspending {}",
        w.delivery_ratio, w.volatility, w.anomaly_frequency, w.overspending
    );
    println!(
        "   Risk cut points:         moderate {} / high {}",
        r.moderate_cutoff, r.high_cutoff
    );
    println!("   Factor materiality:      {}", r.materiality);
    println!("   Categories:              {}", config.categories.join(", "));
    println!(
        "   Delivery categories:     {}",
        config.delivery_categories.join(", ")
    );
    println!();

    Ok(())
}

pub fn cmd_config_paths() -> Result<()> {
    let show = |label: &str, path: Option<std::path::PathBuf>| match path {
        Some(p) => {
            let state = if p.exists() { "present" } else { "not found" };
            println!("   {}: {} ({})", label, p.display(), state);
        }
        None => println!("   {}: (no data directory on this platform)", label),
    };

    println!();
    println!("📁 Lookup Paths");
    println!("   ─────────────────────────────");
    show("Config", default_config_path());
    show("Model ", default_model_path());
    println!();

    Ok(())
}

pub fn cmd_config_validate(path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    EngineConfig::from_toml_str(&content)
        .with_context(|| format!("{} is not a valid engine config", path.display()))?;

    println!("✅ {} is valid", path.display());
    Ok(())
}
