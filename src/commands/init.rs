use anyhow::{Context, Result};
use moviedex::config::Config;
use std::path::Path;

const HEADER: &str = "# Moviedex Configuration
#
# Every value below is the built-in default. Environment variables named
# MOVIEDEX_* override the file (e.g. MOVIEDEX_REQUEST_DELAY_MS,
# MOVIEDEX_DAILY_AT, MOVIEDEX_CHART_TOP_250_URL).

";

pub fn init_config(path: &Path) -> Result<()> {
    let config = Config::default();
    let config_path = path.join("moviedex.toml");
    if config_path.exists() {
        anyhow::bail!("{} already exists", config_path.display());
    }

    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory '{}'", path.display()))?;
    let toml_content = format!("{}{}", HEADER, config.to_toml()?);
    std::fs::write(&config_path, toml_content)?;
    println!("Created configuration file: {}", config_path.display());

    let data_dir = path.join(&config.store.data_dir);
    std::fs::create_dir_all(&data_dir)?;
    println!("Created data directory: {}", data_dir.display());

    Ok(())
}
