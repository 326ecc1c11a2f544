//! TOML configuration loading.
//!
//! Every section is optional; missing keys take the engine defaults. The
//! loaded config is validated before it is returned.

use std::path::Path;

use anyhow::{Context, Result};
use chaosfeed_core::SimulationConfig;

/// Load a config from a TOML file.
pub fn from_file(path: &Path) -> Result<SimulationConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    from_toml(&content).with_context(|| format!("invalid config file: {}", path.display()))
}

/// Parse and validate a config from a TOML string.
pub fn from_toml(content: &str) -> Result<SimulationConfig> {
    let config: SimulationConfig = toml::from_str(content).context("failed to parse TOML")?;
    config.validate()?;
    Ok(config)
}

/// The file at `path` if given, otherwise the defaults.
pub fn load(path: Option<&Path>) -> Result<SimulationConfig> {
    match path {
        Some(path) => from_file(path),
        None => Ok(SimulationConfig::default()),
    }
}
