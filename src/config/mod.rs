pub mod schema;

pub use schema::AutomatonConfig;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Default automaton home directory (~/.automaton).
pub fn default_home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".automaton"))
        .unwrap_or_else(|| PathBuf::from(".automaton"))
}

/// Load config from the given path (JSON), or return defaults, then apply
/// environment-variable overrides on top (spec.md §6).
pub fn load_config(path: &Path) -> Result<AutomatonConfig> {
    let mut config = if path.exists() {
        let contents =
            std::fs::read_to_string(path).context("Failed to read automaton config file")?;
        serde_json::from_str(&contents).context("Failed to parse automaton config (JSON)")?
    } else {
        AutomatonConfig::default()
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

/// Save config to the given path (JSON format).
pub fn save_config(config: &AutomatonConfig, path: &Path) -> Result<()> {
    let contents = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents).context("Failed to write config file")?;
    Ok(())
}

/// Apply the documented environment variable overrides on top of file values.
fn apply_env_overrides(config: &mut AutomatonConfig) {
    if let Ok(v) = std::env::var("CONWAY_API_URL") {
        config.conway_api_url = v;
    }
    if let Ok(v) = std::env::var("CONWAY_API_KEY") {
        config.conway_api_key = v;
    }
    if let Ok(v) = std::env::var("OPENAI_BASE_URL") {
        config.openai_base_url = v;
    }
    if let Ok(v) = std::env::var("ANTHROPIC_BASE_URL") {
        config.anthropic_base_url = v;
    }
    if let Ok(v) = std::env::var("OLLAMA_BASE_URL") {
        config.ollama_base_url = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("automaton.json");

        let mut original = AutomatonConfig::default();
        original.name = "test-agent".into();
        original.inference_model = "gpt-4o".into();
        save_config(&original, &path).unwrap();

        std::env::remove_var("CONWAY_API_URL");
        let reloaded = load_config(&path).unwrap();

        assert_eq!(reloaded.name, original.name);
        assert_eq!(reloaded.inference_model, original.inference_model);
        assert_eq!(reloaded.conway_api_url, original.conway_api_url);
    }

    #[test]
    fn env_override_applies_after_file_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("automaton.json");
        save_config(&AutomatonConfig::default(), &path).unwrap();

        std::env::set_var("CONWAY_API_URL", "https://override.example");
        let config = load_config(&path).unwrap();
        std::env::remove_var("CONWAY_API_URL");

        assert_eq!(config.conway_api_url, "https://override.example");
    }
}
