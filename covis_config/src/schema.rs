use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// Engine parameters live next to the components they configure.
use covis_engine::EngineParams;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineParams,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    /// Imported similarities retained per source record.
    #[serde(default = "StoreConfig::default_max_sims_per_record")]
    pub max_sims_per_record: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_sims_per_record: Self::default_max_sims_per_record(),
        }
    }
}

impl StoreConfig {
    const fn default_max_sims_per_record() -> usize {
        100
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("covis");

        let config_path = config_dir.join("config.json");

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'covis init' to create config.",
                config_path.display()
            );
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = serde_json::from_str(&content)?;

        Ok(config)
    }

    /// Loads the config file when it exists; falls back to the defaults
    /// otherwise.
    pub fn load_or_default() -> anyhow::Result<Self> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("covis");

        if config_dir.join("config.json").exists() {
            Self::load()
        } else {
            Ok(Self::default())
        }
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("covis");

        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join("config.json");

        if config_path.exists() {
            tracing::info!("Config already exists at: {}", config_path.display());
            return Ok(());
        }

        let config = Self::default();
        let content = serde_json::to_string_pretty(&config)?;
        std::fs::write(&config_path, content)?;
        tracing::info!("Created default config at: {}", config_path.display());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn empty_json_yields_the_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();

        assert_eq!(config.store.max_sims_per_record, 100);
        assert_eq!(config.engine.item_based.neighbourhood_size, 10);
    }

    #[test]
    fn defaults_roundtrip_through_json() {
        let config = Config::default();

        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.engine, config.engine);
        assert_eq!(
            parsed.store.max_sims_per_record,
            config.store.max_sims_per_record
        );
    }
}
