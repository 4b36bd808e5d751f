use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Persistent settings. The interpreter path is written back once discovery
/// or manual entry resolves it, so later sessions skip the probe dance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Path to the host application's embedded Python executable.
    pub python_path: Option<PathBuf>,
    /// Install prefix of the host application, used by discovery.
    pub host_prefix: Option<PathBuf>,
}

impl Config {
    fn config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".config/pipdeck/config.toml")
    }

    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&config_path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_round_trip() {
        let config = Config {
            python_path: Some(PathBuf::from("/opt/host/bin/python3")),
            host_prefix: Some(PathBuf::from("/opt/host")),
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.python_path, config.python_path);
        assert_eq!(back.host_prefix, config.host_prefix);
    }

    #[test]
    fn missing_fields_default_to_none() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.python_path.is_none());
        assert!(config.host_prefix.is_none());
    }
}
