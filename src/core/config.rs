use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::core::constants::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};

/// Persistent settings, stored as TOML in the platform config directory.
/// Every field is optional; unset values fall back to built-in defaults so a
/// missing file behaves like a fresh install.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    /// Sampling temperature, 0.0 through 2.0.
    pub temperature: Option<f64>,
    /// Response length cap, sent to the server as `num_predict`.
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
}

impl Config {
    pub fn load() -> Result<Config, Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path();
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path();
        self.save_to_path(&config_path)
    }

    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    fn get_config_path() -> PathBuf {
        let proj_dirs = ProjectDirs::from("org", "permacommons", "charla")
            .expect("Failed to determine config directory");
        proj_dirs.config_dir().join("config.toml")
    }

    pub fn temperature_or_default(&self) -> f64 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn max_tokens_or_default(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
        match key {
            "base-url" => self.base_url = Some(value.to_string()),
            "default-model" => self.default_model = Some(value.to_string()),
            "temperature" => {
                let temperature: f64 = value.parse()?;
                if !(0.0..=2.0).contains(&temperature) {
                    return Err(format!("temperature {temperature} is outside 0.0..=2.0").into());
                }
                self.temperature = Some(temperature);
            }
            "max-tokens" => {
                let max_tokens: u32 = value.parse()?;
                if max_tokens == 0 {
                    return Err("max-tokens must be positive".into());
                }
                self.max_tokens = Some(max_tokens);
            }
            "system-prompt" => self.system_prompt = Some(value.to_string()),
            _ => return Err(format!("unknown configuration key: {key}").into()),
        }
        Ok(())
    }

    pub fn unset(&mut self, key: &str) -> Result<(), Box<dyn std::error::Error>> {
        match key {
            "base-url" => self.base_url = None,
            "default-model" => self.default_model = None,
            "temperature" => self.temperature = None,
            "max-tokens" => self.max_tokens = None,
            "system-prompt" => self.system_prompt = None,
            _ => return Err(format!("unknown configuration key: {key}").into()),
        }
        Ok(())
    }

    pub fn print_all(&self) {
        println!("Current configuration:");
        match &self.base_url {
            Some(url) => println!("  base-url: {url}"),
            None => println!("  base-url: (unset)"),
        }
        match &self.default_model {
            Some(model) => println!("  default-model: {model}"),
            None => println!("  default-model: (unset)"),
        }
        println!("  temperature: {}", self.temperature_or_default());
        println!("  max-tokens: {}", self.max_tokens_or_default());
        match &self.system_prompt {
            Some(prompt) => println!("  system-prompt: {prompt}"),
            None => println!("  system-prompt: (unset)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let config = Config::load_from_path(&path).expect("load");
        assert!(config.default_model.is_none());
        assert_eq!(config.temperature_or_default(), 0.7);
        assert_eq!(config.max_tokens_or_default(), 2000);
    }

    #[test]
    fn round_trips_through_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.set("default-model", "llama3.2").expect("set");
        config.set("temperature", "1.2").expect("set");
        config.save_to_path(&path).expect("save");

        let restored = Config::load_from_path(&path).expect("load");
        assert_eq!(restored.default_model.as_deref(), Some("llama3.2"));
        assert_eq!(restored.temperature, Some(1.2));
        assert!(restored.max_tokens.is_none());
    }

    #[test]
    fn rejects_out_of_range_values_and_unknown_keys() {
        let mut config = Config::default();
        assert!(config.set("temperature", "3.0").is_err());
        assert!(config.set("max-tokens", "0").is_err());
        assert!(config.set("favorite-color", "teal").is_err());
        assert!(config.unset("favorite-color").is_err());
    }
}
