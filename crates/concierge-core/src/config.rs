use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::provider::Provider;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub provider: Option<String>,
    pub default_model: Option<String>,
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub ollama_url: Option<String>,
    /// JSON file overriding the built-in knowledge base
    pub knowledge_path: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            provider: Some(Provider::default().as_str().to_string()),
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {}: {}", config_path.display(), e))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn provider(&self) -> Result<Provider> {
        match self.provider.as_deref() {
            Some(name) => Ok(name.parse()?),
            None => Ok(Provider::default()),
        }
    }

    /// Configured model, or the provider's default
    pub fn model_for(&self, provider: Provider) -> String {
        self.default_model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| provider.default_model().to_string())
    }

    pub fn ollama_url(&self) -> &str {
        self.ollama_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL)
    }

    /// Resolve the credential for `provider` - env vars first, then config
    pub fn api_key(&self, provider: Provider) -> Option<String> {
        self.api_key_with(provider, |name| std::env::var(name).ok())
    }

    fn api_key_with(
        &self,
        provider: Provider,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<String> {
        let from_config = match provider {
            Provider::Gemini => self.gemini_api_key.clone(),
            Provider::OpenAI => self.openai_api_key.clone(),
            Provider::Ollama => None,
        };

        // A variable that is set but blank does not shadow the next one
        provider
            .api_key_env()
            .iter()
            .filter_map(|name| env(name))
            .chain(from_config)
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("kenmark-concierge").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.provider().unwrap(), Provider::Gemini);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            provider: Some("ollama".to_string()),
            default_model: Some("gemma3:latest".to_string()),
            ollama_url: Some("http://gpu-box:11434".to_string()),
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.provider().unwrap(), Provider::Ollama);
        assert_eq!(loaded.ollama_url(), "http://gpu-box:11434");
    }

    #[test]
    fn test_invalid_json_names_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("config.json"));
    }

    #[test]
    fn test_env_key_wins_over_config() {
        let config = Config {
            gemini_api_key: Some("from-config".to_string()),
            ..Config::default()
        };
        let key = config.api_key_with(Provider::Gemini, |name| {
            (name == "API_KEY").then(|| "from-env".to_string())
        });
        assert_eq!(key.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_blank_keys_count_as_missing() {
        let config = Config {
            openai_api_key: Some("   ".to_string()),
            ..Config::default()
        };
        assert!(config.api_key_with(Provider::OpenAI, |_| Some(String::new())).is_none());
    }

    #[test]
    fn test_blank_gemini_key_falls_through_to_api_key() {
        let config = Config::default();
        let key = config.api_key_with(Provider::Gemini, |name| match name {
            "GEMINI_API_KEY" => Some(String::new()),
            "API_KEY" => Some("real-key".to_string()),
            _ => None,
        });
        assert_eq!(key.as_deref(), Some("real-key"));
    }

    #[test]
    fn test_config_key_used_when_env_unset() {
        let config = Config {
            openai_api_key: Some("sk-test".to_string()),
            ..Config::default()
        };
        let key = config.api_key_with(Provider::OpenAI, |_| None);
        assert_eq!(key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_model_falls_back_to_provider_default() {
        let config = Config::new();
        assert_eq!(config.model_for(Provider::Gemini), "gemini-2.5-flash");
    }
}
