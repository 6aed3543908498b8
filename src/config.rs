use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Keys accepted in `config.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    api_key: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            source: None,
        }
    }
}

impl Config {
    /// Loads `config.toml` from the user config dir (if present), then `.env`,
    /// then environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let mut config = match &path {
            Some(p) if p.exists() => Self::from_file(p)?,
            _ => Self::default(),
        };

        dotenvy::dotenv().ok();
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "atscore")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn log_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("", "", "atscore") {
            dirs.data_dir().join("atscore.log")
        } else {
            PathBuf::from("atscore.log")
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    fn from_toml(raw: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(raw)?;
        let defaults = Self::default();
        Ok(Self {
            api_key: file.api_key.filter(|k| !k.trim().is_empty()),
            model: file.model.unwrap_or(defaults.model),
            endpoint: file.endpoint.unwrap_or(defaults.endpoint),
            timeout: file
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            source: None,
        })
    }

    /// Environment wins over the file. `GEMINI_API_KEY` takes precedence over `API_KEY`.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(model) = non_empty("ATSCORE_MODEL") {
            self.model = model;
        }
        if let Some(endpoint) = non_empty("ATSCORE_ENDPOINT") {
            self.endpoint = endpoint;
        }
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            anyhow!(
                "No API key configured. Set it with: export GEMINI_API_KEY=your-key-here \
                 (or add api_key to {})",
                Self::default_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "config.toml".to_string())
            )
        })
    }

    pub fn redacted_key(&self) -> String {
        match &self.api_key {
            Some(key) if key.chars().count() > 8 => {
                let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
                format!("****{}", tail)
            }
            Some(_) => "****".to_string(),
            None => "(not set)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.model, "flash");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_from_toml() {
        let config = Config::from_toml(
            "api_key = \"file-key\"\nmodel = \"pro\"\ntimeout_secs = 30\n",
        )
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("file-key"));
        assert_eq!(config.model, "pro");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        assert!(Config::from_toml("apikey = \"typo\"").is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::from_toml("api_key = \"file-key\"").unwrap();
        config.apply_env(env_of(&[("GEMINI_API_KEY", "env-key"), ("ATSCORE_MODEL", "pro")]));
        assert_eq!(config.api_key.as_deref(), Some("env-key"));
        assert_eq!(config.model, "pro");
    }

    #[test]
    fn test_api_key_fallback_and_precedence() {
        let mut config = Config::default();
        config.apply_env(env_of(&[("API_KEY", "generic")]));
        assert_eq!(config.api_key.as_deref(), Some("generic"));

        let mut config = Config::default();
        config.apply_env(env_of(&[("API_KEY", "generic"), ("GEMINI_API_KEY", "gemini")]));
        assert_eq!(config.api_key.as_deref(), Some("gemini"));

        let mut config = Config::default();
        config.apply_env(env_of(&[("GEMINI_API_KEY", "  ")]));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_require_api_key() {
        let config = Config::default();
        let err = config.require_api_key().unwrap_err().to_string();
        assert!(err.contains("GEMINI_API_KEY"));

        let config = Config {
            api_key: Some("abc".to_string()),
            ..Config::default()
        };
        assert_eq!(config.require_api_key().unwrap(), "abc");
    }

    #[test]
    fn test_redacted_key() {
        let config = Config {
            api_key: Some("AIzaSyExampleKey1234".to_string()),
            ..Config::default()
        };
        assert_eq!(config.redacted_key(), "****1234");
        assert_eq!(Config::default().redacted_key(), "(not set)");
    }
}
