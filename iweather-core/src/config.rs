use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf};
use tracing::{debug, warn};

use crate::{
    dispatcher::WeatherDispatcher,
    location::{Location, RawPosition},
    provider::{ProviderId, provider_from_config},
};

/// Configuration for a single provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,

    /// Overrides the provider's public endpoint, e.g. for a self-hosted proxy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Optional default provider id, e.g. "qWeather" or "openWeather".
    pub default_provider: Option<String>,

    /// Example TOML:
    /// [providers.qWeather]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// HTTP timeout for provider requests.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Location shown before the device position is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<RawPosition>,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_provider: None,
            providers: HashMap::new(),
            timeout_secs: default_timeout_secs(),
            location: None,
        }
    }
}

impl Config {
    /// Return the default provider as a strongly-typed ProviderId.
    pub fn default_provider_id(&self) -> Result<ProviderId> {
        let s = self.default_provider.as_ref().ok_or_else(|| {
            anyhow::anyhow!(
                "No default provider configured.\n\
                 Hint: run `iweather configure <provider>` (e.g. `iweather configure qWeather`) first."
            )
        })?;

        ProviderId::try_from(s.as_str())
    }

    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Store default provider as string.
    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id.as_str().to_string());
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "iweather", "iweather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Convenience helper: set/replace a provider API key and set the default
    /// provider if none is set yet.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers
            .entry(provider_id.as_str().to_string())
            .and_modify(|cfg| cfg.api_key = api_key.clone())
            .or_insert(ProviderConfig {
                api_key,
                base_url: None,
            });

        if self.default_provider.is_none() {
            self.default_provider = Some(provider_id.to_string());
        }
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id).map(|cfg| cfg.api_key.as_str())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_api_key(provider_id).is_some()
    }

    /// Apply API keys from the environment on top of the file contents.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for id in ProviderId::all() {
            if let Some(key) = lookup(id.api_key_env()).filter(|k| !k.trim().is_empty()) {
                debug!(provider = %id, "API key taken from environment");
                self.upsert_provider_api_key(*id, key);
            }
        }
    }

    /// Starting location: the configured one if valid, else the built-in default.
    pub fn initial_location(&self) -> Location {
        match self.location.clone().map(Location::try_from) {
            Some(Ok(location)) => location,
            Some(Err(err)) => {
                warn!(%err, "configured location is invalid, using default");
                Location::default()
            }
            None => Location::default(),
        }
    }

    /// Register every configured built-in provider and select the default.
    pub fn build_dispatcher(&self) -> Result<WeatherDispatcher> {
        let mut builder = WeatherDispatcher::builder();
        let mut first = None;

        for id in ProviderId::all() {
            if !self.is_provider_configured(*id) {
                continue;
            }
            let provider = provider_from_config(*id, self)?;
            builder = builder.register_boxed(id.as_str(), provider);
            first.get_or_insert(*id);
        }

        let active = match self.default_provider_id() {
            Ok(id) if self.is_provider_configured(id) => id,
            _ => first.ok_or_else(|| {
                anyhow!(
                    "No weather provider has an API key.\n\
                     Hint: run `iweather configure qWeather` or set IWEATHER_QWEATHER_KEY."
                )
            })?,
        };

        Ok(builder.build(active.as_str())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderId;

    #[test]
    fn default_provider_id_errors_when_not_set() {
        let cfg = Config::default();
        let err = cfg.default_provider_id().unwrap_err();

        assert!(err.to_string().contains("No default provider configured"));
    }

    #[test]
    fn set_api_key_and_default_for_provider() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::QWeather, "QW_KEY".into());

        let default = cfg.default_provider_id().expect("default provider must exist");
        assert_eq!(default, ProviderId::QWeather);

        assert_eq!(cfg.provider_api_key(ProviderId::QWeather), Some("QW_KEY"));
        assert!(cfg.is_provider_configured(ProviderId::QWeather));
    }

    #[test]
    fn upsert_keeps_default_and_base_url() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::QWeather, "QW_KEY".into());
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OW_KEY".into());
        if let Some(p) = cfg.providers.get_mut("openWeather") {
            p.base_url = Some("http://localhost:9000".into());
        }
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OW_KEY_2".into());

        assert_eq!(cfg.default_provider_id().expect("default"), ProviderId::QWeather);
        let ow = cfg.provider_config(ProviderId::OpenWeather).expect("configured");
        assert_eq!(ow.api_key, "OW_KEY_2");
        assert_eq!(ow.base_url.as_deref(), Some("http://localhost:9000"));
    }

    #[test]
    fn set_default_provider_overrides_default() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::QWeather, "QW_KEY".into());
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OW_KEY".into());
        cfg.set_default_provider(ProviderId::OpenWeather);

        let default = cfg.default_provider_id().expect("default provider must exist");
        assert_eq!(default, ProviderId::OpenWeather);
    }

    #[test]
    fn env_keys_override_file_keys() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::QWeather, "FILE_KEY".into());

        cfg.apply_env_with(|name| match name {
            "IWEATHER_QWEATHER_KEY" => Some("ENV_KEY".into()),
            "IWEATHER_OPENWEATHER_KEY" => Some("  ".into()),
            _ => None,
        });

        assert_eq!(cfg.provider_api_key(ProviderId::QWeather), Some("ENV_KEY"));
        assert!(!cfg.is_provider_configured(ProviderId::OpenWeather));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OW_KEY".into());
        cfg.location = Some(RawPosition {
            latitude: 22.5431,
            longitude: 114.0579,
            city: "深圳市".into(),
            address: "市民中心".into(),
        });
        cfg.save_to(&path).expect("save");

        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded.provider_api_key(ProviderId::OpenWeather), Some("OW_KEY"));
        assert_eq!(loaded.timeout_secs, 10);
        assert_eq!(loaded.initial_location().city(), "深圳市");
    }

    #[test]
    fn build_dispatcher_requires_a_key() {
        let err = Config::default().build_dispatcher().unwrap_err();
        assert!(err.to_string().contains("No weather provider has an API key"));
    }

    #[test]
    fn build_dispatcher_falls_back_to_first_configured() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OW_KEY".into());
        cfg.default_provider = Some("qWeather".into());

        let dispatcher = cfg.build_dispatcher().expect("build");
        assert_eq!(dispatcher.active_name(), "openWeather");
        assert_eq!(dispatcher.provider_names(), vec!["openWeather".to_string()]);
    }
}
