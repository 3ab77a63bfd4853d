// SmartMark Config Engine
// Manages the application configuration: loading, saving, updating individual values,
// resetting to defaults, and layering environment overrides on top.
// The configuration is stored as a JSON file at the platform-specific config path.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::platform;
use crate::types::config::{BackendKind, SmartMarkConfig};
use crate::types::errors::ConfigError;

pub const ENV_CONFIG: &str = "SMARTMARK_CONFIG";
pub const ENV_BACKEND: &str = "SMARTMARK_BACKEND";
pub const ENV_SUPABASE_URL: &str = "SMARTMARK_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SMARTMARK_SUPABASE_ANON_KEY";
pub const ENV_ACCESS_TOKEN: &str = "SMARTMARK_ACCESS_TOKEN";
pub const ENV_LOG: &str = "SMARTMARK_LOG";

/// Variables layered over the file by `load_with_env`.
const OVERRIDE_VARS: [&str; 4] = [ENV_BACKEND, ENV_SUPABASE_URL, ENV_SUPABASE_ANON_KEY, ENV_LOG];

/// Trait defining the config engine interface.
pub trait ConfigEngineTrait {
    fn load(&mut self) -> Result<SmartMarkConfig, ConfigError>;
    fn save(&self) -> Result<(), ConfigError>;
    fn get_config(&self) -> &SmartMarkConfig;
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), ConfigError>;
    fn reset(&mut self) -> Result<(), ConfigError>;
    fn get_config_path(&self) -> &str;
}

/// Config engine that persists the configuration as JSON on disk.
///
/// Environment overrides live only in the effective configuration returned
/// by `get_config`; `save` writes the file-backed values alone.
pub struct ConfigEngine {
    config_path: String,
    config: SmartMarkConfig,
    effective: SmartMarkConfig,
    overrides: HashMap<String, String>,
}

impl ConfigEngine {
    /// Creates a new ConfigEngine.
    ///
    /// If `path_override` is `Some`, uses that path for the config file.
    /// Otherwise, uses the platform-specific config directory with `config.json`.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = match path_override {
            Some(p) => p,
            None => platform::get_config_dir()
                .join("config.json")
                .to_string_lossy()
                .to_string(),
        };

        Self {
            config_path,
            config: SmartMarkConfig::default(),
            effective: SmartMarkConfig::default(),
            overrides: HashMap::new(),
        }
    }

    /// Loads the file with `SMARTMARK_*` environment overrides on top.
    pub fn load_with_env(&mut self) -> Result<SmartMarkConfig, ConfigError> {
        self.load_with_overrides(|name| std::env::var(name).ok())
    }

    /// Loads the file with overrides read through `lookup`. The overrides
    /// stay in effect across later `set_value` and `reset` calls and are
    /// never written to the file.
    pub fn load_with_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<SmartMarkConfig, ConfigError> {
        self.overrides = OVERRIDE_VARS
            .iter()
            .filter_map(|name| lookup(name).map(|value| (name.to_string(), value)))
            .collect();
        self.load()
    }

    /// Recomputes the effective configuration from the file-backed one.
    fn apply_overrides(&mut self) -> Result<(), ConfigError> {
        let mut effective = self.config.clone();
        apply_env_overrides(&mut effective, |name| self.overrides.get(name).cloned())?;
        self.effective = effective;
        Ok(())
    }
}

/// Applies environment overrides read through `lookup`. Empty values are
/// ignored.
pub fn apply_env_overrides(
    config: &mut SmartMarkConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(kind) = get(ENV_BACKEND) {
        config.backend.kind = match kind.trim().to_ascii_lowercase().as_str() {
            "supabase" => BackendKind::Supabase,
            "local" => BackendKind::Local,
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must be 'supabase' or 'local', got '{}'",
                    ENV_BACKEND, other
                )))
            }
        };
    }
    if let Some(url) = get(ENV_SUPABASE_URL) {
        config.backend.url = url.trim().to_string();
    }
    if let Some(key) = get(ENV_SUPABASE_ANON_KEY) {
        config.backend.anon_key = key.trim().to_string();
    }
    if let Some(level) = get(ENV_LOG) {
        config.logging.level = level.trim().to_string();
    }
    Ok(())
}

impl ConfigEngineTrait for ConfigEngine {
    /// Loads the configuration from the JSON config file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is malformed, returns a serialization error.
    fn load(&mut self) -> Result<SmartMarkConfig, ConfigError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            debug!(path = %self.config_path, "no config file, using defaults");
            self.config = SmartMarkConfig::default();
            self.apply_overrides()?;
            return Ok(self.effective.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read config file: {}", e)))?;

        let config: SmartMarkConfig = serde_json::from_str(&content).map_err(|e| {
            ConfigError::Serialization(format!("Failed to parse config file: {}", e))
        })?;

        self.config = config;
        self.apply_overrides()?;
        Ok(self.effective.clone())
    }

    /// Saves the current configuration, creating parent directories as needed.
    fn save(&self) -> Result<(), ConfigError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Io(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.config).map_err(|e| {
            ConfigError::Serialization(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| ConfigError::Io(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_config(&self) -> &SmartMarkConfig {
        &self.effective
    }

    /// Updates one value by dot-notation key path (`"backend.url"`,
    /// `"realtime.reconnect_delay_secs"`) and saves. An environment
    /// override on the same key still wins in `get_config`.
    ///
    /// The key must already exist in the serialized configuration, and the
    /// result must deserialize back into `SmartMarkConfig`.
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), ConfigError> {
        if key.is_empty() {
            return Err(ConfigError::InvalidKey("Key cannot be empty".to_string()));
        }

        let parts: Vec<&str> = key.split('.').collect();
        let mut json_value = serde_json::to_value(&self.config).map_err(|e| {
            ConfigError::Serialization(format!("Failed to serialize config: {}", e))
        })?;

        {
            let (last, parents) = match parts.split_last() {
                Some(split) => split,
                None => return Err(ConfigError::InvalidKey("Key cannot be empty".to_string())),
            };

            let mut current = &mut json_value;
            for part in parents {
                current = current.get_mut(*part).ok_or_else(|| {
                    ConfigError::InvalidKey(format!("Key '{}' not found in config", key))
                })?;
            }

            match current {
                serde_json::Value::Object(map) if map.contains_key(*last) => {
                    map.insert(last.to_string(), value);
                }
                serde_json::Value::Object(_) => {
                    return Err(ConfigError::InvalidKey(format!(
                        "Key '{}' not found in config",
                        key
                    )));
                }
                _ => {
                    return Err(ConfigError::InvalidKey(format!(
                        "Cannot navigate to key '{}': intermediate value is not an object",
                        key
                    )));
                }
            }
        }

        let new_config: SmartMarkConfig = serde_json::from_value(json_value).map_err(|e| {
            ConfigError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;

        self.config = new_config;
        self.save()?;
        self.apply_overrides()?;

        Ok(())
    }

    /// Resets everything to defaults and saves.
    fn reset(&mut self) -> Result<(), ConfigError> {
        self.config = SmartMarkConfig::default();
        self.save()?;
        self.apply_overrides()?;
        Ok(())
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}
