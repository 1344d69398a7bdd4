use crate::error::TrackerError;
use crate::report::GroupingMode;
use anyhow::{Context, Result};
use chrono_tz::Tz;
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub state: StateConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    /// Identity provider endpoint, defaults to `base_url`
    pub auth_url: Option<String>,
    pub api_key: Option<String>, // Optional when kept in the keyring
    #[serde(default = "default_use_keyring")]
    pub use_keyring: bool,
}

fn default_use_keyring() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth_url: None,
            api_key: None,
            use_keyring: default_use_keyring(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct DisplayConfig {
    #[serde(default)]
    pub grouping: GroupingMode,
    /// IANA zone name; the system zone when unset
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    5
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StateConfig {
    /// Optional override for state directory (for testing)
    pub state_dir_override: Option<PathBuf>,
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), TrackerError> {
        validate_url("store.base_url", &self.base_url)?;
        if let Some(auth_url) = &self.auth_url {
            validate_url("store.auth_url", auth_url)?;
        }
        Ok(())
    }

    pub fn auth_url(&self) -> &str {
        self.auth_url.as_deref().unwrap_or(&self.base_url)
    }
}

fn validate_url(key: &str, url: &str) -> Result<(), TrackerError> {
    if url.trim().is_empty() {
        return Err(TrackerError::Configuration(format!("{} is not set", key)));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(TrackerError::Configuration(format!(
            "{} must start with http:// or https://, got '{}'",
            key, url
        )));
    }
    Ok(())
}

impl DisplayConfig {
    /// Zone used for period bucketing and display.
    pub fn timezone(&self) -> Result<Tz, TrackerError> {
        match &self.timezone {
            Some(name) => name.parse::<Tz>().map_err(|_| {
                TrackerError::Configuration(format!("unknown display.timezone '{}'", name))
            }),
            None => Ok(iana_time_zone::get_timezone()
                .ok()
                .and_then(|name| name.parse::<Tz>().ok())
                .unwrap_or(Tz::UTC)),
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.poll_interval_secs == 0 {
            return Err(TrackerError::Configuration(
                "watch.poll_interval_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Config {
    /// Store API key, from the keyring first and then the config file.
    pub fn get_api_key(&self) -> Result<String, TrackerError> {
        if self.store.use_keyring {
            match crate::keyring::get_api_key() {
                Ok(Some(key)) => return Ok(key),
                Ok(None) => {}
                Err(e) => warn!(error = %format!("{:#}", e), "keyring unavailable, using config file"),
            }
        }

        if let Some(key) = &self.store.api_key {
            return Ok(key.clone());
        }

        Err(TrackerError::Configuration(
            "store API key not found. Run 'wtally config set store.api_key <KEY>'".to_string(),
        ))
    }

    /// Validate all configuration
    pub fn validate(&self) -> Result<(), TrackerError> {
        self.store.validate()?;
        self.display.timezone()?;
        self.watch.validate()?;
        Ok(())
    }

    /// Move a plain-text API key into the keyring.
    ///
    /// The key only leaves the config once a fresh keyring lookup returns it.
    /// A keyring that fails or does not persist secrets leaves the config as is.
    pub fn migrate_credentials(&mut self) -> Result<bool> {
        if !self.store.use_keyring {
            return Ok(false);
        }
        let Some(key) = self.store.api_key.clone() else {
            return Ok(false);
        };

        if let Err(e) = crate::keyring::store_api_key(&key) {
            warn!(error = %format!("{:#}", e), "could not move the API key to the keyring");
            return Ok(false);
        }
        match crate::keyring::get_api_key() {
            Ok(Some(stored)) if stored == key => {
                self.store.api_key = None;
                Ok(true)
            }
            _ => {
                info!("keyring did not keep the API key, leaving it in config.toml");
                Ok(false)
            }
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(home::home_dir()
        .context("Could not find home directory")?
        .join(".worktally")
        .join("config.toml"))
}

pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Config> {
    let loader = ConfigBuilder::builder()
        .add_source(File::from(path.as_ref()).format(FileFormat::Toml))
        .build()
        .context("Failed to build config loader")?;

    loader
        .try_deserialize()
        .context("Failed to parse config file")
}

/// Load `~/.worktally/config.toml` with `WORKTALLY_*` environment overrides.
pub fn load() -> Result<Config> {
    let config_path = config_path()?;

    let loader = ConfigBuilder::builder()
        .add_source(File::from(config_path.as_path()).format(FileFormat::Toml))
        .add_source(
            Environment::with_prefix("WORKTALLY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("No usable config at {}", config_path.display()))?;

    let mut config: Config = loader
        .try_deserialize()
        .context("Failed to parse config file")?;

    config.validate()?;

    if config.migrate_credentials()? {
        save_to_path(&config, &config_path)?;
        eprintln!("✓ Migrated API key to secure storage.");
    }

    Ok(config)
}

pub fn save_to_path<P: AsRef<Path>>(config: &Config, path: P) -> Result<()> {
    let toml_string = toml::to_string_pretty(config).context("Failed to serialize config")?;

    std::fs::write(path.as_ref(), toml_string).context("Failed to write config file")?;

    Ok(())
}

/// Set a dotted `key` in the TOML file at `path`, creating tables as needed.
///
/// `true`/`false` and integers are stored as such, anything else as a string.
pub fn set_value_in_file<P: AsRef<Path>>(path: P, key: &str, value: &str) -> Result<()> {
    let path = path.as_ref();
    let mut table: toml::Table = if path.exists() {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        content.parse().context("Config file is not valid TOML")?
    } else {
        toml::Table::new()
    };

    let parts: Vec<&str> = key.split('.').collect();
    let (leaf, sections) = parts
        .split_last()
        .filter(|(leaf, _)| !leaf.is_empty())
        .context("Config key must not be empty")?;

    let mut current = &mut table;
    for section in sections {
        current = current
            .entry(section.to_string())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()))
            .as_table_mut()
            .with_context(|| format!("'{}' is not a section", section))?;
    }

    let parsed = if let Ok(b) = value.parse::<bool>() {
        toml::Value::Boolean(b)
    } else if let Ok(i) = value.parse::<i64>() {
        toml::Value::Integer(i)
    } else {
        toml::Value::String(value.to_string())
    };
    current.insert(leaf.to_string(), parsed);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(&table).context("Failed to serialize config")?;
    std::fs::write(path, content).context("Failed to write config file")?;

    Ok(())
}
