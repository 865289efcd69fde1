use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::account_config::AccountConfig;
use crate::config::paths::ProjectPaths;

pub const DEFAULT_PROFILE: &str = "frostbot:default";

const EXAMPLE_CONFIG: &str = r#"# frostbot configuration

[bots]
# Worker threads; each runs its own event loop
thread_count = 1
default_auth_server = "127.0.0.1"
default_profile = "frostbot:default"
tick_ms = 5

[console]
enabled = true

[logging]
level = "info"
file = false

[logging.targets]
# auth = "debug"

# [accounts.main]
# username = "player"
# password = "secret"
# profile = "frostbot:auto_login"
"#;

#[derive(Debug)]
pub enum ConfigLoadError {
    NotFound,
    ParseError(String),
    IoError(String),
}

impl std::fmt::Display for ConfigLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigLoadError::NotFound => write!(f, "Config file not found"),
            ConfigLoadError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigLoadError::IoError(msg) => write!(f, "IO error reading config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigLoadError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotsConfig {
    pub thread_count: usize,
    pub default_auth_server: String,
    pub default_profile: String,
    /// Scheduler tick in milliseconds
    pub tick_ms: u64,
}

impl Default for BotsConfig {
    fn default() -> Self {
        Self {
            thread_count: 1,
            default_auth_server: "127.0.0.1".to_string(),
            default_profile: DEFAULT_PROFILE.to_string(),
            tick_ms: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set
    pub level: String,
    /// Also write to `<data_dir>/logs/<component>.log`
    pub file: bool,
    /// Per-target levels, e.g. `auth = "debug"`
    pub targets: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: false,
            targets: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrostbotConfig {
    #[serde(default)]
    pub bots: BotsConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub accounts: BTreeMap<String, AccountConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

impl FrostbotConfig {
    pub fn config_path() -> PathBuf {
        match ProjectPaths::new("frostbot") {
            Some(paths) => paths.config_file(),
            None => PathBuf::from("frostbot.toml"),
        }
    }

    /// Data directory, honouring the `paths.data_dir` override.
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.paths.data_dir {
            return dir.clone();
        }
        match ProjectPaths::new("frostbot") {
            Some(paths) => paths.data_dir().clone(),
            None => PathBuf::from(".frostbot"),
        }
    }

    pub fn load() -> Result<Self, ConfigLoadError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigLoadError> {
        if !path.exists() {
            return Err(ConfigLoadError::NotFound);
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigLoadError::IoError(e.to_string()))?;
        let config = Self::parse(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigLoadError> {
        toml::from_str(content).map_err(|e| ConfigLoadError::ParseError(e.to_string()))
    }

    /// Loads `path`, writing the example config there first if it is missing.
    pub fn load_or_init(path: &Path) -> Result<Self, ConfigLoadError> {
        match Self::load_from(path) {
            Err(ConfigLoadError::NotFound) => {
                write_example(path).map_err(|e| ConfigLoadError::IoError(e.to_string()))?;
                info!("Wrote example config to {}", path.display());
                Self::parse(EXAMPLE_CONFIG)
            }
            other => other,
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(&self)?;
        fs::write(path, content)?;
        info!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn account(&self, name: &str) -> Option<&AccountConfig> {
        self.accounts.get(name)
    }
}

fn write_example(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, EXAMPLE_CONFIG)
}
