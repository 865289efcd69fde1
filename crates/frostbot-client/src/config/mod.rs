pub mod account_config;
pub mod frostbot_config;
pub mod paths;

pub use account_config::AccountConfig;
pub use frostbot_config::{
    BotsConfig, ConfigLoadError, ConsoleConfig, FrostbotConfig, LoggingConfig, PathsConfig,
    DEFAULT_PROFILE,
};
pub use paths::ProjectPaths;
