use std::error::Error;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{error, info, warn};

use frostbot_client::config::{ConfigLoadError, FrostbotConfig};
use frostbot_runner::logging::{init_logging, log_directory};
use frostbot_runner::signal::reload_on_sigusr2;
use frostbot_runner::{Scheduler, SchedulerBuilder};

mod console;

#[derive(Parser)]
#[command(version = env!("VERSION_STRING"), about, long_about = None)]
pub struct Cli {
    /// Enables debug logging, twice for trace
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    /// Number of worker threads
    #[arg(short, long)]
    threads: Option<usize>,

    /// Auth server used when a bot does not name one, `host[:port]`
    #[arg(short, long)]
    auth_server: Option<String>,

    /// Profile used when a bot does not name one
    #[arg(short, long)]
    profile: Option<String>,

    /// Also write logs to the data directory
    #[arg(long)]
    log_file: bool,

    /// Configured account to log in at startup (repeatable)
    #[arg(short, long = "start", value_name = "ACCOUNT")]
    start: Vec<String>,

    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, config: &mut FrostbotConfig) {
        if let Some(threads) = self.threads {
            config.bots.thread_count = threads;
        }
        if let Some(server) = &self.auth_server {
            config.bots.default_auth_server = server.clone();
        }
        if let Some(profile) = &self.profile {
            config.bots.default_profile = profile.clone();
        }
        if self.log_file {
            config.logging.file = true;
        }
        match self.debug {
            0 => {}
            1 => config.logging.level = "debug".to_string(),
            _ => config.logging.level = "trace".to_string(),
        }
    }
}

fn load_config(path: &Path) -> Result<FrostbotConfig, Box<dyn Error>> {
    match FrostbotConfig::load_from(path) {
        Ok(config) => Ok(config),
        Err(ConfigLoadError::NotFound) => {
            let config = FrostbotConfig::load_or_init(path)?;
            eprintln!("Config file created at: {}", path.display());
            eprintln!("Add accounts there to log them in with --start or the console's login command.");
            Ok(config)
        }
        Err(err) => Err(format!("Failed to load config: {}", err).into()),
    }
}

async fn stop(scheduler: Scheduler) -> Result<(), Box<dyn Error>> {
    tokio::task::spawn_blocking(move || scheduler.shutdown()).await??;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(FrostbotConfig::config_path);
    let mut config = load_config(&config_path)?;
    cli.apply(&mut config);

    let log_dir = config
        .logging
        .file
        .then(|| log_directory(&config.data_dir()));
    let _guard = init_logging("frostbot", log_dir.as_deref(), &config.logging)?;
    info!("Starting frostbot {}", env!("VERSION_STRING"));

    let scheduler = SchedulerBuilder::from_config(&config.bots).build()?;
    if let Err(e) = reload_on_sigusr2(scheduler.clone()) {
        warn!("Cannot listen for SIGUSR2: {}", e);
    }

    for account in &cli.start {
        if let Err(e) = console::start_account(&scheduler, &config, account) {
            error!("{}", e);
        }
    }

    if config.console.enabled {
        console::run(&scheduler, &config).await;
    } else {
        info!("Console disabled; press Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;
    }

    info!("Shutting down");
    stop(scheduler).await
}
