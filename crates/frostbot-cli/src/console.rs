//! Line-based operator console read from stdin.

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use frostbot_client::FrostbotConfig;
use frostbot_runner::Scheduler;

#[derive(Parser, Debug, PartialEq, Eq)]
#[command(name = "console", no_binary_name = true, disable_version_flag = true)]
struct ConsoleLine {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Log a bot in
    Start {
        username: String,
        password: String,
        profile: Option<String>,
        auth_server: Option<String>,
    },
    /// Log in an account from the config file
    Login { account: String },
    /// Log a bot out
    Stop { username: String },
    /// Rebuild every worker's profiles
    Reload,
    /// Show known bots
    List,
    /// Log everyone out and exit
    #[command(alias = "exit")]
    Quit,
}

/// `Ok(None)` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<Command>, clap::Error> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(None);
    }
    ConsoleLine::try_parse_from(words).map(|line| Some(line.command))
}

/// Starts the configured account `name`. Returns the owning worker.
pub fn start_account(
    scheduler: &Scheduler,
    config: &FrostbotConfig,
    name: &str,
) -> Result<usize, String> {
    let account = config.account(name).ok_or_else(|| {
        let available = config.accounts.keys().cloned().collect::<Vec<_>>().join(", ");
        format!("Account '{}' not found. Available accounts: {}", name, available)
    })?;
    scheduler
        .start_bot(
            &account.username,
            &account.password,
            account.profile.as_deref(),
            account.auth_server.as_deref(),
        )
        .map_err(|e| e.to_string())
}

/// Runs one command. Returns false when the console should exit.
pub fn execute(command: Command, scheduler: &Scheduler, config: &FrostbotConfig) -> bool {
    match command {
        Command::Start {
            username,
            password,
            profile,
            auth_server,
        } => match scheduler.start_bot(&username, &password, profile.as_deref(), auth_server.as_deref()) {
            Ok(worker) => info!(target: "console", "Starting {} on worker {}", username, worker),
            Err(e) => warn!(target: "console", "Cannot start {}: {}", username, e),
        },
        Command::Login { account } => match start_account(scheduler, config, &account) {
            Ok(worker) => info!(target: "console", "Starting account {} on worker {}", account, worker),
            Err(e) => warn!(target: "console", "{}", e),
        },
        Command::Stop { username } => {
            if let Err(e) = scheduler.stop_bot(&username) {
                warn!(target: "console", "{}", e);
            }
        }
        Command::Reload => scheduler.reload(),
        Command::List => {
            let bots = scheduler.bots();
            if bots.is_empty() {
                println!("No bots");
            }
            for bot in bots {
                let state = bot
                    .state
                    .map(|state| state.to_string())
                    .unwrap_or_else(|| "Queued".to_string());
                println!(
                    "{:<16} worker {:<2} {:<22} {:<24} since {}",
                    bot.username,
                    bot.worker,
                    state,
                    bot.profile,
                    bot.added_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        Command::Quit => return false,
    }
    true
}

/// Reads commands from stdin until `quit`, end of input or Ctrl-C.
pub async fn run(scheduler: &Scheduler, config: &FrostbotConfig) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!(target: "console", "Console ready; type 'help' for commands");

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => match parse_line(&line) {
                    Ok(Some(command)) => {
                        if !execute(command, scheduler, config) {
                            break;
                        }
                    }
                    Ok(None) => {}
                    // Covers `help` as well as real mistakes
                    Err(e) => println!("{}", e),
                },
                Ok(None) => break,
                Err(e) => {
                    error!(target: "console", "Failed to read stdin: {}", e);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!(target: "console", "Interrupted");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_with_optional_arguments() {
        assert_eq!(
            parse_line("start bot secret").unwrap(),
            Some(Command::Start {
                username: "bot".to_string(),
                password: "secret".to_string(),
                profile: None,
                auth_server: None,
            })
        );
        assert_eq!(
            parse_line("  start bot secret frostbot:logger logon.example:3724 ").unwrap(),
            Some(Command::Start {
                username: "bot".to_string(),
                password: "secret".to_string(),
                profile: Some("frostbot:logger".to_string()),
                auth_server: Some("logon.example:3724".to_string()),
            })
        );
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_line("reload").unwrap(), Some(Command::Reload));
        assert_eq!(parse_line("list").unwrap(), Some(Command::List));
        assert_eq!(parse_line("quit").unwrap(), Some(Command::Quit));
        assert_eq!(parse_line("exit").unwrap(), Some(Command::Quit));
        assert_eq!(
            parse_line("stop bot").unwrap(),
            Some(Command::Stop {
                username: "bot".to_string()
            })
        );
        assert_eq!(
            parse_line("login main").unwrap(),
            Some(Command::Login {
                account: "main".to_string()
            })
        );
    }

    #[test]
    fn test_parse_blank_and_invalid_lines() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   \t").unwrap(), None);
        assert!(parse_line("start onlyuser").is_err());
        assert!(parse_line("dance").is_err());
        assert!(parse_line("stop a b").is_err());
    }

    #[test]
    fn test_login_reports_unknown_account() {
        let scheduler = Scheduler::builder().build().unwrap();
        let config = FrostbotConfig::parse(
            r#"
            [accounts.main]
            username = "player"
            password = "secret"
            "#,
        )
        .unwrap();

        let err = start_account(&scheduler, &config, "alt").unwrap_err();
        assert!(err.contains("'alt'"));
        assert!(err.contains("main"));

        assert!(execute(Command::Reload, &scheduler, &config));
        assert!(!execute(Command::Quit, &scheduler, &config));
        scheduler.shutdown().unwrap();
    }
}
