use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use frostbot_client::config::LoggingConfig;

const MAX_LOG_SIZE: u64 = 1024 * 1024; // 1MB

/// Initialize logging for a component.
///
/// - `component_name`: Name of the component (e.g., "cli"), used for the log file name
/// - `log_dir`: Directory for `<component_name>.log`. `None` logs to the console only.
///
/// `RUST_LOG` overrides the configured level and per-target directives.
///
/// Returns a guard that must be kept alive for the duration of the program.
pub fn init_logging(
    component_name: &str,
    log_dir: Option<&Path>,
    config: &LoggingConfig,
) -> io::Result<Option<WorkerGuard>> {
    let Some(log_dir) = log_dir else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter(config))
            .init();
        return Ok(None);
    };

    fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(format!("{}.log", component_name));
    truncate_if_needed(&log_path)?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;
    let (non_blocking_file, guard) = tracing_appender::non_blocking(BufWriter::new(file));

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(fmt::layer().with_writer(io::stdout).with_ansi(true))
        .with(
            fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    tracing::info!("Logging to file: {}", log_path.display());
    Ok(Some(guard))
}

/// `<data dir>/logs`
pub fn log_directory(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(filter_directives(config)).unwrap_or_else(|e| {
            eprintln!("Ignoring invalid logging config ({}), using info", e);
            EnvFilter::new("info")
        })
    })
}

/// The default level followed by one `target=level` directive per entry.
pub fn filter_directives(config: &LoggingConfig) -> String {
    let mut directives = vec![config.level.clone()];
    directives.extend(
        config
            .targets
            .iter()
            .map(|(target, level)| format!("{}={}", target, level)),
    );
    directives.join(",")
}

/// Truncate log file if it exceeds MAX_LOG_SIZE.
fn truncate_if_needed(log_path: &Path) -> io::Result<()> {
    if log_path.exists() && fs::metadata(log_path)?.len() > MAX_LOG_SIZE {
        File::create(log_path)?.set_len(0)?;
    }
    Ok(())
}
