use tokio::task::JoinHandle;

use crate::Scheduler;

/// Reloads profiles whenever the process receives SIGUSR2.
#[cfg(unix)]
pub fn reload_on_sigusr2(scheduler: Scheduler) -> std::io::Result<Option<JoinHandle<()>>> {
    use tokio::signal::unix::{signal, SignalKind};
    use tracing::info;

    let mut signals = signal(SignalKind::user_defined2())?;
    Ok(Some(tokio::spawn(async move {
        while signals.recv().await.is_some() {
            info!(target: "scheduler", "SIGUSR2 received");
            scheduler.reload();
        }
    })))
}

#[cfg(not(unix))]
pub fn reload_on_sigusr2(_scheduler: Scheduler) -> std::io::Result<Option<JoinHandle<()>>> {
    Ok(None)
}
