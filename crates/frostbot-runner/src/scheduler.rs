use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use thiserror::Error;
use tracing::{error, info};

use frostbot_client::HandshakeState;

use crate::registry::BotSummary;
use crate::scheduler_builder::SchedulerBuilder;
use crate::worker::Shared;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("username must not be empty")]
    EmptyUsername,
    #[error("no bot named '{0}'")]
    UnknownBot(String),
    #[error("scheduler is shut down")]
    Stopped,
    #[error("worker {0} panicked")]
    WorkerPanicked(usize),
}

/// Fixed pool of worker threads, each running its bots from one loop.
///
/// Cheap to clone; all clones drive the same pool.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    shared: Arc<Shared>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
    default_auth_server: String,
    default_profile: String,
}

impl Scheduler {
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    pub(crate) fn from_parts(
        shared: Arc<Shared>,
        workers: Vec<thread::JoinHandle<()>>,
        default_auth_server: String,
        default_profile: String,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                shared,
                workers: Mutex::new(workers),
                default_auth_server,
                default_profile,
            }),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.inner.shared.registry().worker_count()
    }

    pub fn default_profile(&self) -> &str {
        &self.inner.default_profile
    }

    /// Queues a login and returns the worker that owns the bot.
    ///
    /// A known bot keeps its worker and is logged in again. Empty `profile`
    /// or `auth_server` fall back to the configured defaults.
    pub fn start_bot(
        &self,
        username: &str,
        password: &str,
        profile: Option<&str>,
        auth_server: Option<&str>,
    ) -> Result<usize, SchedulerError> {
        if username.trim().is_empty() {
            return Err(SchedulerError::EmptyUsername);
        }
        let profile = profile
            .filter(|profile| !profile.is_empty())
            .unwrap_or(self.inner.default_profile.as_str());
        let auth_server = auth_server
            .filter(|server| !server.is_empty())
            .unwrap_or(self.inner.default_auth_server.as_str());

        let mut registry = self.inner.shared.registry();
        if registry.stopping {
            return Err(SchedulerError::Stopped);
        }
        let worker = registry.add(username.trim(), password, profile, auth_server);
        info!(target: "scheduler", "Queued login for {} on worker {}", username, worker);
        Ok(worker)
    }

    /// Queues a disconnect.
    pub fn stop_bot(&self, username: &str) -> Result<(), SchedulerError> {
        if self.inner.shared.registry().remove(username.trim()) {
            info!(target: "scheduler", "Queued disconnect for {}", username);
            Ok(())
        } else {
            Err(SchedulerError::UnknownBot(username.to_string()))
        }
    }

    /// Asks every worker to rebuild its event graph on its next tick.
    pub fn reload(&self) {
        self.inner.shared.registry().request_reload();
        info!(target: "scheduler", "Profile reload requested");
    }

    pub fn state(&self, username: &str) -> Option<HandshakeState> {
        self.inner.shared.registry().state(username)
    }

    pub fn bots(&self) -> Vec<BotSummary> {
        self.inner.shared.registry().summaries()
    }

    /// Stops every worker and waits for their threads. Bots are logged out.
    pub fn shutdown(&self) -> Result<(), SchedulerError> {
        self.inner.shared.registry().stopping = true;
        let workers = std::mem::take(
            &mut *self
                .inner
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );

        let mut result = Ok(());
        for (id, worker) in workers.into_iter().enumerate() {
            if worker.join().is_err() {
                error!(target: "scheduler", "Worker {} panicked", id);
                result = Err(SchedulerError::WorkerPanicked(id));
            }
        }
        info!(target: "scheduler", "Scheduler stopped");
        result
    }
}
