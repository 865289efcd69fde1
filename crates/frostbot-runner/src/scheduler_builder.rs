//! Builder for [`Scheduler`]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::info;

use frostbot_client::config::{BotsConfig, DEFAULT_PROFILE};
use frostbot_client::{build_table, BuiltinProfiles, ProfileSet};

use crate::registry::Registry;
use crate::scheduler::Scheduler;
use crate::worker::{self, Shared};

/// Error during builder configuration
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Thread count must be at least 1")]
    NoWorkers,
    #[error("Tick interval must not be zero")]
    ZeroTick,
    #[error("Profiles failed to load: {0:#}")]
    Profiles(anyhow::Error),
    #[error("Failed to spawn worker {index}: {source}")]
    Spawn {
        index: usize,
        source: std::io::Error,
    },
}

pub struct SchedulerBuilder {
    thread_count: usize,
    tick: Duration,
    default_auth_server: String,
    default_profile: String,
    profiles: Arc<dyn ProfileSet>,
}

impl SchedulerBuilder {
    pub fn new() -> Self {
        Self::from_config(&BotsConfig::default())
    }

    /// Thread count, tick, default auth server and default profile from the
    /// `[bots]` section.
    pub fn from_config(config: &BotsConfig) -> Self {
        Self {
            thread_count: config.thread_count,
            tick: Duration::from_millis(config.tick_ms),
            default_auth_server: config.default_auth_server.clone(),
            default_profile: if config.default_profile.is_empty() {
                DEFAULT_PROFILE.to_string()
            } else {
                config.default_profile.clone()
            },
            profiles: Arc::new(BuiltinProfiles),
        }
    }

    pub fn thread_count(mut self, count: usize) -> Self {
        self.thread_count = count;
        self
    }

    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn default_auth_server(mut self, server: impl Into<String>) -> Self {
        self.default_auth_server = server.into();
        self
    }

    pub fn default_profile(mut self, profile: impl Into<String>) -> Self {
        self.default_profile = profile.into();
        self
    }

    /// Profiles every worker installs on each (re)build. Defaults to the
    /// built-in ones.
    pub fn profiles(mut self, profiles: impl ProfileSet + 'static) -> Self {
        self.profiles = Arc::new(profiles);
        self
    }

    /// Checks that the profiles load, then starts the workers.
    pub fn build(self) -> Result<Scheduler, BuildError> {
        if self.thread_count == 0 {
            return Err(BuildError::NoWorkers);
        }
        if self.tick.is_zero() {
            return Err(BuildError::ZeroTick);
        }
        let table = build_table(self.profiles.as_ref()).map_err(BuildError::Profiles)?;
        info!(target: "scheduler", "Loaded profiles: {}", table.names().join(", "));

        let shared = Arc::new(Shared {
            registry: Mutex::new(Registry::new(self.thread_count)),
            profiles: self.profiles,
            tick: self.tick,
        });

        let mut workers = Vec::with_capacity(self.thread_count);
        for index in 0..self.thread_count {
            match worker::spawn(index, Arc::clone(&shared)) {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    // Stop the ones already running before reporting
                    let scheduler = Scheduler::from_parts(
                        shared,
                        workers,
                        self.default_auth_server,
                        self.default_profile,
                    );
                    let _ = scheduler.shutdown();
                    return Err(BuildError::Spawn { index, source });
                }
            }
        }

        info!(target: "scheduler", "Started {} worker(s)", self.thread_count);
        Ok(Scheduler::from_parts(
            shared,
            workers,
            self.default_auth_server,
            self.default_profile,
        ))
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
