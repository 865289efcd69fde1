use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use frostbot_client::HandshakeState;

/// Everything needed to (re)start a bot's session.
#[derive(Debug, Clone)]
pub(crate) struct BotEntry {
    pub username: String,
    pub password: String,
    pub profile: String,
    pub auth_server: String,
    pub worker: usize,
    /// A stop was queued; further logins are ignored until it is processed.
    pub leaving: bool,
    pub added_at: DateTime<Utc>,
    /// Published by the owning worker once a session is spawned.
    pub state: Option<watch::Receiver<HandshakeState>>,
}

/// Queued work for one worker.
#[derive(Debug, Default)]
pub(crate) struct WorkerQueue {
    pub logins: VecDeque<String>,
    pub removals: VecDeque<String>,
    pub reload: bool,
}

/// Shared between the scheduler front end and its workers behind one
/// `std::sync::Mutex`. Never held across an await point.
#[derive(Debug)]
pub(crate) struct Registry {
    bots: BTreeMap<String, BotEntry>,
    queues: Vec<WorkerQueue>,
    pub stopping: bool,
}

/// Snapshot of one bot for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotSummary {
    pub username: String,
    pub profile: String,
    pub auth_server: String,
    pub worker: usize,
    /// `None` until the owning worker has picked up the login.
    pub state: Option<HandshakeState>,
    pub added_at: DateTime<Utc>,
}

/// Registry key for a username; sessions log in with the uppercased name.
pub(crate) fn bot_key(username: &str) -> String {
    username.to_uppercase()
}

impl Registry {
    pub fn new(workers: usize) -> Self {
        Self {
            bots: BTreeMap::new(),
            queues: (0..workers).map(|_| WorkerQueue::default()).collect(),
            stopping: false,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.queues.len()
    }

    pub fn load(&self, worker: usize) -> usize {
        self.bots.values().filter(|bot| bot.worker == worker).count()
    }

    /// Worker with the fewest bots, lowest index on ties.
    pub fn least_loaded(&self) -> usize {
        (0..self.queues.len())
            .min_by_key(|worker| self.load(*worker))
            .unwrap_or(0)
    }

    /// Adds or refreshes a bot and queues its login. Returns the owning worker.
    pub fn add(
        &mut self,
        username: &str,
        password: &str,
        profile: &str,
        auth_server: &str,
    ) -> usize {
        let key = bot_key(username);
        let worker = match self.bots.get_mut(&key) {
            Some(entry) => {
                entry.password = password.to_string();
                entry.profile = profile.to_string();
                entry.auth_server = auth_server.to_string();
                entry.leaving = false;
                entry.worker
            }
            None => {
                let worker = self.least_loaded();
                self.bots.insert(
                    key.clone(),
                    BotEntry {
                        username: key.clone(),
                        password: password.to_string(),
                        profile: profile.to_string(),
                        auth_server: auth_server.to_string(),
                        worker,
                        leaving: false,
                        added_at: Utc::now(),
                        state: None,
                    },
                );
                worker
            }
        };
        self.queues[worker].logins.push_back(key);
        worker
    }

    /// Queues a disconnect. Returns false for unknown bots.
    pub fn remove(&mut self, username: &str) -> bool {
        let key = bot_key(username);
        let Some(entry) = self.bots.get_mut(&key) else {
            return false;
        };
        entry.leaving = true;
        let worker = entry.worker;
        self.queues[worker].removals.push_back(key);
        true
    }

    pub fn get(&self, key: &str) -> Option<&BotEntry> {
        self.bots.get(key)
    }

    pub fn forget(&mut self, key: &str) -> Option<BotEntry> {
        self.bots.remove(key)
    }

    pub fn set_state(&mut self, key: &str, state: watch::Receiver<HandshakeState>) {
        if let Some(entry) = self.bots.get_mut(key) {
            entry.state = Some(state);
        }
    }

    pub fn queue_mut(&mut self, worker: usize) -> Option<&mut WorkerQueue> {
        self.queues.get_mut(worker)
    }

    pub fn request_reload(&mut self) {
        for queue in &mut self.queues {
            queue.reload = true;
        }
    }

    pub fn state(&self, username: &str) -> Option<HandshakeState> {
        self.bots
            .get(&bot_key(username))
            .and_then(|entry| entry.state.as_ref())
            .map(|state| *state.borrow())
    }

    pub fn summaries(&self) -> Vec<BotSummary> {
        self.bots
            .values()
            .map(|entry| BotSummary {
                username: entry.username.clone(),
                profile: entry.profile.clone(),
                auth_server: entry.auth_server.clone(),
                worker: entry.worker,
                state: entry.state.as_ref().map(|state| *state.borrow()),
                added_at: entry.added_at,
            })
            .collect()
    }
}
