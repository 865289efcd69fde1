use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::{JoinHandle, LocalSet};
use tokio::time::{timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use frostbot_client::{
    build_table, AuthError, HandshakeOutcome, ProfileSet, Session, SessionHandle, SessionSettings,
};
use frostbot_events::{Behavior, BotContext, EventGraph, EventTable, Storage};
use frostbot_protocol::WorldPacket;

use crate::registry::{BotEntry, Registry};

const STOP_GRACE: Duration = Duration::from_secs(2);

type SessionTask = JoinHandle<Result<HandshakeOutcome, AuthError>>;

/// State shared by the scheduler front end and every worker.
pub(crate) struct Shared {
    pub registry: Mutex<Registry>,
    pub profiles: Arc<dyn ProfileSet>,
    pub tick: Duration,
}

impl Shared {
    pub fn registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct LiveBot {
    handle: SessionHandle,
    storage: Arc<Mutex<Storage>>,
    profile: String,
    behavior: Option<Box<dyn Behavior>>,
    /// Taken once the outcome has been logged
    task: Option<SessionTask>,
}

/// Drained from the registry in one critical section.
#[derive(Default)]
struct Pending {
    logins: Vec<BotEntry>,
    removals: Vec<String>,
    reload: bool,
}

/// Starts worker `id` on its own OS thread.
pub(crate) fn spawn(id: usize, shared: Arc<Shared>) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("frostbot-worker-{}", id))
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!(target: "scheduler", "Worker {} could not start its runtime: {}", id, e);
                    return;
                }
            };
            let local = LocalSet::new();
            local.block_on(&runtime, Worker::new(id, shared).run());
        })
}

/// Drives every bot assigned to one worker from a single cooperative loop.
struct Worker {
    id: usize,
    shared: Arc<Shared>,
    table: watch::Sender<Arc<EventTable>>,
    bots: HashMap<String, LiveBot>,
    /// Sessions that were stopped but have not returned yet
    finishing: Vec<(String, SessionTask)>,
    outbox: Vec<WorldPacket>,
}

impl Worker {
    fn new(id: usize, shared: Arc<Shared>) -> Self {
        let table = match build_table(shared.profiles.as_ref()) {
            Ok(table) => table,
            Err(e) => {
                error!(target: "scheduler", "Worker {} failed to load profiles, using an empty graph: {:#}", id, e);
                EventGraph::new().build()
            }
        };
        let (table, _) = watch::channel(Arc::new(table));
        Self {
            id,
            shared,
            table,
            bots: HashMap::new(),
            finishing: Vec::new(),
            outbox: Vec::new(),
        }
    }

    async fn run(mut self) {
        info!(target: "scheduler", "Worker {} started", self.id);
        let mut interval = tokio::time::interval(self.shared.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_tick = Instant::now();

        loop {
            interval.tick().await;
            let now = Instant::now();
            let delta = now - last_tick;
            last_tick = now;

            self.update_behaviors(delta);
            let Some(pending) = self.take_pending() else {
                break;
            };
            for entry in pending.logins {
                self.start_session(entry);
            }
            for key in pending.removals {
                self.stop_session(&key);
            }
            if pending.reload {
                self.reload();
            }
            self.reap().await;
        }

        self.stop_all().await;
        info!(target: "scheduler", "Worker {} stopped", self.id);
    }

    fn update_behaviors(&mut self, delta: Duration) {
        for bot in self.bots.values_mut() {
            let LiveBot {
                handle,
                storage,
                behavior,
                ..
            } = bot;
            let Some(driver) = behavior.as_mut() else {
                continue;
            };
            if !handle.state().is_streaming() {
                continue;
            }

            let mut storage = storage.lock().unwrap_or_else(PoisonError::into_inner);
            let mut ctx = BotContext::new(handle.username(), &mut storage, &mut self.outbox);
            match catch_unwind(AssertUnwindSafe(|| driver.update(&mut ctx, delta))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(target: "scheduler", "Behavior update for {} failed: {:#}", handle.username(), e);
                }
                Err(_) => {
                    error!(target: "scheduler", "Behavior for {} panicked, detaching it", handle.username());
                    *behavior = None;
                }
            }
            drop(storage);

            for packet in self.outbox.drain(..) {
                handle.send(packet);
            }
        }
    }

    /// Takes this worker's queued work. `None` once the scheduler is stopping.
    fn take_pending(&self) -> Option<Pending> {
        let mut registry = self.shared.registry();
        if registry.stopping {
            return None;
        }
        let (keys, removals, reload) = match registry.queue_mut(self.id) {
            Some(queue) => (
                std::mem::take(&mut queue.logins),
                std::mem::take(&mut queue.removals),
                std::mem::take(&mut queue.reload),
            ),
            None => return Some(Pending::default()),
        };

        let mut pending = Pending {
            removals: removals.into(),
            reload,
            ..Pending::default()
        };
        for key in keys {
            match registry.get(&key) {
                None => debug!(target: "scheduler", "Skipping login for unknown bot {}", key),
                Some(entry) if entry.worker != self.id => {
                    warn!(target: "scheduler", "Skipping login for {} owned by worker {}", key, entry.worker)
                }
                Some(entry) if entry.leaving => {
                    debug!(target: "scheduler", "Skipping login for {}, it is disconnecting", key)
                }
                Some(entry) => pending.logins.push(entry.clone()),
            }
        }
        Some(pending)
    }

    fn start_session(&mut self, entry: BotEntry) {
        if let Some(bot) = self.bots.get(&entry.username) {
            if !bot.handle.state().is_terminal() {
                debug!(target: "scheduler", "{} is already running", entry.username);
                return;
            }
        }
        if let Some(old) = self.bots.remove(&entry.username) {
            if let Some(task) = old.task {
                self.finishing.push((entry.username.clone(), task));
            }
        }

        let settings = SessionSettings {
            username: entry.username.clone(),
            password: entry.password,
            auth_server: entry.auth_server,
            profile: entry.profile.clone(),
        };
        let storage = Arc::new(Mutex::new(Storage::new()));
        let (session, handle) = Session::new(settings, self.table.subscribe(), Arc::clone(&storage));
        self.shared
            .registry()
            .set_state(&entry.username, handle.watch_state());

        info!(target: "scheduler", "Worker {} starting {} with profile '{}'", self.id, entry.username, entry.profile);
        let task = tokio::task::spawn_local(session.run());
        let behavior = behavior_for(&self.table.borrow(), &entry.profile);
        self.bots.insert(
            entry.username,
            LiveBot {
                handle,
                storage,
                profile: entry.profile,
                behavior,
                task: Some(task),
            },
        );
    }

    /// Signals the session to stop. The registry entry stays until the
    /// session task has returned, see [`Worker::forget_if_leaving`].
    fn stop_session(&mut self, key: &str) {
        match self.shared.registry().get(key) {
            Some(entry) if entry.leaving => {}
            // Started again after the stop was queued
            Some(_) => return,
            None => {}
        }

        let task = self.bots.remove(key).and_then(|bot| {
            info!(target: "scheduler", "Worker {} stopping {}", self.id, key);
            bot.handle.shutdown();
            bot.task
        });
        match task {
            Some(task) => self.finishing.push((key.to_string(), task)),
            None => self.forget_if_leaving(key),
        }
    }

    fn forget_if_leaving(&self, key: &str) {
        if self.bots.contains_key(key) || self.finishing.iter().any(|(name, _)| name == key) {
            return;
        }
        let mut registry = self.shared.registry();
        if registry.get(key).is_some_and(|entry| entry.leaving) {
            registry.forget(key);
        }
    }

    fn reload(&mut self) {
        for bot in self.bots.values_mut() {
            bot.behavior = None;
        }

        match build_table(self.shared.profiles.as_ref()) {
            Ok(table) => {
                self.table.send_replace(Arc::new(table));
                info!(target: "scheduler", "Worker {} reloaded profiles", self.id);
            }
            Err(e) => {
                error!(target: "scheduler", "Worker {} failed to reload profiles, keeping the old ones: {:#}", self.id, e);
            }
        }

        let table = Arc::clone(&self.table.borrow());
        for bot in self.bots.values_mut() {
            if !bot.handle.state().is_terminal() {
                bot.behavior = behavior_for(&table, &bot.profile);
            }
        }
    }

    async fn reap(&mut self) {
        for (name, bot) in self.bots.iter_mut() {
            if bot.task.as_ref().is_some_and(JoinHandle::is_finished) {
                if let Some(task) = bot.task.take() {
                    bot.behavior = None;
                    log_outcome(name, task.await);
                }
            }
        }

        let (done, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.finishing)
            .into_iter()
            .partition(|(_, task)| task.is_finished());
        self.finishing = running;
        for (name, task) in done {
            log_outcome(&name, task.await);
            self.forget_if_leaving(&name);
        }
    }

    async fn stop_all(&mut self) {
        let mut tasks: Vec<(String, SessionTask)> = std::mem::take(&mut self.finishing);
        for (name, bot) in self.bots.drain() {
            bot.handle.shutdown();
            if let Some(task) = bot.task {
                tasks.push((name, task));
            }
        }

        for (name, task) in tasks {
            match timeout(STOP_GRACE, task).await {
                Ok(result) => log_outcome(&name, result),
                Err(_) => warn!(target: "scheduler", "{} did not stop within {:?}", name, STOP_GRACE),
            }
        }
    }
}

/// Behavior of the profile's nearest ancestor that has one.
fn behavior_for(table: &EventTable, profile: &str) -> Option<Box<dyn Behavior>> {
    let node = table.lookup(profile).unwrap_or_else(|| table.root());
    table.behavior(node)
}

fn log_outcome(
    name: &str,
    result: Result<Result<HandshakeOutcome, AuthError>, tokio::task::JoinError>,
) {
    match result {
        Ok(Ok(outcome)) => info!(target: "scheduler", "{} session ended: {:?}", name, outcome),
        // The session already logged the failure
        Ok(Err(e)) => debug!(target: "scheduler", "{} session failed: {}", name, e),
        Err(e) if e.is_panic() => error!(target: "scheduler", "{} session panicked", name),
        Err(e) => warn!(target: "scheduler", "{} session task ended: {}", name, e),
    }
}
