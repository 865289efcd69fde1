use std::any::{Any, TypeId};
use std::collections::HashMap;

use frostbot_protocol::WorldPacket;

/// Per-bot user data, keyed by type.
///
/// Profiles keep their own state here, e.g. the guid of the character they
/// logged in with.
#[derive(Default)]
pub struct Storage {
    values: HashMap<TypeId, Box<dyn Any + Send>>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value`, returning the previous value of the same type.
    pub fn insert<T: Any + Send>(&mut self, value: T) -> Option<T> {
        self.values
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    pub fn get<T: Any + Send>(&self) -> Option<&T> {
        self.values.get(&TypeId::of::<T>())?.downcast_ref()
    }

    pub fn get_mut<T: Any + Send>(&mut self) -> Option<&mut T> {
        self.values.get_mut(&TypeId::of::<T>())?.downcast_mut()
    }

    pub fn get_or_default<T: Any + Send + Default>(&mut self) -> &mut T {
        self.get_or_insert_with(T::default)
    }

    pub fn get_or_insert_with<T: Any + Send>(&mut self, init: impl FnOnce() -> T) -> &mut T {
        let slot = self
            .values
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(init()));
        match slot.downcast_mut() {
            Some(value) => value,
            // keyed by TypeId::of::<T>, so the box always holds a T
            None => unreachable!("storage slot holds a different type"),
        }
    }

    pub fn remove<T: Any + Send>(&mut self) -> Option<T> {
        self.values
            .remove(&TypeId::of::<T>())
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    pub fn contains<T: Any + Send>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("entries", &self.values.len())
            .finish()
    }
}

/// What a callback or behavior can see and do for one bot.
#[derive(Debug)]
pub struct BotContext<'a> {
    username: &'a str,
    pub storage: &'a mut Storage,
    outbox: &'a mut Vec<WorldPacket>,
    cancelled: bool,
}

impl<'a> BotContext<'a> {
    pub fn new(username: &'a str, storage: &'a mut Storage, outbox: &'a mut Vec<WorldPacket>) -> Self {
        Self {
            username,
            storage,
            outbox,
            cancelled: false,
        }
    }

    pub fn username(&self) -> &str {
        self.username
    }

    /// Queues a packet; the session sends queued packets after the current
    /// event has been handled.
    pub fn send(&mut self, packet: WorldPacket) {
        self.outbox.push(packet);
    }

    /// Stops the step that fired the current event. Remaining callbacks for
    /// the event still run.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}
