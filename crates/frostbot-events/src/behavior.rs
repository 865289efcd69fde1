use std::sync::Arc;
use std::time::Duration;

use crate::context::BotContext;

/// A per-bot driver updated on every scheduler tick while the bot is in
/// the world.
pub trait Behavior {
    fn update(&mut self, ctx: &mut BotContext<'_>, delta: Duration) -> anyhow::Result<()>;
}

/// Creates a fresh [`Behavior`] whenever one is attached to a bot.
pub type BehaviorFactory = Arc<dyn Fn() -> Box<dyn Behavior> + Send + Sync>;
