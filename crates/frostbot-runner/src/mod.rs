pub mod logging;
mod registry;
mod scheduler;
mod scheduler_builder;
pub mod signal;
mod worker;

pub use registry::BotSummary;
pub use scheduler::{Scheduler, SchedulerError};
pub use scheduler_builder::{BuildError, SchedulerBuilder};
