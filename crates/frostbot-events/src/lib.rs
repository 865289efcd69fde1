//! Inheritable event callbacks for bot sessions.
//!
//! Profiles are nodes in an [`EventGraph`]. A node inherits every callback
//! of its parents; building the graph flattens that inheritance into an
//! [`EventTable`], which sessions fire protocol events through.

mod behavior;
mod context;
mod error;
mod event;
mod graph;
mod table;

pub use behavior::{Behavior, BehaviorFactory};
pub use context::{BotContext, Storage};
pub use error::EventError;
pub use event::{Event, EventKind};
pub use graph::{profile_name, Callback, EventGraph, NodeId, ROOT_NAME};
pub use table::EventTable;
