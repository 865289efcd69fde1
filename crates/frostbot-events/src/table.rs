use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use tracing::{error, warn};

use crate::behavior::{Behavior, BehaviorFactory};
use crate::context::BotContext;
use crate::event::{Event, EventKind};
use crate::graph::{Callback, NodeId};

pub(crate) struct FlatNode {
    pub(crate) name: Option<String>,
    pub(crate) ancestry: Vec<NodeId>,
    pub(crate) handlers: HashMap<EventKind, Vec<Callback>>,
    pub(crate) packet_handlers: HashMap<u32, Vec<Callback>>,
    pub(crate) behavior: Option<BehaviorFactory>,
}

/// The flattened, read-only event graph.
///
/// Cheap to share: sessions hold it behind an `Arc` and a reload swaps in a
/// freshly built table.
pub struct EventTable {
    nodes: Vec<FlatNode>,
    names: HashMap<String, NodeId>,
}

impl EventTable {
    pub(crate) fn new(nodes: Vec<FlatNode>, names: HashMap<String, NodeId>) -> Self {
        Self { nodes, names }
    }

    pub fn root(&self) -> NodeId {
        self.names[crate::graph::ROOT_NAME]
    }

    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Registered profile names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.index())?.name.as_deref()
    }

    /// The node's ancestors in firing order, ending with the node itself.
    pub fn ancestry(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.index())
            .map(|flat| flat.ancestry.as_slice())
            .unwrap_or_default()
    }

    /// Number of callbacks that firing `kind` on `node` would run, excluding
    /// opcode-keyed ones.
    pub fn handler_count(&self, node: NodeId, kind: EventKind) -> usize {
        self.nodes
            .get(node.index())
            .and_then(|flat| flat.handlers.get(&kind))
            .map_or(0, Vec::len)
    }

    pub fn handles_opcode(&self, node: NodeId, opcode: u32) -> bool {
        self.nodes
            .get(node.index())
            .is_some_and(|flat| flat.packet_handlers.contains_key(&opcode))
    }

    /// A fresh instance of the nearest behavior attached to `node` or its
    /// ancestors.
    pub fn behavior(&self, node: NodeId) -> Option<Box<dyn Behavior>> {
        let factory = self.nodes.get(node.index())?.behavior.as_ref()?;
        Some(factory())
    }

    /// Runs every callback for `event` on `node`: unkeyed callbacks first,
    /// then those keyed by the packet's opcode.
    ///
    /// A callback that fails or panics is logged and skipped. Cancellation is
    /// left on `ctx` for the caller to inspect.
    pub fn fire(&self, node: NodeId, ctx: &mut BotContext<'_>, event: &mut Event<'_>) {
        let Some(flat) = self.nodes.get(node.index()) else {
            warn!(target: "events", "Fired {} on unknown node {}", event.kind(), node);
            return;
        };

        let kind = event.kind();
        let keyed = event
            .opcode()
            .and_then(|opcode| flat.packet_handlers.get(&opcode));
        let callbacks = flat
            .handlers
            .get(&kind)
            .into_iter()
            .flatten()
            .chain(keyed.into_iter().flatten());

        for callback in callbacks {
            match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(ctx, event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(target: "events",
                        "Callback for {} on {} failed for {}: {:#}",
                        kind,
                        self.display_name(node),
                        ctx.username(),
                        e
                    );
                }
                Err(e) => {
                    error!(target: "events",
                        "Callback for {} on {} panicked for {}: {}",
                        kind,
                        self.display_name(node),
                        ctx.username(),
                        panic_message(e.as_ref())
                    );
                }
            }
        }
    }

    fn display_name(&self, node: NodeId) -> String {
        match self.name(node) {
            Some(name) => name.to_string(),
            None => node.to_string(),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

impl fmt::Debug for EventTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventTable")
            .field("nodes", &self.nodes.len())
            .field("names", &self.names)
            .finish()
    }
}
