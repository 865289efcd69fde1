use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use frostbot_protocol::packets::auth::{AuthChallenge, Realm};
use frostbot_protocol::packets::movement::MovementPacket;
use frostbot_protocol::packets::opcodes;
use frostbot_protocol::packets::update::UpdateData;
use frostbot_protocol::packets::world_auth::{AuthResponse, WorldAuthChallenge};
use frostbot_protocol::WorldPacket;

use crate::behavior::BehaviorFactory;
use crate::context::BotContext;
use crate::error::EventError;
use crate::event::{Event, EventKind};
use crate::table::{EventTable, FlatNode};

pub type Callback = Arc<dyn Fn(&mut BotContext<'_>, &mut Event<'_>) -> anyhow::Result<()> + Send + Sync>;

pub const ROOT_NAME: &str = "root";

/// Index of a node in an [`EventGraph`] and in the [`EventTable`] built from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Formats the registered name of a profile defined by `module`.
pub fn profile_name(module: &str, name: &str) -> String {
    format!("{}:{}", module, name)
}

#[derive(Default)]
struct Node {
    name: Option<String>,
    parents: Vec<NodeId>,
    handlers: HashMap<EventKind, Vec<Callback>>,
    packet_handlers: HashMap<u32, Vec<Callback>>,
    behavior: Option<BehaviorFactory>,
}

/// The open, editable form of the event graph.
///
/// Nodes are only ever added with parents that already exist, so the graph
/// is acyclic. [`EventGraph::build`] consumes it and produces the flattened
/// [`EventTable`] that sessions fire events through.
pub struct EventGraph {
    nodes: Vec<Node>,
    names: HashMap<String, NodeId>,
}

impl Default for EventGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl EventGraph {
    pub fn new() -> Self {
        let root = Node {
            name: Some(ROOT_NAME.to_string()),
            ..Node::default()
        };
        let mut names = HashMap::new();
        names.insert(ROOT_NAME.to_string(), NodeId(0));
        Self {
            nodes: vec![root],
            names,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a node inheriting from `parents`, or from the root when empty.
    pub fn create(&mut self, parents: &[NodeId]) -> Result<NodeId, EventError> {
        for parent in parents {
            self.node(*parent)?;
        }
        let mut unique = Vec::with_capacity(parents.len().max(1));
        for parent in parents {
            if !unique.contains(parent) {
                unique.push(*parent);
            }
        }
        if unique.is_empty() {
            unique.push(self.root());
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parents: unique,
            ..Node::default()
        });
        Ok(id)
    }

    pub fn register(&mut self, node: NodeId, name: impl Into<String>) -> Result<(), EventError> {
        let name = name.into();
        self.node(node)?;
        if self.names.contains_key(&name) {
            return Err(EventError::DuplicateRegistration(name));
        }
        debug!(target: "events", "Registered profile '{}' as node {}", name, node);
        self.names.insert(name.clone(), node);
        self.nodes[node.0].name = Some(name);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn parents(&self, node: NodeId) -> Result<&[NodeId], EventError> {
        Ok(&self.node(node)?.parents)
    }

    pub fn on<F>(&mut self, node: NodeId, kind: EventKind, callback: F) -> Result<(), EventError>
    where
        F: Fn(&mut BotContext<'_>, &mut Event<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.node_mut(node)?
            .handlers
            .entry(kind)
            .or_default()
            .push(Arc::new(callback));
        Ok(())
    }

    pub fn on_create<F>(&mut self, node: NodeId, callback: F) -> Result<(), EventError>
    where
        F: Fn(&mut BotContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on(node, EventKind::Create, move |ctx, _| callback(ctx))
    }

    pub fn on_auth_challenge<F>(&mut self, node: NodeId, callback: F) -> Result<(), EventError>
    where
        F: Fn(&mut BotContext<'_>, &mut Vec<u8>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on(node, EventKind::AuthChallenge, move |ctx, event| match event {
            Event::AuthChallenge { packet } => callback(ctx, packet),
            _ => Ok(()),
        })
    }

    pub fn on_auth_proof<F>(&mut self, node: NodeId, callback: F) -> Result<(), EventError>
    where
        F: Fn(&mut BotContext<'_>, &AuthChallenge, &mut Vec<u8>) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.on(node, EventKind::AuthProof, move |ctx, event| match event {
            Event::AuthProof { challenge, packet } => callback(ctx, challenge, packet),
            _ => Ok(()),
        })
    }

    pub fn on_request_realms<F>(&mut self, node: NodeId, callback: F) -> Result<(), EventError>
    where
        F: Fn(&mut BotContext<'_>, &mut Vec<u8>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on(node, EventKind::RequestRealms, move |ctx, event| match event {
            Event::RequestRealms { packet } => callback(ctx, packet),
            _ => Ok(()),
        })
    }

    pub fn on_select_realm<F>(&mut self, node: NodeId, callback: F) -> Result<(), EventError>
    where
        F: Fn(&mut BotContext<'_>, &[Realm], &mut usize) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on(node, EventKind::SelectRealm, move |ctx, event| match event {
            Event::SelectRealm { realms, selected } => callback(ctx, realms, selected),
            _ => Ok(()),
        })
    }

    pub fn on_close_auth_connection<F>(&mut self, node: NodeId, callback: F) -> Result<(), EventError>
    where
        F: Fn(&mut BotContext<'_>, &mut bool) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on(node, EventKind::CloseAuthConnection, move |ctx, event| match event {
            Event::CloseAuthConnection { should_close } => callback(ctx, should_close),
            _ => Ok(()),
        })
    }

    pub fn on_world_auth_challenge<F>(&mut self, node: NodeId, callback: F) -> Result<(), EventError>
    where
        F: Fn(&mut BotContext<'_>, &WorldAuthChallenge, &mut WorldPacket) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.on(node, EventKind::WorldAuthChallenge, move |ctx, event| match event {
            Event::WorldAuthChallenge { challenge, session } => callback(ctx, challenge, session),
            _ => Ok(()),
        })
    }

    pub fn on_world_auth_response<F>(&mut self, node: NodeId, callback: F) -> Result<(), EventError>
    where
        F: Fn(&mut BotContext<'_>, &AuthResponse, &mut WorldPacket) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.on(node, EventKind::WorldAuthResponse, move |ctx, event| match event {
            Event::WorldAuthResponse { response, char_enum } => callback(ctx, response, char_enum),
            _ => Ok(()),
        })
    }

    /// Registers a callback for inbound packets with the given opcode.
    pub fn on_world_packet<F>(&mut self, node: NodeId, opcode: u32, callback: F) -> Result<(), EventError>
    where
        F: Fn(&mut BotContext<'_>, &WorldPacket) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let handler: Callback = Arc::new(
            move |ctx: &mut BotContext<'_>, event: &mut Event<'_>| match event {
                Event::WorldPacket(packet) => callback(ctx, packet),
                _ => Ok(()),
            },
        );
        self.node_mut(node)?
            .packet_handlers
            .entry(opcode)
            .or_default()
            .push(handler);
        Ok(())
    }

    /// Registers `callback` for every movement opcode, with the packet
    /// already decoded.
    pub fn on_movement_packet<F>(&mut self, node: NodeId, callback: F) -> Result<(), EventError>
    where
        F: Fn(&mut BotContext<'_>, &MovementPacket) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        for opcode in opcodes::MOVEMENT_OPCODES {
            let callback = Arc::clone(&callback);
            self.on_world_packet(node, opcode, move |ctx, packet| {
                let movement = MovementPacket::read(packet)?;
                callback(ctx, &movement)
            })?;
        }
        Ok(())
    }

    /// Registers `callback` for plain and compressed object updates.
    pub fn on_update_data<F>(&mut self, node: NodeId, callback: F) -> Result<(), EventError>
    where
        F: Fn(&mut BotContext<'_>, &UpdateData) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        for opcode in [opcodes::SMSG_UPDATE_OBJECT, opcodes::SMSG_COMPRESSED_UPDATE_OBJECT] {
            let callback = Arc::clone(&callback);
            self.on_world_packet(node, opcode, move |ctx, packet| {
                let update = UpdateData::from_packet(packet)?;
                callback(ctx, &update)
            })?;
        }
        Ok(())
    }

    pub fn set_behavior(&mut self, node: NodeId, factory: BehaviorFactory) -> Result<(), EventError> {
        self.node_mut(node)?.behavior = Some(factory);
        Ok(())
    }

    /// Flattens the graph. Every node's callbacks become the concatenation of
    /// its ancestors' own callbacks, each ancestor appearing once, parents
    /// before children.
    pub fn build(self) -> EventTable {
        let count = self.nodes.len();

        let mut children = vec![Vec::new(); count];
        for (id, node) in self.nodes.iter().enumerate() {
            for parent in &node.parents {
                children[parent.0].push(id);
            }
        }

        // Parents always have lower ids than their children, so a reverse
        // sweep sees every child's depth first.
        let mut depth = vec![0_usize; count];
        for id in (0..count).rev() {
            depth[id] = children[id]
                .iter()
                .map(|child| depth[*child] + 1)
                .max()
                .unwrap_or(0);
        }

        let mut visit: Vec<usize> = (0..count).collect();
        visit.sort_by(|a, b| depth[*b].cmp(&depth[*a]));

        let mut ancestry: Vec<Vec<NodeId>> = vec![Vec::new(); count];
        for id in visit {
            let mut order: Vec<NodeId> = Vec::new();
            for parent in &self.nodes[id].parents {
                for ancestor in &ancestry[parent.0] {
                    if !order.contains(ancestor) {
                        order.push(*ancestor);
                    }
                }
            }
            order.push(NodeId(id));
            ancestry[id] = order;
        }

        let flat = ancestry
            .into_iter()
            .enumerate()
            .map(|(id, order)| {
                let mut handlers: HashMap<EventKind, Vec<Callback>> = HashMap::new();
                let mut packet_handlers: HashMap<u32, Vec<Callback>> = HashMap::new();
                let mut behavior = None;
                for ancestor in &order {
                    let own = &self.nodes[ancestor.0];
                    for (kind, callbacks) in &own.handlers {
                        handlers.entry(*kind).or_default().extend(callbacks.iter().cloned());
                    }
                    for (opcode, callbacks) in &own.packet_handlers {
                        packet_handlers
                            .entry(*opcode)
                            .or_default()
                            .extend(callbacks.iter().cloned());
                    }
                    if own.behavior.is_some() {
                        behavior = own.behavior.clone();
                    }
                }
                FlatNode {
                    name: self.nodes[id].name.clone(),
                    ancestry: order,
                    handlers,
                    packet_handlers,
                    behavior,
                }
            })
            .collect();

        debug!(target: "events", "Built event table with {} nodes", count);
        EventTable::new(flat, self.names)
    }

    fn node(&self, node: NodeId) -> Result<&Node, EventError> {
        self.nodes.get(node.0).ok_or(EventError::UnknownNode(node))
    }

    fn node_mut(&mut self, node: NodeId) -> Result<&mut Node, EventError> {
        self.nodes.get_mut(node.0).ok_or(EventError::UnknownNode(node))
    }
}

impl fmt::Debug for EventGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventGraph")
            .field("nodes", &self.nodes.len())
            .field("names", &self.names)
            .finish()
    }
}
