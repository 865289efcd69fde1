use std::sync::{Arc, Mutex};
use std::time::Duration;

use frostbot_events::{
    Behavior, BehaviorFactory, BotContext, Event, EventGraph, EventKind, NodeId, Storage,
};
use frostbot_protocol::packets::movement::{MovementInfo, MovementPacket};
use frostbot_protocol::packets::opcodes;
use frostbot_protocol::packets::update::UpdateData;
use frostbot_protocol::{PacketWrite, WorldPacket};

type Log = Arc<Mutex<Vec<String>>>;

fn record(graph: &mut EventGraph, node: NodeId, log: &Log, label: &'static str) {
    let log = Arc::clone(log);
    graph
        .on_create(node, move |_| {
            log.lock().unwrap().push(label.to_string());
            Ok(())
        })
        .unwrap();
}

fn fire_create(table: &frostbot_events::EventTable, node: NodeId) -> Vec<WorldPacket> {
    let mut storage = Storage::new();
    let mut outbox = Vec::new();
    let mut ctx = BotContext::new("TEST", &mut storage, &mut outbox);
    table.fire(node, &mut ctx, &mut Event::Create);
    outbox
}

#[test]
fn test_diamond_fires_each_ancestor_once_in_order() {
    let log: Log = Arc::default();
    let mut graph = EventGraph::new();
    let root = graph.root();
    let a = graph.create(&[]).unwrap();
    let b = graph.create(&[root]).unwrap();
    let c = graph.create(&[a, b]).unwrap();
    record(&mut graph, root, &log, "R");
    record(&mut graph, a, &log, "A");
    record(&mut graph, b, &log, "B");
    record(&mut graph, c, &log, "C");

    let table = graph.build();
    assert_eq!(table.ancestry(c), &[root, a, b, c]);
    assert_eq!(table.handler_count(c, EventKind::Create), 4);

    fire_create(&table, c);
    assert_eq!(*log.lock().unwrap(), ["R", "A", "B", "C"]);

    log.lock().unwrap().clear();
    fire_create(&table, b);
    assert_eq!(*log.lock().unwrap(), ["R", "B"]);
}

#[test]
fn test_deep_chain_and_shared_grandparent() {
    let log: Log = Arc::default();
    let mut graph = EventGraph::new();
    let base = graph.create(&[]).unwrap();
    let left = graph.create(&[base]).unwrap();
    let right = graph.create(&[base]).unwrap();
    let leaf = graph.create(&[right, left]).unwrap();
    record(&mut graph, base, &log, "base");
    record(&mut graph, left, &log, "left");
    record(&mut graph, right, &log, "right");
    record(&mut graph, leaf, &log, "leaf");

    let table = graph.build();
    fire_create(&table, leaf);
    assert_eq!(*log.lock().unwrap(), ["base", "right", "left", "leaf"]);
}

#[test]
fn test_failing_and_panicking_callbacks_do_not_stop_siblings() {
    let log: Log = Arc::default();
    let mut graph = EventGraph::new();
    let node = graph.create(&[]).unwrap();
    record(&mut graph, node, &log, "first");
    graph
        .on_create(node, |_| anyhow::bail!("refusing"))
        .unwrap();
    graph.on_create(node, |_| panic!("boom")).unwrap();
    record(&mut graph, node, &log, "last");

    let table = graph.build();
    fire_create(&table, node);
    assert_eq!(*log.lock().unwrap(), ["first", "last"]);
}

#[test]
fn test_packet_callbacks_run_after_unkeyed_ones() {
    let log: Log = Arc::default();
    let mut graph = EventGraph::new();
    let node = graph.create(&[]).unwrap();

    let keyed = Arc::clone(&log);
    graph
        .on_world_packet(node, opcodes::SMSG_CHAR_ENUM, move |ctx, packet| {
            keyed.lock().unwrap().push(format!("keyed {}", packet.len()));
            ctx.send(WorldPacket::new(opcodes::CMSG_PLAYER_LOGIN));
            Ok(())
        })
        .unwrap();
    let unkeyed = Arc::clone(&log);
    graph
        .on(node, EventKind::WorldPacket, move |_, event| {
            unkeyed
                .lock()
                .unwrap()
                .push(format!("any {:#x}", event.opcode().unwrap_or_default()));
            Ok(())
        })
        .unwrap();

    let table = graph.build();
    assert!(table.handles_opcode(node, opcodes::SMSG_CHAR_ENUM));

    let mut storage = Storage::new();
    let mut outbox = Vec::new();
    let mut ctx = BotContext::new("TEST", &mut storage, &mut outbox);
    let packet = WorldPacket::with_payload(opcodes::SMSG_CHAR_ENUM, vec![0]);
    table.fire(node, &mut ctx, &mut Event::WorldPacket(&packet));
    let other = WorldPacket::new(opcodes::SMSG_AUTH_RESPONSE);
    table.fire(node, &mut ctx, &mut Event::WorldPacket(&other));

    assert_eq!(
        *log.lock().unwrap(),
        [
            format!("any {:#x}", opcodes::SMSG_CHAR_ENUM),
            "keyed 1".to_string(),
            format!("any {:#x}", opcodes::SMSG_AUTH_RESPONSE),
        ]
    );
    assert_eq!(outbox, vec![WorldPacket::new(opcodes::CMSG_PLAYER_LOGIN)]);
}

#[test]
fn test_callbacks_rewrite_outgoing_packets_and_cancel() {
    let mut graph = EventGraph::new();
    let node = graph.create(&[]).unwrap();
    graph
        .on_auth_challenge(node, |_, packet| {
            packet.push(0xAA);
            Ok(())
        })
        .unwrap();
    graph
        .on_auth_challenge(node, |ctx, packet| {
            if packet.last() == Some(&0xAA) {
                ctx.cancel();
            }
            Ok(())
        })
        .unwrap();
    graph
        .on_select_realm(node, |_, realms, selected| {
            *selected = realms.len().saturating_sub(1);
            Ok(())
        })
        .unwrap();

    let table = graph.build();
    let mut storage = Storage::new();
    let mut outbox = Vec::new();

    let mut packet = vec![0x00];
    let mut ctx = BotContext::new("TEST", &mut storage, &mut outbox);
    table.fire(node, &mut ctx, &mut Event::AuthChallenge { packet: &mut packet });
    assert!(ctx.is_cancelled());
    assert_eq!(packet, vec![0x00, 0xAA]);

    let mut selected = 0;
    let mut ctx = BotContext::new("TEST", &mut storage, &mut outbox);
    table.fire(
        node,
        &mut ctx,
        &mut Event::SelectRealm {
            realms: &[],
            selected: &mut selected,
        },
    );
    assert!(!ctx.is_cancelled());
    assert_eq!(selected, 0);
}

struct Ticker(u32);

impl Behavior for Ticker {
    fn update(&mut self, ctx: &mut BotContext<'_>, _delta: Duration) -> anyhow::Result<()> {
        self.0 += 1;
        *ctx.storage.get_or_default::<u32>() = self.0;
        Ok(())
    }
}

#[test]
fn test_nearest_behavior_is_inherited() {
    let mut graph = EventGraph::new();
    let parent = graph.create(&[]).unwrap();
    let child = graph.create(&[parent]).unwrap();
    let overriding = graph.create(&[parent]).unwrap();

    let slow: BehaviorFactory = Arc::new(|| Box::new(Ticker(0)) as Box<dyn Behavior>);
    let fast: BehaviorFactory = Arc::new(|| Box::new(Ticker(100)) as Box<dyn Behavior>);
    graph.set_behavior(parent, slow).unwrap();
    graph.set_behavior(overriding, fast).unwrap();

    let table = graph.build();
    assert!(table.behavior(table.root()).is_none());

    let mut storage = Storage::new();
    let mut outbox = Vec::new();
    let mut ctx = BotContext::new("TEST", &mut storage, &mut outbox);

    let mut inherited = table.behavior(child).unwrap();
    inherited.update(&mut ctx, Duration::from_millis(5)).unwrap();
    assert_eq!(ctx.storage.get::<u32>(), Some(&1));

    let mut own = table.behavior(overriding).unwrap();
    own.update(&mut ctx, Duration::from_millis(5)).unwrap();
    assert_eq!(ctx.storage.get::<u32>(), Some(&101));
}

#[test]
fn test_movement_and_update_helpers_decode_packets() {
    let seen: Log = Arc::default();
    let mut graph = EventGraph::new();
    let node = graph.create(&[]).unwrap();

    let movement_log = Arc::clone(&seen);
    graph
        .on_movement_packet(node, move |_, movement| {
            movement_log
                .lock()
                .unwrap()
                .push(format!("move {:#x}", movement.guid));
            Ok(())
        })
        .unwrap();
    let update_log = Arc::clone(&seen);
    graph
        .on_update_data(node, move |_, update| {
            update_log
                .lock()
                .unwrap()
                .push(format!("update {}", update.blocks.len()));
            Ok(())
        })
        .unwrap();

    let table = graph.build();
    for opcode in opcodes::MOVEMENT_OPCODES {
        assert!(table.handles_opcode(node, opcode));
    }

    let movement = MovementPacket {
        opcode: opcodes::MSG_MOVE_HEARTBEAT,
        guid: 0x42,
        info: MovementInfo::default(),
    }
    .to_packet();
    let mut update_payload = Vec::new();
    update_payload.write_u32(0);
    let update = WorldPacket::with_payload(opcodes::SMSG_UPDATE_OBJECT, update_payload);
    let garbage = WorldPacket::with_payload(opcodes::MSG_MOVE_HEARTBEAT, vec![0xFF]);

    let mut storage = Storage::new();
    let mut outbox = Vec::new();
    let mut ctx = BotContext::new("TEST", &mut storage, &mut outbox);
    for packet in [&movement, &update, &garbage] {
        table.fire(node, &mut ctx, &mut Event::WorldPacket(packet));
    }

    let update_data = UpdateData::from_packet(&update).unwrap();
    assert!(update_data.blocks.is_empty());
    assert_eq!(*seen.lock().unwrap(), ["move 0x42", "update 0"]);
}
