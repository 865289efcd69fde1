use tracing::debug;

use frostbot_events::{Event, EventGraph, EventKind, NodeId};
use frostbot_protocol::packets::opcodes;

const HANDSHAKE_EVENTS: [EventKind; 8] = [
    EventKind::Create,
    EventKind::AuthChallenge,
    EventKind::AuthProof,
    EventKind::RequestRealms,
    EventKind::SelectRealm,
    EventKind::CloseAuthConnection,
    EventKind::WorldAuthChallenge,
    EventKind::WorldAuthResponse,
];

/// Logs every handshake step and inbound opcode at debug level.
pub fn install(graph: &mut EventGraph, node: NodeId) -> anyhow::Result<()> {
    for kind in HANDSHAKE_EVENTS {
        graph.on(node, kind, move |ctx, event| {
            match event {
                Event::SelectRealm { realms, .. } => {
                    let names: Vec<&str> = realms.iter().map(|realm| realm.name.as_str()).collect();
                    debug!(target: "events", "[{}] {} from {:?}", ctx.username(), kind, names);
                }
                Event::WorldAuthResponse { response, .. } => {
                    debug!(target: "events", "[{}] {} {:?}", ctx.username(), kind, response.command_detail());
                }
                _ => debug!(target: "events", "[{}] {}", ctx.username(), kind),
            }
            Ok(())
        })?;
    }

    graph.on(node, EventKind::WorldPacket, |ctx, event| {
        if let Event::WorldPacket(packet) = event {
            debug!(target: "events", "[{}] <- {} ({:#06x}, {} bytes)",
                ctx.username(),
                opcodes::name(packet.opcode()).unwrap_or("UNKNOWN"),
                packet.opcode(),
                packet.len()
            );
        }
        Ok(())
    })?;
    Ok(())
}
