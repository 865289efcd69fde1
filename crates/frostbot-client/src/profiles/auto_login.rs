use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use frostbot_events::{EventGraph, NodeId};
use frostbot_protocol::codec::definitions::{self, CMSG_PLAYER_LOGIN};
use frostbot_protocol::codec::Record;
use frostbot_protocol::packets::opcodes;

/// The character a bot chose at character select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveCharacter {
    pub guid: u64,
    pub name: String,
}

/// Logs in with the first character of the account once the character
/// list arrives.
pub fn install(graph: &mut EventGraph, node: NodeId) -> anyhow::Result<()> {
    let schemas = Arc::new(definitions::builtin());
    graph.on_world_packet(node, opcodes::SMSG_CHAR_ENUM, move |ctx, packet| {
        if ctx.storage.contains::<ActiveCharacter>() {
            return Ok(());
        }

        let (_, list) = schemas.decode_packet(packet)?;
        let Some(first) = list
            .get_list("characters")
            .and_then(|characters| characters.first())
            .and_then(|entry| entry.as_record())
        else {
            error!(target: "events", "Auto login: no characters found on account '{}'", ctx.username());
            return Ok(());
        };

        let guid = first.get_u64("guid").context("character entry has no guid")?;
        let name = first.get_str("name").unwrap_or_default().to_string();
        info!(target: "events", "Auto login: {} entering the world as '{}' ({:#x})", ctx.username(), name, guid);

        let login = schemas.encode_packet(CMSG_PLAYER_LOGIN, &Record::new().with("guid", guid))?;
        ctx.send(login);
        ctx.storage.insert(ActiveCharacter { guid, name });
        Ok(())
    })?;
    Ok(())
}
