//! Profiles are named nodes of the event graph. A [`ProfileSet`] installs a
//! group of them every time a worker builds or reloads its graph.

pub mod auto_login;
pub mod logger;

use frostbot_events::{profile_name, EventGraph, EventTable};

pub use auto_login::ActiveCharacter;

pub const MODULE: &str = "frostbot";

pub fn logger_profile() -> String {
    profile_name(MODULE, "logger")
}

pub fn auto_login_profile() -> String {
    profile_name(MODULE, "auto_login")
}

pub fn default_profile() -> String {
    profile_name(MODULE, "default")
}

/// Something that can register profiles on a fresh graph.
pub trait ProfileSet: Send + Sync {
    fn install(&self, graph: &mut EventGraph) -> anyhow::Result<()>;
}

impl<F> ProfileSet for F
where
    F: Fn(&mut EventGraph) -> anyhow::Result<()> + Send + Sync,
{
    fn install(&self, graph: &mut EventGraph) -> anyhow::Result<()> {
        self(graph)
    }
}

/// `frostbot:logger`, `frostbot:auto_login` and `frostbot:default`, the last
/// inheriting from the other two.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinProfiles;

impl ProfileSet for BuiltinProfiles {
    fn install(&self, graph: &mut EventGraph) -> anyhow::Result<()> {
        let logger = graph.create(&[])?;
        graph.register(logger, logger_profile())?;
        logger::install(graph, logger)?;

        let auto_login = graph.create(&[])?;
        graph.register(auto_login, auto_login_profile())?;
        auto_login::install(graph, auto_login)?;

        let default = graph.create(&[logger, auto_login])?;
        graph.register(default, default_profile())?;
        Ok(())
    }
}

/// Builtins followed by any extra sets, installed in order.
pub struct ProfileChain {
    sets: Vec<Box<dyn ProfileSet>>,
}

impl Default for ProfileChain {
    fn default() -> Self {
        Self {
            sets: vec![Box::new(BuiltinProfiles)],
        }
    }
}

impl ProfileChain {
    pub fn empty() -> Self {
        Self { sets: Vec::new() }
    }

    pub fn with(mut self, set: impl ProfileSet + 'static) -> Self {
        self.sets.push(Box::new(set));
        self
    }
}

impl ProfileSet for ProfileChain {
    fn install(&self, graph: &mut EventGraph) -> anyhow::Result<()> {
        for set in &self.sets {
            set.install(graph)?;
        }
        Ok(())
    }
}

/// Builds a fresh table from `profiles`.
pub fn build_table(profiles: &dyn ProfileSet) -> anyhow::Result<EventTable> {
    let mut graph = EventGraph::new();
    profiles.install(&mut graph)?;
    Ok(graph.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use frostbot_events::{BotContext, Event, EventKind, Storage};
    use frostbot_protocol::codec::definitions;
    use frostbot_protocol::codec::{Record, Value};
    use frostbot_protocol::packets::opcodes;
    use frostbot_protocol::WorldPacket;

    #[test]
    fn test_builtin_profiles_form_a_diamond() {
        let table = build_table(&BuiltinProfiles).unwrap();
        let root = table.root();
        let logger = table.lookup("frostbot:logger").unwrap();
        let auto_login = table.lookup("frostbot:auto_login").unwrap();
        let default = table.lookup("frostbot:default").unwrap();

        assert_eq!(table.ancestry(default), &[root, logger, auto_login, default]);
        assert_eq!(table.handler_count(default, EventKind::Create), 1);
        assert!(table.handles_opcode(default, opcodes::SMSG_CHAR_ENUM));
        assert!(!table.handles_opcode(logger, opcodes::SMSG_CHAR_ENUM));
    }

    #[test]
    fn test_installing_twice_is_a_duplicate() {
        let chain = ProfileChain::default().with(BuiltinProfiles);
        let err = build_table(&chain).unwrap_err();
        assert!(err.to_string().contains("frostbot:logger"));
    }

    #[test]
    fn test_closure_profiles_chain_after_builtins() {
        let chain = ProfileChain::default().with(|graph: &mut EventGraph| -> anyhow::Result<()> {
            let parent = graph
                .lookup("frostbot:default")
                .ok_or_else(|| anyhow::anyhow!("default profile missing"))?;
            let node = graph.create(&[parent])?;
            graph.register(node, "custom:quiet")?;
            Ok(())
        });
        let table = build_table(&chain).unwrap();
        let node = table.lookup("custom:quiet").unwrap();
        assert_eq!(table.ancestry(node).len(), 5);
    }

    fn character(guid: u64, name: &str) -> Value {
        let equipment = |_| -> Value {
            Record::new()
                .with("display_id", 0_u32)
                .with("inventory_type", 0_u8)
                .with("enchant", 0_u32)
                .into()
        };
        Record::new()
            .with("guid", guid)
            .with("name", name)
            .with("race", 1_u8)
            .with("class", 1_u8)
            .with("gender", 0_u8)
            .with("appearance", vec![Value::from(0_u8); 5])
            .with("level", 1_u8)
            .with("zone", 12_u32)
            .with("map", 0_u32)
            .with("x", 0.0_f32)
            .with("y", 0.0_f32)
            .with("z", 0.0_f32)
            .with("guild", 0_u32)
            .with("flags", 0_u32)
            .with("customize", 0_u32)
            .with("first_login", 0_u8)
            .with("pet_display", 0_u32)
            .with("pet_level", 0_u32)
            .with("pet_family", 0_u32)
            .with("items", (0..definitions::EQUIPMENT_SLOTS).map(equipment).collect::<Vec<_>>())
            .with("bags", (0..definitions::BAG_SLOTS).map(equipment).collect::<Vec<_>>())
            .into()
    }

    #[test]
    fn test_auto_login_picks_first_character_once() {
        let table = build_table(&BuiltinProfiles).unwrap();
        let node = table.lookup("frostbot:default").unwrap();

        let record = Record::new().with(
            "characters",
            vec![character(0x77, "Arthas"), character(0x88, "Jaina")],
        );
        let packet = definitions::builtin()
            .encode_packet(definitions::SMSG_CHAR_ENUM, &record)
            .unwrap();

        let mut storage = Storage::new();
        let mut outbox = Vec::new();
        for _ in 0..2 {
            let mut ctx = BotContext::new("BOT", &mut storage, &mut outbox);
            table.fire(node, &mut ctx, &mut Event::WorldPacket(&packet));
        }

        let mut expected = WorldPacket::new(opcodes::CMSG_PLAYER_LOGIN);
        expected.payload_mut().extend_from_slice(&0x77_u64.to_le_bytes());
        assert_eq!(outbox, vec![expected]);
        assert_eq!(
            storage.get::<ActiveCharacter>(),
            Some(&ActiveCharacter {
                guid: 0x77,
                name: "Arthas".to_string()
            })
        );
    }

    #[test]
    fn test_auto_login_with_empty_account_sends_nothing() {
        let table = build_table(&BuiltinProfiles).unwrap();
        let node = table.lookup("frostbot:auto_login").unwrap();
        let packet = WorldPacket::with_payload(opcodes::SMSG_CHAR_ENUM, vec![0]);

        let mut storage = Storage::new();
        let mut outbox = Vec::new();
        let mut ctx = BotContext::new("BOT", &mut storage, &mut outbox);
        table.fire(node, &mut ctx, &mut Event::WorldPacket(&packet));

        assert!(outbox.is_empty());
        assert!(!storage.contains::<ActiveCharacter>());
    }
}
