use strum_macros::Display;

use frostbot_protocol::packets::auth::{AuthChallenge, Realm};
use frostbot_protocol::packets::world_auth::{AuthResponse, WorldAuthChallenge};
use frostbot_protocol::WorldPacket;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum EventKind {
    Create,
    AuthChallenge,
    AuthProof,
    RequestRealms,
    SelectRealm,
    CloseAuthConnection,
    WorldAuthChallenge,
    WorldAuthResponse,
    WorldPacket,
}

/// One protocol step, handed to every callback registered for its kind.
///
/// Outgoing packets are passed by mutable reference so a callback can
/// rewrite them before the session sends them.
#[derive(Debug)]
pub enum Event<'a> {
    /// A session was created, before any connection is made.
    Create,
    AuthChallenge {
        packet: &'a mut Vec<u8>,
    },
    AuthProof {
        challenge: &'a AuthChallenge,
        packet: &'a mut Vec<u8>,
    },
    RequestRealms {
        packet: &'a mut Vec<u8>,
    },
    SelectRealm {
        realms: &'a [Realm],
        /// Index into `realms`. Starts at 0.
        selected: &'a mut usize,
    },
    CloseAuthConnection {
        should_close: &'a mut bool,
    },
    WorldAuthChallenge {
        challenge: &'a WorldAuthChallenge,
        session: &'a mut WorldPacket,
    },
    WorldAuthResponse {
        response: &'a AuthResponse,
        char_enum: &'a mut WorldPacket,
    },
    /// Any inbound packet once the session is streaming.
    WorldPacket(&'a WorldPacket),
}

impl Event<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Create => EventKind::Create,
            Self::AuthChallenge { .. } => EventKind::AuthChallenge,
            Self::AuthProof { .. } => EventKind::AuthProof,
            Self::RequestRealms { .. } => EventKind::RequestRealms,
            Self::SelectRealm { .. } => EventKind::SelectRealm,
            Self::CloseAuthConnection { .. } => EventKind::CloseAuthConnection,
            Self::WorldAuthChallenge { .. } => EventKind::WorldAuthChallenge,
            Self::WorldAuthResponse { .. } => EventKind::WorldAuthResponse,
            Self::WorldPacket(_) => EventKind::WorldPacket,
        }
    }

    /// Opcode of an inbound packet event.
    pub fn opcode(&self) -> Option<u32> {
        match self {
            Self::WorldPacket(packet) => Some(packet.opcode()),
            _ => None,
        }
    }
}
