//! Packet layouts for the login server and the handful of world packets the
//! engine understands itself.

pub mod auth;
pub mod movement;
pub mod opcodes;
pub mod update;
pub mod world_auth;

use crate::buffer::PacketReader;

/// A framed world packet: opcode plus unencrypted payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorldPacket {
    opcode: u32,
    payload: Vec<u8>,
}

impl WorldPacket {
    pub fn new(opcode: u32) -> Self {
        Self {
            opcode,
            payload: Vec::new(),
        }
    }

    pub fn with_payload(opcode: u32, payload: Vec<u8>) -> Self {
        Self { opcode, payload }
    }

    pub fn opcode(&self) -> u32 {
        self.opcode
    }

    pub fn set_opcode(&mut self, opcode: u32) {
        self.opcode = opcode;
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Mutable body, usable with [`PacketWrite`](crate::PacketWrite).
    pub fn payload_mut(&mut self) -> &mut Vec<u8> {
        &mut self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// A fresh cursor at the start of the payload.
    pub fn reader(&self) -> PacketReader<'_> {
        PacketReader::new(&self.payload)
    }
}
