use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::FrameError;

/// Client to server header: u16 big-endian size, u32 little-endian opcode.
pub const CLIENT_HEADER_LENGTH: usize = 6;
/// Server to client header with a two byte size.
pub const SERVER_HEADER_LENGTH: usize = 4;
/// Server to client header with a three byte size.
pub const LARGE_SERVER_HEADER_LENGTH: usize = 5;

const LARGE_HEADER_FLAG: u8 = 0x80;
const SMALL_SIZE_MAX: u32 = 0x7FFF;
const LARGE_SIZE_MAX: u32 = 0x7F_FFFF;
const CLIENT_OPCODE_LENGTH: usize = 4;
const SERVER_OPCODE_LENGTH: usize = 2;

/// Header of a packet sent by the client. `size` counts the opcode and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientHeader {
    pub size: u16,
    pub opcode: u32,
}

impl ClientHeader {
    pub fn for_payload(opcode: u32, payload_len: usize) -> Result<Self, FrameError> {
        let size = u16::try_from(payload_len + CLIENT_OPCODE_LENGTH)
            .map_err(|_| FrameError::TooLarge(payload_len))?;
        Ok(Self { size, opcode })
    }

    pub fn payload_len(&self) -> Result<usize, FrameError> {
        usize::from(self.size)
            .checked_sub(CLIENT_OPCODE_LENGTH)
            .ok_or(FrameError::InvalidSize(u32::from(self.size)))
    }

    pub fn encode(&self) -> [u8; CLIENT_HEADER_LENGTH] {
        let mut out = [0_u8; CLIENT_HEADER_LENGTH];
        BigEndian::write_u16(&mut out[0..2], self.size);
        LittleEndian::write_u32(&mut out[2..6], self.opcode);
        out
    }

    pub fn decode(bytes: &[u8; CLIENT_HEADER_LENGTH]) -> Self {
        Self {
            size: BigEndian::read_u16(&bytes[0..2]),
            opcode: LittleEndian::read_u32(&bytes[2..6]),
        }
    }
}

/// Header of a packet sent by the server. `size` counts the opcode and payload.
///
/// Sizes above `0x7FFF` switch to the five byte form, flagged by the high bit
/// of the first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerHeader {
    pub size: u32,
    pub opcode: u16,
}

impl ServerHeader {
    pub fn for_payload(opcode: u32, payload_len: usize) -> Result<Self, FrameError> {
        let opcode = u16::try_from(opcode).map_err(|_| FrameError::InvalidOpcode(opcode))?;
        let size = u32::try_from(payload_len + SERVER_OPCODE_LENGTH)
            .ok()
            .filter(|size| *size <= LARGE_SIZE_MAX)
            .ok_or(FrameError::TooLarge(payload_len))?;
        Ok(Self { size, opcode })
    }

    pub fn is_large(&self) -> bool {
        self.size > SMALL_SIZE_MAX
    }

    pub fn payload_len(&self) -> Result<usize, FrameError> {
        (self.size as usize)
            .checked_sub(SERVER_OPCODE_LENGTH)
            .ok_or(FrameError::InvalidSize(self.size))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(LARGE_SERVER_HEADER_LENGTH);
        if self.is_large() {
            out.push(LARGE_HEADER_FLAG | (self.size >> 16) as u8);
            out.push((self.size >> 8) as u8);
            out.push(self.size as u8);
        } else {
            out.push((self.size >> 8) as u8);
            out.push(self.size as u8);
        }
        out.extend_from_slice(&self.opcode.to_le_bytes());
        out
    }

    /// Length of the header whose first (already decrypted) byte is `first`.
    pub fn length_from_first_byte(first: u8) -> usize {
        if first & LARGE_HEADER_FLAG != 0 {
            LARGE_SERVER_HEADER_LENGTH
        } else {
            SERVER_HEADER_LENGTH
        }
    }

    /// Decodes a plaintext header. `bytes` must hold exactly the 4 or 5 header bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let first = *bytes.first().ok_or(FrameError::InvalidSize(0))?;
        let expected = Self::length_from_first_byte(first);
        if bytes.len() != expected {
            return Err(FrameError::InvalidSize(bytes.len() as u32));
        }

        let high = u32::from(first & !LARGE_HEADER_FLAG);
        let (size, opcode_at) = if expected == LARGE_SERVER_HEADER_LENGTH {
            (
                (high << 16) | (u32::from(bytes[1]) << 8) | u32::from(bytes[2]),
                3,
            )
        } else {
            ((high << 8) | u32::from(bytes[1]), 2)
        };
        let opcode = LittleEndian::read_u16(&bytes[opcode_at..opcode_at + 2]);

        Ok(Self { size, opcode })
    }
}
