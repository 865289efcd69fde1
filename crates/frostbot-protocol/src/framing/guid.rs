use crate::buffer::PacketReader;
use crate::error::DecodeError;

/// Encodes a GUID as a mask byte followed by its non-zero bytes, low byte first.
pub fn encode_packed_guid(guid: u64) -> Vec<u8> {
    let mut out = vec![0_u8];
    for (i, byte) in guid.to_le_bytes().into_iter().enumerate() {
        if byte != 0 {
            out[0] |= 1 << i;
            out.push(byte);
        }
    }
    out
}

pub fn read_packed_guid(reader: &mut PacketReader<'_>) -> Result<u64, DecodeError> {
    let mask = reader.read_u8()?;
    let mut guid = 0_u64;
    for i in 0..8 {
        if mask & (1 << i) != 0 {
            guid |= u64::from(reader.read_u8()?) << (i * 8);
        }
    }
    Ok(guid)
}
