use byteorder::{ByteOrder, LittleEndian};

use crate::error::DecodeError;
use crate::framing::guid;

/// Bounds-checked little-endian cursor over a packet body.
///
/// Every read either returns a value and advances, or returns
/// [`DecodeError::UnexpectedEnd`] and leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Bytes not consumed yet.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(count)
            .filter(|end| *end <= self.data.len())
            .ok_or(DecodeError::UnexpectedEnd {
                offset: self.pos,
                wanted: count,
                len: self.data.len(),
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0_u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn skip(&mut self, count: usize) -> Result<(), DecodeError> {
        self.read_bytes(count).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(LittleEndian::read_i16(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(LittleEndian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(LittleEndian::read_u64(self.read_bytes(8)?))
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(LittleEndian::read_i64(self.read_bytes(8)?))
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(LittleEndian::read_f32(self.read_bytes(4)?))
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(LittleEndian::read_f64(self.read_bytes(8)?))
    }

    /// Reads up to and including the zero terminator.
    pub fn read_cstring(&mut self) -> Result<String, DecodeError> {
        let rest = self.rest();
        let len = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(DecodeError::UnterminatedString(self.pos))?;
        let text = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += len + 1;
        Ok(text)
    }

    /// Reads exactly `len` bytes, dropping any zero padding at the end.
    pub fn read_fixed_string(&mut self, len: usize) -> Result<String, DecodeError> {
        let bytes = self.read_bytes(len)?;
        let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    pub fn read_packed_guid(&mut self) -> Result<u64, DecodeError> {
        guid::read_packed_guid(self)
    }
}

/// Little-endian append helpers for packet bodies.
///
/// Calls chain, so a packet reads top to bottom in wire order.
pub trait PacketWrite {
    fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self;

    fn write_u8(&mut self, value: u8) -> &mut Self {
        self.write_bytes(&[value])
    }

    fn write_i8(&mut self, value: i8) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    fn write_u16(&mut self, value: u16) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    fn write_i16(&mut self, value: i16) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    fn write_u32(&mut self, value: u32) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    fn write_i32(&mut self, value: i32) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    fn write_u64(&mut self, value: u64) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    fn write_i64(&mut self, value: i64) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    fn write_f32(&mut self, value: f32) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    fn write_f64(&mut self, value: f64) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    fn write_cstring(&mut self, value: &str) -> &mut Self {
        self.write_bytes(value.as_bytes()).write_u8(0)
    }

    /// Writes `value` into exactly `len` bytes, truncating or zero padding.
    fn write_fixed_string(&mut self, value: &str, len: usize) -> &mut Self {
        let bytes = value.as_bytes();
        let take = bytes.len().min(len);
        self.write_bytes(&bytes[..take]);
        for _ in take..len {
            self.write_u8(0);
        }
        self
    }

    fn write_packed_guid(&mut self, value: u64) -> &mut Self {
        self.write_bytes(&guid::encode_packed_guid(value))
    }
}

impl PacketWrite for Vec<u8> {
    fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.extend_from_slice(bytes);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_little_endian_integers() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let mut reader = PacketReader::new(&data);
        assert_eq!(reader.read_u8().unwrap(), 0x01);
        assert_eq!(reader.read_u16().unwrap(), 0x0302);
        assert_eq!(reader.read_u32().unwrap(), 0x07060504);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_read_past_end_is_an_error() {
        let data = [0xAA, 0xBB];
        let mut reader = PacketReader::new(&data);
        assert_eq!(
            reader.read_u32(),
            Err(DecodeError::UnexpectedEnd {
                offset: 0,
                wanted: 4,
                len: 2
            })
        );
        // Cursor untouched by the failed read
        assert_eq!(reader.read_u16().unwrap(), 0xBBAA);
    }

    #[test]
    fn test_cstring_consumes_terminator() {
        let data = b"abc\0\x2a";
        let mut reader = PacketReader::new(data);
        assert_eq!(reader.read_cstring().unwrap(), "abc");
        assert_eq!(reader.read_u8().unwrap(), 0x2a);
    }

    #[test]
    fn test_empty_cstring() {
        let data = [0_u8, 7];
        let mut reader = PacketReader::new(&data);
        assert_eq!(reader.read_cstring().unwrap(), "");
        assert_eq!(reader.position(), 1);
    }

    #[test]
    fn test_unterminated_cstring() {
        let mut reader = PacketReader::new(b"abc");
        assert_eq!(
            reader.read_cstring(),
            Err(DecodeError::UnterminatedString(0))
        );
    }

    #[test]
    fn test_fixed_string_pads_and_trims() {
        let mut out = Vec::new();
        out.write_fixed_string("ab", 4);
        assert_eq!(out, b"ab\0\0");

        let mut reader = PacketReader::new(&out);
        assert_eq!(reader.read_fixed_string(4).unwrap(), "ab");
        assert!(reader.is_empty());
    }

    #[test]
    fn test_chained_writes() {
        let mut out = Vec::new();
        out.write_u8(1).write_u16(0x0302).write_cstring("x");
        assert_eq!(out, vec![1, 2, 3, b'x', 0]);
    }
}
