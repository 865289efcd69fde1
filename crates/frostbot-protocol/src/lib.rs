//! Wire-level building blocks for the 3.3.5a (build 12340) client protocol.
//!
//! Everything in here is free of sockets and sessions except the async frame
//! helpers in [`framing`], which are generic over tokio's I/O traits.

pub mod buffer;
pub mod codec;
pub mod crypto;
pub mod error;
pub mod framing;
pub mod packets;

pub use buffer::{PacketReader, PacketWrite};
pub use error::{CodecError, DecodeError, FrameError, SrpError};
pub use packets::WorldPacket;

/// Client build number sent in every login packet.
pub const CLIENT_BUILD: u16 = 12340;
