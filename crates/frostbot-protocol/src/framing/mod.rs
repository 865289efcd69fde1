//! World packet headers, packed GUIDs and the async frame reader/writer.

pub mod guid;
pub mod header;
mod stream;

pub use guid::{encode_packed_guid, read_packed_guid};
pub use header::{
    ClientHeader, ServerHeader, CLIENT_HEADER_LENGTH, LARGE_SERVER_HEADER_LENGTH,
    SERVER_HEADER_LENGTH,
};
pub use stream::{read_client_packet, read_server_packet, write_client_packet, write_server_packet};
