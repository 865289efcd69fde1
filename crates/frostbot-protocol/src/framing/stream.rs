use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use super::header::{ClientHeader, ServerHeader, CLIENT_HEADER_LENGTH, LARGE_SERVER_HEADER_LENGTH};
use crate::crypto::StreamCipher;
use crate::error::FrameError;
use crate::packets::WorldPacket;

async fn read_header_bytes<R>(
    reader: &mut R,
    cipher: Option<&mut StreamCipher>,
    buf: &mut [u8],
) -> Result<(), FrameError>
where
    R: AsyncRead + Unpin,
{
    reader.read_exact(buf).await?;
    if let Some(cipher) = cipher {
        cipher.apply(buf);
    }
    Ok(())
}

/// Reads one server frame, decrypting the header bytes as they arrive.
///
/// The first byte decides whether the size takes two or three bytes, so the
/// decrypter is advanced one field at a time rather than over a fixed block.
pub async fn read_server_packet<R>(
    reader: &mut R,
    mut decrypter: Option<&mut StreamCipher>,
) -> Result<WorldPacket, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0_u8; LARGE_SERVER_HEADER_LENGTH];
    read_header_bytes(reader, decrypter.as_deref_mut(), &mut header[..1]).await?;
    let len = ServerHeader::length_from_first_byte(header[0]);
    read_header_bytes(reader, decrypter.as_deref_mut(), &mut header[1..len - 2]).await?;
    read_header_bytes(reader, decrypter.as_deref_mut(), &mut header[len - 2..len]).await?;

    let header = ServerHeader::decode(&header[..len])?;
    let mut payload = vec![0_u8; header.payload_len()?];
    reader.read_exact(&mut payload).await?;

    trace!(target: "net", "<- opcode {:#06x} ({} bytes)", header.opcode, payload.len());
    Ok(WorldPacket::with_payload(u32::from(header.opcode), payload))
}

/// Writes one client frame. Only the six header bytes go through the encrypter.
pub async fn write_client_packet<W>(
    writer: &mut W,
    packet: &WorldPacket,
    encrypter: Option<&mut StreamCipher>,
) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let mut header = ClientHeader::for_payload(packet.opcode(), packet.len())?.encode();
    if let Some(encrypter) = encrypter {
        encrypter.apply(&mut header);
    }

    let mut frame = Vec::with_capacity(CLIENT_HEADER_LENGTH + packet.len());
    frame.extend_from_slice(&header);
    frame.extend_from_slice(packet.payload());
    writer.write_all(&frame).await?;
    writer.flush().await?;

    trace!(target: "net", "-> opcode {:#06x} ({} bytes)", packet.opcode(), packet.len());
    Ok(())
}

/// Server side counterpart of [`read_server_packet`].
pub async fn read_client_packet<R>(
    reader: &mut R,
    decrypter: Option<&mut StreamCipher>,
) -> Result<WorldPacket, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0_u8; CLIENT_HEADER_LENGTH];
    read_header_bytes(reader, decrypter, &mut header).await?;
    let header = ClientHeader::decode(&header);

    let mut payload = vec![0_u8; header.payload_len()?];
    reader.read_exact(&mut payload).await?;
    Ok(WorldPacket::with_payload(header.opcode, payload))
}

/// Server side counterpart of [`write_client_packet`].
pub async fn write_server_packet<W>(
    writer: &mut W,
    packet: &WorldPacket,
    encrypter: Option<&mut StreamCipher>,
) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let mut header = ServerHeader::for_payload(packet.opcode(), packet.len())?.encode();
    if let Some(encrypter) = encrypter {
        encrypter.apply(&mut header);
    }

    let mut frame = header;
    frame.extend_from_slice(packet.payload());
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{ClientCrypto, ServerCrypto};
    use crate::packets::opcodes;

    const SESSION_KEY: [u8; 40] = [7; 40];

    #[tokio::test]
    async fn test_plain_server_frame_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let packet = WorldPacket::with_payload(opcodes::SMSG_AUTH_CHALLENGE, vec![1, 2, 3]);

        write_server_packet(&mut server, &packet, None).await.unwrap();
        let read = read_server_packet(&mut client, None).await.unwrap();
        assert_eq!(read, packet);
    }

    #[tokio::test]
    async fn test_encrypted_frames_in_both_directions() {
        let (mut client_io, mut server_io) = tokio::io::duplex(1 << 20);
        let (mut client_enc, mut client_dec) = ClientCrypto::new(&SESSION_KEY).split();
        let (mut server_enc, mut server_dec) = ServerCrypto::new(&SESSION_KEY).split();

        let small = WorldPacket::with_payload(opcodes::SMSG_AUTH_RESPONSE, vec![12, 0, 0, 0, 0]);
        let large = WorldPacket::with_payload(opcodes::SMSG_UPDATE_OBJECT, vec![0xAB; 0x9000]);
        for packet in [&small, &large, &small] {
            write_server_packet(&mut server_io, packet, Some(&mut server_enc))
                .await
                .unwrap();
            let read = read_server_packet(&mut client_io, Some(&mut client_dec))
                .await
                .unwrap();
            assert_eq!(&read, packet);
        }

        let request = WorldPacket::new(opcodes::CMSG_CHAR_ENUM);
        write_client_packet(&mut client_io, &request, Some(&mut client_enc))
            .await
            .unwrap();
        let read = read_client_packet(&mut server_io, Some(&mut server_dec))
            .await
            .unwrap();
        assert_eq!(read, request);
    }

    #[tokio::test]
    async fn test_payload_is_not_encrypted() {
        let (mut client_io, mut server_io) = tokio::io::duplex(1024);
        let (mut client_enc, _) = ClientCrypto::new(&SESSION_KEY).split();

        let packet = WorldPacket::with_payload(opcodes::CMSG_PLAYER_LOGIN, vec![9, 8, 7, 6]);
        write_client_packet(&mut client_io, &packet, Some(&mut client_enc))
            .await
            .unwrap();
        drop(client_io);

        let mut raw = Vec::new();
        server_io.read_to_end(&mut raw).await.unwrap();
        assert_eq!(raw.len(), CLIENT_HEADER_LENGTH + 4);
        assert_eq!(&raw[CLIENT_HEADER_LENGTH..], &[9, 8, 7, 6]);
    }

    #[tokio::test]
    async fn test_truncated_frame_is_an_io_error() {
        let (mut client, mut server) = tokio::io::duplex(64);
        server.write_all(&[0x00, 0x08, 0xEE, 0x01, 1, 2]).await.unwrap();
        drop(server);

        let result = read_server_packet(&mut client, None).await;
        assert!(matches!(result, Err(FrameError::Io(_))));
    }
}
