//! The three packets that authenticate a world connection.

use strum_macros::{Display, FromRepr};

use super::opcodes::{CMSG_AUTH_SESSION, SMSG_AUTH_CHALLENGE, SMSG_AUTH_RESPONSE};
use super::WorldPacket;
use crate::buffer::{PacketReader, PacketWrite};
use crate::crypto::{sha1_digest, SessionKey, PROOF_LENGTH};
use crate::error::DecodeError;
use crate::CLIENT_BUILD;

/// `SMSG_AUTH_RESPONSE` detail codes. Only [`CommandDetail::AuthOk`] lets the
/// session continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum CommandDetail {
    AuthOk = 12,
    AuthFailed = 13,
    AuthReject = 14,
    AuthBadServerProof = 15,
    AuthUnavailable = 16,
    AuthSystemError = 17,
    AuthBillingError = 18,
    AuthBillingExpired = 19,
    AuthVersionMismatch = 20,
    AuthUnknownAccount = 21,
    AuthIncorrectPassword = 22,
    AuthSessionExpired = 23,
    AuthServerShuttingDown = 24,
    AuthAlreadyLoggingIn = 25,
    AuthLoginServerNotFound = 26,
    AuthWaitQueue = 27,
    AuthBanned = 28,
    AuthAlreadyOnline = 29,
    AuthNoTime = 30,
    AuthDbBusy = 31,
    AuthSuspended = 32,
    AuthParentalControl = 33,
    AuthLockedEnforced = 34,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldAuthChallenge {
    pub unknown: u32,
    pub server_seed: u32,
    pub seed1: [u8; 16],
    pub seed2: [u8; 16],
}

impl WorldAuthChallenge {
    pub fn read(packet: &WorldPacket) -> Result<Self, DecodeError> {
        let mut reader = packet.reader();
        Ok(Self {
            unknown: reader.read_u32()?,
            server_seed: reader.read_u32()?,
            seed1: reader.read_array()?,
            seed2: reader.read_array()?,
        })
    }

    pub fn to_packet(&self) -> WorldPacket {
        let mut packet = WorldPacket::new(SMSG_AUTH_CHALLENGE);
        packet
            .payload_mut()
            .write_u32(self.unknown)
            .write_u32(self.server_seed)
            .write_bytes(&self.seed1)
            .write_bytes(&self.seed2);
        packet
    }
}

/// `CMSG_AUTH_SESSION`, the client's answer to [`WorldAuthChallenge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub build: u32,
    pub username: String,
    pub client_seed: u32,
    pub realm_id: u32,
    pub digest: [u8; PROOF_LENGTH],
}

impl AuthSession {
    pub fn new(
        username: &str,
        client_seed: u32,
        server_seed: u32,
        realm_id: u32,
        session_key: &SessionKey,
    ) -> Self {
        Self {
            build: u32::from(CLIENT_BUILD),
            username: username.to_string(),
            client_seed,
            realm_id,
            digest: session_digest(username, client_seed, server_seed, session_key),
        }
    }

    pub fn to_packet(&self) -> WorldPacket {
        let mut packet = WorldPacket::new(CMSG_AUTH_SESSION);
        packet
            .payload_mut()
            .write_u32(self.build)
            .write_u32(0)
            .write_cstring(&self.username)
            .write_u32(0)
            .write_u32(self.client_seed)
            .write_u32(0)
            .write_u32(0)
            .write_u32(self.realm_id)
            .write_u64(0)
            .write_bytes(&self.digest)
            .write_u32(0);
        packet
    }

    pub fn read(packet: &WorldPacket) -> Result<Self, DecodeError> {
        let mut reader = packet.reader();
        let build = reader.read_u32()?;
        reader.skip(4)?;
        let username = reader.read_cstring()?;
        reader.skip(4)?;
        let client_seed = reader.read_u32()?;
        reader.skip(8)?;
        let realm_id = reader.read_u32()?;
        reader.skip(8)?;
        let digest = reader.read_array()?;
        Ok(Self {
            build,
            username,
            client_seed,
            realm_id,
            digest,
        })
    }

    /// True if the digest was made with `session_key` and `server_seed`.
    pub fn verify(&self, server_seed: u32, session_key: &SessionKey) -> bool {
        self.digest == session_digest(&self.username, self.client_seed, server_seed, session_key)
    }
}

/// `H(USER, 0u32, client seed, server seed, K)`
pub fn session_digest(
    username: &str,
    client_seed: u32,
    server_seed: u32,
    session_key: &SessionKey,
) -> [u8; PROOF_LENGTH] {
    sha1_digest(&[
        username.as_bytes(),
        &0_u32.to_le_bytes(),
        &client_seed.to_le_bytes(),
        &server_seed.to_le_bytes(),
        session_key,
    ])
}

/// Trailing fields present when the detail is [`CommandDetail::AuthOk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthOkInfo {
    pub billing_time: u32,
    pub billing_flags: u8,
    pub billing_rested: u32,
    pub expansion: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthResponse {
    /// Raw detail byte. Unknown values are kept so callers can report them.
    pub detail: u8,
    pub info: Option<AuthOkInfo>,
}

impl AuthResponse {
    pub fn ok(expansion: u8) -> Self {
        Self {
            detail: CommandDetail::AuthOk as u8,
            info: Some(AuthOkInfo {
                billing_time: 0,
                billing_flags: 0,
                billing_rested: 0,
                expansion,
            }),
        }
    }

    pub fn rejected(detail: CommandDetail) -> Self {
        Self {
            detail: detail as u8,
            info: None,
        }
    }

    pub fn command_detail(&self) -> Option<CommandDetail> {
        CommandDetail::from_repr(self.detail)
    }

    pub fn is_ok(&self) -> bool {
        self.detail == CommandDetail::AuthOk as u8
    }

    pub fn read(packet: &WorldPacket) -> Result<Self, DecodeError> {
        let mut reader = packet.reader();
        let detail = reader.read_u8()?;
        let info = if detail == CommandDetail::AuthOk as u8 {
            Some(read_ok_info(&mut reader)?)
        } else {
            None
        };
        Ok(Self { detail, info })
    }

    pub fn to_packet(&self) -> WorldPacket {
        let mut packet = WorldPacket::new(SMSG_AUTH_RESPONSE);
        let body = packet.payload_mut();
        body.write_u8(self.detail);
        if let Some(info) = self.info {
            body.write_u32(info.billing_time)
                .write_u8(info.billing_flags)
                .write_u32(info.billing_rested)
                .write_u8(info.expansion);
        }
        packet
    }
}

fn read_ok_info(reader: &mut PacketReader<'_>) -> Result<AuthOkInfo, DecodeError> {
    Ok(AuthOkInfo {
        billing_time: reader.read_u32()?,
        billing_flags: reader.read_u8()?,
        billing_rested: reader.read_u32()?,
        expansion: reader.read_u8()?,
    })
}
