//! Login server ("grunt") packets.
//!
//! These are not framed: each reply starts with a command byte and the reader
//! must know how many bytes follow. The `read` functions here take the body
//! that follows the command and status bytes.

use std::net::Ipv4Addr;

use strum_macros::{Display, FromRepr};

use crate::buffer::{PacketReader, PacketWrite};
use crate::crypto::srp::KEY_LENGTH;
use crate::crypto::PROOF_LENGTH;
use crate::error::DecodeError;
use crate::CLIENT_BUILD;

pub const DEFAULT_AUTH_PORT: u16 = 3724;
pub const DEFAULT_WORLD_PORT: u16 = 8085;

const GAME_NAME: [u8; 4] = *b"WoW\0";
const VERSION: [u8; 3] = [3, 3, 5];
const PLATFORM: [u8; 4] = *b"68x\0";
const OS: [u8; 4] = *b"niW\0";
const LOCALE: [u8; 4] = *b"SUne";
const TIMEZONE_BIAS: u32 = 0x3C;
const CHALLENGE_PROTOCOL_VERSION: u8 = 6;
/// Bytes of the challenge after the size field, excluding the name.
const CHALLENGE_FIXED_SIZE: u16 = 30;
const PROOF_RESERVED: usize = 22;
const REALM_FLAG_SPECIFY_BUILD: u8 = 0x04;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum AuthCommand {
    LogonChallenge = 0x00,
    LogonProof = 0x01,
    RealmList = 0x10,
    TransferInitiate = 0x30,
    TransferData = 0x31,
    TransferAccept = 0x32,
    TransferResume = 0x33,
    TransferCancel = 0x34,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum AuthResult {
    Success = 0x00,
    Failure = 0x01,
    Unknown1 = 0x02,
    AccountBanned = 0x03,
    NoMatch = 0x04,
    Unknown2 = 0x05,
    AccountInUse = 0x06,
    PrepaidTimeLimit = 0x07,
    ServerFull = 0x08,
    WrongBuildNumber = 0x09,
    UpdateClient = 0x0a,
    Unknown3 = 0x0b,
    AccountFreezed = 0x0c,
    Unknown4 = 0x0d,
    Unknown5 = 0x0e,
    ParentalControl = 0x0f,
}

/// CMD_AUTH_LOGON_CHALLENGE sent by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogonChallenge {
    pub username: String,
    pub client_ip: Ipv4Addr,
}

impl LogonChallenge {
    pub fn new(username: &str, client_ip: Ipv4Addr) -> Self {
        Self {
            username: username.to_string(),
            client_ip,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let name = self.username.as_bytes();
        let mut out = Vec::with_capacity(4 + usize::from(CHALLENGE_FIXED_SIZE) + name.len());
        out.write_u8(AuthCommand::LogonChallenge as u8)
            .write_u8(CHALLENGE_PROTOCOL_VERSION)
            .write_u16(CHALLENGE_FIXED_SIZE + name.len() as u16)
            .write_bytes(&GAME_NAME)
            .write_bytes(&VERSION)
            .write_u16(CLIENT_BUILD)
            .write_bytes(&PLATFORM)
            .write_bytes(&OS)
            .write_bytes(&LOCALE)
            .write_u32(TIMEZONE_BIAS)
            .write_bytes(&self.client_ip.octets())
            .write_u8(name.len() as u8)
            .write_bytes(name);
        out
    }

    /// Parses a whole challenge, command byte included.
    pub fn read(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        let command = reader.read_u8()?;
        if command != AuthCommand::LogonChallenge as u8 {
            return Err(DecodeError::InvalidValue {
                what: "auth command",
                value: u64::from(command),
            });
        }
        reader.skip(1 + 2 + 4 + 3)?;
        let build = reader.read_u16()?;
        if build != CLIENT_BUILD {
            return Err(DecodeError::InvalidValue {
                what: "client build",
                value: u64::from(build),
            });
        }
        reader.skip(4 + 4 + 4 + 4)?;
        let client_ip = Ipv4Addr::from(reader.read_array::<4>()?);
        let len = reader.read_u8()?;
        let username = String::from_utf8_lossy(reader.read_bytes(usize::from(len))?).into_owned();
        Ok(Self {
            username,
            client_ip,
        })
    }
}

/// Body of a successful challenge reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    pub server_public_key: [u8; KEY_LENGTH],
    pub generator: Vec<u8>,
    pub large_safe_prime: Vec<u8>,
    pub salt: [u8; KEY_LENGTH],
    pub crc_salt: [u8; 16],
    pub security_flags: u8,
}

impl AuthChallenge {
    pub fn read(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        let server_public_key = reader.read_array()?;
        let generator_len = reader.read_u8()?;
        let generator = reader.read_bytes(usize::from(generator_len))?.to_vec();
        let prime_len = reader.read_u8()?;
        let large_safe_prime = reader.read_bytes(usize::from(prime_len))?.to_vec();
        Ok(Self {
            server_public_key,
            generator,
            large_safe_prime,
            salt: reader.read_array()?,
            crc_salt: reader.read_array()?,
            security_flags: reader.read_u8()?,
        })
    }

    /// Full reply including command, padding and a success status.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.write_u8(AuthCommand::LogonChallenge as u8)
            .write_u8(0)
            .write_u8(AuthResult::Success as u8)
            .write_bytes(&self.server_public_key)
            .write_u8(self.generator.len() as u8)
            .write_bytes(&self.generator)
            .write_u8(self.large_safe_prime.len() as u8)
            .write_bytes(&self.large_safe_prime)
            .write_bytes(&self.salt)
            .write_bytes(&self.crc_salt)
            .write_u8(self.security_flags);
        out
    }
}

/// CMD_AUTH_LOGON_PROOF sent by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogonProof {
    pub client_public_key: [u8; KEY_LENGTH],
    pub client_proof: [u8; PROOF_LENGTH],
}

impl LogonProof {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + KEY_LENGTH + PROOF_LENGTH + PROOF_RESERVED);
        out.write_u8(AuthCommand::LogonProof as u8)
            .write_bytes(&self.client_public_key)
            .write_bytes(&self.client_proof)
            .write_bytes(&[0; PROOF_RESERVED]);
        out
    }

    /// Parses the proof that follows the command byte.
    pub fn read(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        let proof = Self {
            client_public_key: reader.read_array()?,
            client_proof: reader.read_array()?,
        };
        reader.skip(PROOF_RESERVED)?;
        Ok(proof)
    }

    pub const BODY_LENGTH: usize = KEY_LENGTH + PROOF_LENGTH + PROOF_RESERVED;
}

/// Body of a successful proof reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofReply {
    pub server_proof: [u8; PROOF_LENGTH],
    pub account_flags: u32,
    pub survey_id: u32,
    pub login_flags: u16,
}

impl ProofReply {
    pub const BODY_LENGTH: usize = PROOF_LENGTH + 4 + 4 + 2;

    pub fn read(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            server_proof: reader.read_array()?,
            account_flags: reader.read_u32()?,
            survey_id: reader.read_u32()?,
            login_flags: reader.read_u16()?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + Self::BODY_LENGTH);
        out.write_u8(AuthCommand::LogonProof as u8)
            .write_u8(AuthResult::Success as u8)
            .write_bytes(&self.server_proof)
            .write_u32(self.account_flags)
            .write_u32(self.survey_id)
            .write_u16(self.login_flags);
        out
    }
}

/// CMD_REALM_LIST request: the command and four unused bytes.
pub fn realm_list_request() -> Vec<u8> {
    vec![AuthCommand::RealmList as u8, 0, 0, 0, 0]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealmVersion {
    pub major: u8,
    pub minor: u8,
    pub bugfix: u8,
    pub build: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Realm {
    pub realm_type: u8,
    pub locked: u8,
    pub flags: u8,
    pub name: String,
    pub address: String,
    pub port: u16,
    pub population: f32,
    pub load: u8,
    pub timezone: u8,
    pub id: u8,
    pub version: Option<RealmVersion>,
}

impl Realm {
    pub fn read(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        let realm_type = reader.read_u8()?;
        let locked = reader.read_u8()?;
        let flags = reader.read_u8()?;
        let name = reader.read_cstring()?;
        let (address, port) = split_address(&reader.read_cstring()?)?;
        let population = reader.read_f32()?;
        let load = reader.read_u8()?;
        let timezone = reader.read_u8()?;
        let id = reader.read_u8()?;
        let version = if flags & REALM_FLAG_SPECIFY_BUILD != 0 {
            Some(RealmVersion {
                major: reader.read_u8()?,
                minor: reader.read_u8()?,
                bugfix: reader.read_u8()?,
                build: reader.read_u8()?,
            })
        } else {
            None
        };

        Ok(Self {
            realm_type,
            locked,
            flags,
            name,
            address,
            port,
            population,
            load,
            timezone,
            id,
            version,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        let flags = match self.version {
            Some(_) => self.flags | REALM_FLAG_SPECIFY_BUILD,
            None => self.flags & !REALM_FLAG_SPECIFY_BUILD,
        };
        out.write_u8(self.realm_type)
            .write_u8(self.locked)
            .write_u8(flags)
            .write_cstring(&self.name)
            .write_cstring(&format!("{}:{}", self.address, self.port))
            .write_f32(self.population)
            .write_u8(self.load)
            .write_u8(self.timezone)
            .write_u8(self.id);
        if let Some(version) = self.version {
            out.write_u8(version.major)
                .write_u8(version.minor)
                .write_u8(version.bugfix)
                .write_u8(version.build);
        }
    }
}

fn split_address(address: &str) -> Result<(String, u16), DecodeError> {
    match address.rsplit_once(':') {
        None => Ok((address.to_string(), DEFAULT_WORLD_PORT)),
        Some((host, port)) => {
            let port = port.parse().map_err(|_| DecodeError::InvalidValue {
                what: "realm port",
                value: 0,
            })?;
            Ok((host.to_string(), port))
        }
    }
}

/// Parses the realm list body that follows the command byte and u16 size.
pub fn read_realm_list(reader: &mut PacketReader<'_>) -> Result<Vec<Realm>, DecodeError> {
    reader.skip(4)?;
    let count = reader.read_u16()?;
    (0..count).map(|_| Realm::read(reader)).collect()
}

/// Full realm list reply as a server sends it.
pub fn write_realm_list(realms: &[Realm]) -> Vec<u8> {
    let mut body = Vec::new();
    body.write_u32(0).write_u16(realms.len() as u16);
    for realm in realms {
        realm.write(&mut body);
    }
    body.write_u8(0x10).write_u8(0);

    let mut out = Vec::with_capacity(3 + body.len());
    out.write_u8(AuthCommand::RealmList as u8)
        .write_u16(body.len() as u16)
        .write_bytes(&body);
    out
}
