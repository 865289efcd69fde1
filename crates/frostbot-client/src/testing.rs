//! A scripted login and world server that serves exactly one client.
//!
//! The peer runs the server half of SRP itself, so a client that reaches
//! `Streaming` against it has derived the same session key independently.

use std::net::SocketAddr;

use anyhow::{bail, Context};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::debug;

use frostbot_protocol::codec::definitions::{self, SMSG_CHAR_ENUM};
use frostbot_protocol::codec::{Record, Value};
use frostbot_protocol::crypto::srp::{
    calculate_client_proof, calculate_server_proof, interleave_session_key, K_VALUE, KEY_LENGTH,
};
use frostbot_protocol::crypto::{sha1_digest, BigNumber, ServerCrypto, SessionKey, SrpClient};
use frostbot_protocol::framing::{read_client_packet, write_server_packet};
use frostbot_protocol::packets::auth::{
    write_realm_list, AuthChallenge, AuthCommand, AuthResult, LogonChallenge, LogonProof,
    ProofReply, Realm,
};
use frostbot_protocol::packets::opcodes;
use frostbot_protocol::packets::world_auth::{
    AuthResponse, AuthSession, CommandDetail, WorldAuthChallenge,
};
use frostbot_protocol::{CodecError, PacketReader, WorldPacket};

pub const GENERATOR: u8 = 7;

/// The 256-bit prime used by 3.3.5 login servers, little-endian.
pub fn large_safe_prime() -> [u8; KEY_LENGTH] {
    let mut prime = [0_u8; KEY_LENGTH];
    let be = BigNumber::from_bytes_be(&[
        0x89, 0x4B, 0x64, 0x5E, 0x89, 0xE1, 0x53, 0x5B, 0xBD, 0xAD, 0x5B, 0x8B, 0x29, 0x06, 0x50,
        0x53, 0x08, 0x01, 0xB1, 0x8E, 0xBF, 0xBF, 0x5E, 0x8F, 0xAB, 0x3C, 0x82, 0x87, 0x2A, 0x3E,
        0x9B, 0xB7,
    ]);
    let le = be.to_bytes_le();
    prime[..le.len()].copy_from_slice(&le);
    prime
}

/// What the peer expects and how it answers.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    pub username: String,
    pub password: String,
    pub salt: [u8; KEY_LENGTH],
    /// The server's SRP private exponent `b`
    pub server_private_key: BigNumber,
    pub server_seed: u32,
    pub realm_name: String,
    /// Result sent in the challenge reply
    pub logon_result: AuthResult,
    /// Detail sent in SMSG_AUTH_RESPONSE when the session digest checks out
    pub world_detail: CommandDetail,
    pub characters: Vec<(u64, String)>,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            username: "FROST".to_string(),
            password: "BITE".to_string(),
            salt: [0x5A; KEY_LENGTH],
            server_private_key: BigNumber::from_bytes_le(&[0x3C; 19]),
            server_seed: 0xDEAD_BEEF,
            realm_name: "Scripted".to_string(),
            logon_result: AuthResult::Success,
            world_detail: CommandDetail::AuthOk,
            characters: vec![(0x0100_0001, "Frostbite".to_string())],
        }
    }
}

impl PeerConfig {
    /// The verifier `v = g^x mod N` stored for the account.
    pub fn verifier(&self) -> BigNumber {
        let client = SrpClient::new(&self.username, &self.password);
        let n = BigNumber::from_bytes_le(&large_safe_prime());
        BigNumber::from(u32::from(GENERATOR)).modpow(&client.calculate_x(&self.salt), &n)
    }

    /// `B = k * v + g^b mod N`, as sent in the challenge reply.
    pub fn server_public_key(&self) -> BigNumber {
        let n = BigNumber::from_bytes_le(&large_safe_prime());
        let g = BigNumber::from(u32::from(GENERATOR));
        (BigNumber::from(K_VALUE) * self.verifier() + g.modpow(&self.server_private_key, &n)) % n
    }
}

/// What the peer saw, available once the client disconnects.
#[derive(Debug, Clone, Default)]
pub struct PeerReport {
    /// Key derived by the server half of SRP; `None` if login never got that far
    pub session_key: Option<SessionKey>,
    pub digest_verified: bool,
    /// Encrypted packets received after world authentication, in order
    pub received: Vec<WorldPacket>,
}

impl PeerReport {
    pub fn received_opcodes(&self) -> Vec<u32> {
        self.received.iter().map(WorldPacket::opcode).collect()
    }
}

pub struct ScriptedPeer {
    auth_addr: SocketAddr,
    task: JoinHandle<anyhow::Result<PeerReport>>,
}

impl ScriptedPeer {
    pub async fn spawn(config: PeerConfig) -> std::io::Result<Self> {
        let auth = TcpListener::bind("127.0.0.1:0").await?;
        let world = TcpListener::bind("127.0.0.1:0").await?;
        let auth_addr = auth.local_addr()?;
        let world_port = world.local_addr()?.port();

        let task = tokio::spawn(async move {
            let mut report = PeerReport::default();
            let (stream, _) = auth.accept().await?;
            report.session_key = serve_auth(stream, &config, world_port).await?;
            let Some(session_key) = report.session_key else {
                return Ok(report);
            };

            let (stream, _) = world.accept().await?;
            serve_world(stream, &config, &session_key, &mut report).await?;
            Ok(report)
        });

        Ok(Self { auth_addr, task })
    }

    /// `host:port` of the login server.
    pub fn auth_address(&self) -> String {
        self.auth_addr.to_string()
    }

    /// Waits for the client to disconnect and returns what the peer saw.
    pub async fn finish(self) -> anyhow::Result<PeerReport> {
        self.task.await.context("peer task panicked")?
    }
}

async fn serve_auth(
    mut stream: TcpStream,
    config: &PeerConfig,
    world_port: u16,
) -> anyhow::Result<Option<SessionKey>> {
    let mut head = [0_u8; 4];
    stream.read_exact(&mut head).await?;
    let mut packet = head.to_vec();
    packet.resize(4 + usize::from(u16::from_le_bytes([head[2], head[3]])), 0);
    stream.read_exact(&mut packet[4..]).await?;
    let challenge = LogonChallenge::read(&mut PacketReader::new(&packet))?;
    debug!(target: "peer", "Logon challenge from {}", challenge.username);

    if config.logon_result != AuthResult::Success {
        stream
            .write_all(&[AuthCommand::LogonChallenge as u8, 0, config.logon_result as u8])
            .await?;
        return Ok(None);
    }

    let client = SrpClient::new(&config.username, &config.password);
    let n = BigNumber::from_bytes_le(&large_safe_prime());
    let g = BigNumber::from(u32::from(GENERATOR));
    let v = config.verifier();
    let b = &config.server_private_key;
    let b_pub = config.server_public_key();

    let reply = AuthChallenge {
        server_public_key: b_pub.to_padded_le::<KEY_LENGTH>()?,
        generator: vec![GENERATOR],
        large_safe_prime: large_safe_prime().to_vec(),
        salt: config.salt,
        crc_salt: [0; 16],
        security_flags: 0,
    };
    stream.write_all(&reply.to_bytes()).await?;

    let command = stream.read_u8().await?;
    if command != AuthCommand::LogonProof as u8 {
        bail!("expected logon proof, got command {:#04x}", command);
    }
    let mut body = [0_u8; LogonProof::BODY_LENGTH];
    stream.read_exact(&mut body).await?;
    let proof = LogonProof::read(&mut PacketReader::new(&body))?;

    // S = (A * v^u)^b mod N
    let a_pub = BigNumber::from_bytes_le(&proof.client_public_key);
    let u = BigNumber::from_bytes_le(&sha1_digest(&[&a_pub.to_bytes_le(), &b_pub.to_bytes_le()]));
    let s = ((a_pub.clone() * v.modpow(&u, &n)) % n.clone()).modpow(b, &n);
    let session_key = interleave_session_key(&s.to_padded_le::<KEY_LENGTH>()?);

    let expected = calculate_client_proof(
        client.username(),
        &n,
        &g,
        &config.salt,
        &a_pub,
        &b_pub,
        &session_key,
    );
    if expected != proof.client_proof {
        stream
            .write_all(&[AuthCommand::LogonProof as u8, AuthResult::NoMatch as u8])
            .await?;
        return Ok(None);
    }

    let reply = ProofReply {
        server_proof: calculate_server_proof(&a_pub, &proof.client_proof, &session_key),
        account_flags: 0x0080_0000,
        survey_id: 0,
        login_flags: 0,
    };
    stream.write_all(&reply.to_bytes()).await?;

    let mut request = [0_u8; 5];
    stream.read_exact(&mut request).await?;
    if request[0] != AuthCommand::RealmList as u8 {
        bail!("expected realm list request, got command {:#04x}", request[0]);
    }
    let realm = Realm {
        realm_type: 0,
        locked: 0,
        flags: 0,
        name: config.realm_name.clone(),
        address: "127.0.0.1".to_string(),
        port: world_port,
        population: 0.5,
        load: 0,
        timezone: 1,
        id: 1,
        version: None,
    };
    stream.write_all(&write_realm_list(&[realm])).await?;
    Ok(Some(session_key))
}

async fn serve_world(
    mut stream: TcpStream,
    config: &PeerConfig,
    session_key: &SessionKey,
    report: &mut PeerReport,
) -> anyhow::Result<()> {
    let challenge = WorldAuthChallenge {
        unknown: 1,
        server_seed: config.server_seed,
        seed1: [0x11; 16],
        seed2: [0x22; 16],
    };
    write_server_packet(&mut stream, &challenge.to_packet(), None).await?;

    let packet = read_client_packet(&mut stream, None).await?;
    if packet.opcode() != opcodes::CMSG_AUTH_SESSION {
        bail!("expected CMSG_AUTH_SESSION, got {:#06x}", packet.opcode());
    }
    let session = AuthSession::read(&packet)?;
    report.digest_verified = session.verify(config.server_seed, session_key);

    let mut crypto = ServerCrypto::new(session_key);
    let response = if !report.digest_verified {
        AuthResponse::rejected(CommandDetail::AuthReject)
    } else if config.world_detail != CommandDetail::AuthOk {
        AuthResponse::rejected(config.world_detail)
    } else {
        AuthResponse::ok(2)
    };
    write_server_packet(&mut stream, &response.to_packet(), Some(crypto.encrypter())).await?;
    if !response.is_ok() {
        return Ok(());
    }

    // Runs until the client hangs up
    while let Ok(packet) = read_client_packet(&mut stream, Some(crypto.decrypter())).await {
        debug!(target: "peer", "Received {:#06x} ({} bytes)", packet.opcode(), packet.len());
        if packet.opcode() == opcodes::CMSG_CHAR_ENUM {
            let characters: Vec<(u64, &str)> = config
                .characters
                .iter()
                .map(|(guid, name)| (*guid, name.as_str()))
                .collect();
            let reply = char_enum_packet(&characters)?;
            write_server_packet(&mut stream, &reply, Some(crypto.encrypter())).await?;
        }
        report.received.push(packet);
    }
    Ok(())
}

/// SMSG_CHAR_ENUM listing `characters` as level 1 humans with empty gear.
pub fn char_enum_packet(characters: &[(u64, &str)]) -> Result<WorldPacket, CodecError> {
    let entries: Vec<Value> = characters
        .iter()
        .map(|(guid, name)| char_enum_entry(*guid, name))
        .collect();
    definitions::builtin().encode_packet(SMSG_CHAR_ENUM, &Record::new().with("characters", entries))
}

fn char_enum_entry(guid: u64, name: &str) -> Value {
    let empty_slot = |_| -> Value {
        Record::new()
            .with("display_id", 0_u32)
            .with("inventory_type", 0_u8)
            .with("enchant", 0_u32)
            .into()
    };
    Record::new()
        .with("guid", guid)
        .with("name", name)
        .with("race", 1_u8)
        .with("class", 1_u8)
        .with("gender", 0_u8)
        .with("appearance", vec![Value::from(0_u8); 5])
        .with("level", 1_u8)
        .with("zone", 12_u32)
        .with("map", 0_u32)
        .with("x", -8949.95_f32)
        .with("y", -132.49_f32)
        .with("z", 83.53_f32)
        .with("guild", 0_u32)
        .with("flags", 0_u32)
        .with("customize", 0_u32)
        .with("first_login", 0_u8)
        .with("pet_display", 0_u32)
        .with("pet_level", 0_u32)
        .with("pet_family", 0_u32)
        .with(
            "items",
            (0..definitions::EQUIPMENT_SLOTS)
                .map(empty_slot)
                .collect::<Vec<_>>(),
        )
        .with(
            "bags",
            (0..definitions::BAG_SLOTS).map(empty_slot).collect::<Vec<_>>(),
        )
        .into()
}
