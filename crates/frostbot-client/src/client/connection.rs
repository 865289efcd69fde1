use std::net::{Ipv4Addr, SocketAddr};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;
use tracing::debug;

use frostbot_protocol::packets::auth::{
    AuthChallenge, AuthCommand, AuthResult, ProofReply, Realm, read_realm_list,
};
use frostbot_protocol::PacketReader;

use crate::error::AuthError;

/// Appends `default_port` unless `address` already ends in `:port`.
pub fn with_default_port(address: &str, default_port: u16) -> String {
    match address.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => address.to_string(),
        _ => format!("{}:{}", address, default_port),
    }
}

/// Connects to `address`, preferring an IPv4 result when the name resolves
/// to several.
pub async fn connect(address: &str) -> Result<TcpStream, AuthError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(address).await?.collect();
    let addr = addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Could not resolve address: {}", address),
            )
        })?;
    debug!(target: "net", "Connecting to {} ({})", address, addr);
    Ok(TcpStream::connect(addr).await?)
}

/// Local IPv4 address of `stream`, reported in the logon challenge.
pub fn local_ipv4(stream: &TcpStream) -> Ipv4Addr {
    match stream.local_addr() {
        Ok(SocketAddr::V4(addr)) => *addr.ip(),
        _ => Ipv4Addr::UNSPECIFIED,
    }
}

async fn expect_command<R>(reader: &mut R, expected: AuthCommand) -> Result<(), AuthError>
where
    R: AsyncRead + Unpin,
{
    let actual = reader.read_u8().await?;
    if actual != expected as u8 {
        return Err(AuthError::UnexpectedCommand {
            expected: expected as u8,
            actual,
        });
    }
    Ok(())
}

fn check_result(step: &'static str, result: u8) -> Result<(), AuthError> {
    if result == AuthResult::Success as u8 {
        return Ok(());
    }
    let reason = match AuthResult::from_repr(result) {
        Some(known) => known.to_string(),
        None => format!("unknown result {:#04x}", result),
    };
    Err(AuthError::LogonRejected { step, reason })
}

/// Reads the logon challenge reply. Its length depends on the generator and
/// prime sizes, so the body is collected in pieces before parsing.
pub async fn read_challenge_reply<R>(reader: &mut R) -> Result<AuthChallenge, AuthError>
where
    R: AsyncRead + Unpin,
{
    expect_command(reader, AuthCommand::LogonChallenge).await?;
    let _protocol = reader.read_u8().await?;
    check_result("logon challenge", reader.read_u8().await?)?;

    let mut body = Vec::with_capacity(128);
    read_appending(reader, &mut body, 32 + 1).await?;
    let generator_len = usize::from(body[body.len() - 1]);
    read_appending(reader, &mut body, generator_len + 1).await?;
    let prime_len = usize::from(body[body.len() - 1]);
    read_appending(reader, &mut body, prime_len + 32 + 16 + 1).await?;

    Ok(AuthChallenge::read(&mut PacketReader::new(&body))?)
}

pub async fn read_proof_reply<R>(reader: &mut R) -> Result<ProofReply, AuthError>
where
    R: AsyncRead + Unpin,
{
    expect_command(reader, AuthCommand::LogonProof).await?;
    check_result("logon proof", reader.read_u8().await?)?;

    let mut body = [0_u8; ProofReply::BODY_LENGTH];
    reader.read_exact(&mut body).await?;
    Ok(ProofReply::read(&mut PacketReader::new(&body))?)
}

pub async fn read_realm_list_reply<R>(reader: &mut R) -> Result<Vec<Realm>, AuthError>
where
    R: AsyncRead + Unpin,
{
    expect_command(reader, AuthCommand::RealmList).await?;
    let size = reader.read_u16_le().await?;
    let mut body = vec![0_u8; usize::from(size)];
    reader.read_exact(&mut body).await?;
    Ok(read_realm_list(&mut PacketReader::new(&body))?)
}

async fn read_appending<R>(reader: &mut R, buf: &mut Vec<u8>, len: usize) -> Result<(), AuthError>
where
    R: AsyncRead + Unpin,
{
    let start = buf.len();
    buf.resize(start + len, 0);
    reader.read_exact(&mut buf[start..]).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use frostbot_protocol::packets::auth::{write_realm_list, RealmVersion};

    #[test]
    fn test_with_default_port() {
        assert_eq!(with_default_port("logon.example", 3724), "logon.example:3724");
        assert_eq!(with_default_port("127.0.0.1:4000", 3724), "127.0.0.1:4000");
        assert_eq!(with_default_port("host:notaport", 3724), "host:notaport:3724");
    }

    #[tokio::test]
    async fn test_read_challenge_reply() {
        let challenge = AuthChallenge {
            server_public_key: [3; 32],
            generator: vec![7],
            large_safe_prime: vec![0xB7; 32],
            salt: [9; 32],
            crc_salt: [1; 16],
            security_flags: 0,
        };
        let bytes = challenge.to_bytes();
        let parsed = read_challenge_reply(&mut bytes.as_slice()).await.unwrap();
        assert_eq!(parsed, challenge);
    }

    #[tokio::test]
    async fn test_rejected_challenge() {
        let bytes = [0x00, 0x00, AuthResult::AccountBanned as u8];
        let err = read_challenge_reply(&mut bytes.as_slice()).await.unwrap_err();
        match err {
            AuthError::LogonRejected { step, reason } => {
                assert_eq!(step, "logon challenge");
                assert_eq!(reason, "ACCOUNT_BANNED");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unexpected_command() {
        let bytes = [0x10, 0x00, 0x00];
        let err = read_proof_reply(&mut bytes.as_slice()).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::UnexpectedCommand {
                expected: 0x01,
                actual: 0x10
            }
        ));
    }

    #[tokio::test]
    async fn test_read_realm_list_reply() {
        let realms = vec![Realm {
            realm_type: 1,
            locked: 0,
            flags: 0,
            name: "Frostmourne".to_string(),
            address: "127.0.0.1".to_string(),
            port: 8085,
            population: 1.0,
            load: 0,
            timezone: 1,
            id: 1,
            version: Some(RealmVersion {
                major: 3,
                minor: 3,
                bugfix: 5,
                build: 0,
            }),
        }];
        let bytes = write_realm_list(&realms);
        let parsed = read_realm_list_reply(&mut bytes.as_slice()).await.unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "Frostmourne");
        assert_eq!(parsed[0].version, realms[0].version);
    }
}
