//! Client half of the SRP6 variant used by the 3.3.5 login server.
//!
//! All numbers travel little-endian. Wherever a number is hashed it is hashed
//! in its minimal byte form, except the salt and the session key proof input
//! which are hashed as raw bytes.

use super::bigint::BigNumber;
use super::{sha1_digest, SessionKey, PROOF_LENGTH, SESSION_KEY_LENGTH};
use crate::error::SrpError;

/// Multiplier `k` in `B = kv + g^b`.
pub const K_VALUE: u32 = 3;
/// Width of the random private exponent `a`.
pub const PRIVATE_KEY_LENGTH: usize = 19;
/// Width of public keys and the salt on the wire.
pub const KEY_LENGTH: usize = 32;

/// Account credentials, uppercased the way the server stores them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrpClient {
    username: String,
    password: String,
}

/// Everything produced by answering a logon challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrpProof {
    /// `A`, zero padded to 32 bytes for the proof packet.
    pub client_public_key: [u8; KEY_LENGTH],
    /// `M1`, sent to the server.
    pub client_proof: [u8; PROOF_LENGTH],
    /// `M2`, which the server must send back.
    pub expected_server_proof: [u8; PROOF_LENGTH],
    pub session_key: SessionKey,
}

impl SrpProof {
    pub fn verify_server_proof(&self, server_proof: &[u8; PROOF_LENGTH]) -> Result<(), SrpError> {
        if &self.expected_server_proof == server_proof {
            Ok(())
        } else {
            Err(SrpError::ServerProofMismatch)
        }
    }
}

impl SrpClient {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_uppercase(),
            password: password.to_uppercase(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// `x = H(salt, H(USER:PASS))`
    pub fn calculate_x(&self, salt: &[u8; KEY_LENGTH]) -> BigNumber {
        let credentials = format!("{}:{}", self.username, self.password);
        let inner = sha1_digest(&[credentials.as_bytes()]);
        BigNumber::from_bytes_le(&sha1_digest(&[salt, &inner]))
    }

    /// Answers a logon challenge with the given private exponent.
    ///
    /// Fails with [`SrpError::InvalidPrivateKey`] if `a` yields `A = 0`; the
    /// caller is expected to draw a new key and retry.
    pub fn calculate_proof(
        &self,
        generator: &[u8],
        large_safe_prime: &[u8],
        salt: &[u8; KEY_LENGTH],
        server_public_key: &[u8; KEY_LENGTH],
        private_key: &BigNumber,
    ) -> Result<SrpProof, SrpError> {
        let n = BigNumber::from_bytes_le(large_safe_prime);
        if n.is_zero() {
            return Err(SrpError::InvalidPrime);
        }
        let g = BigNumber::from_bytes_le(generator);
        let b_pub = BigNumber::from_bytes_le(server_public_key);
        if (b_pub.clone() % n.clone()).is_zero() {
            return Err(SrpError::InvalidServerPublicKey);
        }

        let a_pub = g.modpow(private_key, &n);
        if a_pub.is_zero() {
            return Err(SrpError::InvalidPrivateKey);
        }

        let x = self.calculate_x(salt);
        let u = BigNumber::from_bytes_le(&sha1_digest(&[
            &a_pub.to_bytes_le(),
            &b_pub.to_bytes_le(),
        ]));

        // S = (B - k * g^x) ^ (a + u * x) mod N, kept non-negative by adding N first
        let g_x = g.modpow(&x, &n);
        let base = (b_pub.clone() + BigNumber::from(K_VALUE) * (n.clone() - g_x)) % n.clone();
        let exponent = private_key.clone() + u * x;
        let s = base.modpow(&exponent, &n);

        let session_key = interleave_session_key(&s.to_padded_le::<KEY_LENGTH>()?);

        let client_proof = calculate_client_proof(
            &self.username,
            &n,
            &g,
            salt,
            &a_pub,
            &b_pub,
            &session_key,
        );
        let expected_server_proof = calculate_server_proof(&a_pub, &client_proof, &session_key);

        Ok(SrpProof {
            client_public_key: a_pub.to_padded_le::<KEY_LENGTH>()?,
            client_proof,
            expected_server_proof,
            session_key,
        })
    }
}

/// Draws a fresh private exponent `a`.
pub fn random_private_key() -> BigNumber {
    BigNumber::random(PRIVATE_KEY_LENGTH)
}

/// Splits `S` into even and odd bytes, hashes each half and interleaves the
/// two digests into the 40 byte session key.
pub fn interleave_session_key(s: &[u8; KEY_LENGTH]) -> SessionKey {
    let even: Vec<u8> = s.iter().step_by(2).copied().collect();
    let odd: Vec<u8> = s.iter().skip(1).step_by(2).copied().collect();
    let even = sha1_digest(&[&even]);
    let odd = sha1_digest(&[&odd]);

    let mut key = [0_u8; SESSION_KEY_LENGTH];
    for i in 0..PROOF_LENGTH {
        key[i * 2] = even[i];
        key[i * 2 + 1] = odd[i];
    }
    key
}

/// `M1 = H(H(N) xor H(g), H(USER), salt, A, B, K)`
pub fn calculate_client_proof(
    username: &str,
    n: &BigNumber,
    g: &BigNumber,
    salt: &[u8; KEY_LENGTH],
    a_pub: &BigNumber,
    b_pub: &BigNumber,
    session_key: &SessionKey,
) -> [u8; PROOF_LENGTH] {
    let n_hash = sha1_digest(&[&n.to_bytes_le()]);
    let g_hash = sha1_digest(&[&g.to_bytes_le()]);
    let mut xor_hash = [0_u8; PROOF_LENGTH];
    for (out, (n, g)) in xor_hash.iter_mut().zip(n_hash.iter().zip(g_hash.iter())) {
        *out = n ^ g;
    }

    let user_hash = sha1_digest(&[username.as_bytes()]);
    let key = BigNumber::from_bytes_le(session_key).to_bytes_le();

    sha1_digest(&[
        &xor_hash,
        &user_hash,
        salt,
        &a_pub.to_bytes_le(),
        &b_pub.to_bytes_le(),
        &key,
    ])
}

/// `M2 = H(A, M1, K)`
pub fn calculate_server_proof(
    a_pub: &BigNumber,
    client_proof: &[u8; PROOF_LENGTH],
    session_key: &SessionKey,
) -> [u8; PROOF_LENGTH] {
    sha1_digest(&[&a_pub.to_bytes_le(), client_proof, session_key])
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERATOR: [u8; 1] = [7];

    fn prime() -> [u8; KEY_LENGTH] {
        let mut n = BigNumber::from_bytes_be(&[
            0x89, 0x4B, 0x64, 0x5E, 0x89, 0xE1, 0x53, 0x5B, 0xBD, 0xAD, 0x5B, 0x8B, 0x29, 0x06,
            0x50, 0x53, 0x08, 0x01, 0xB1, 0x8E, 0xBF, 0xBF, 0x5E, 0x8F, 0xAB, 0x3C, 0x82, 0x87,
            0x2A, 0x3E, 0x9B, 0xB7,
        ])
        .to_bytes_le();
        n.resize(KEY_LENGTH, 0);
        n.try_into().unwrap()
    }

    fn server_side(
        client: &SrpClient,
        salt: &[u8; KEY_LENGTH],
        b: &BigNumber,
    ) -> (BigNumber, BigNumber) {
        let n = BigNumber::from_bytes_le(&prime());
        let g = BigNumber::from_bytes_le(&GENERATOR);
        let v = g.modpow(&client.calculate_x(salt), &n);
        let b_pub = (BigNumber::from(K_VALUE) * v.clone() + g.modpow(b, &n)) % n;
        (v, b_pub)
    }

    #[test]
    fn test_credentials_are_uppercased() {
        let client = SrpClient::new("alice", "secret");
        assert_eq!(client.username(), "ALICE");
        assert_eq!(client, SrpClient::new("ALICE", "SECRET"));
    }

    #[test]
    fn test_session_key_interleaving() {
        let mut s = [0_u8; KEY_LENGTH];
        for (i, b) in s.iter_mut().enumerate() {
            *b = i as u8;
        }
        let key = interleave_session_key(&s);
        let even: Vec<u8> = (0..32).step_by(2).collect();
        let odd: Vec<u8> = (1..32).step_by(2).collect();
        let even = sha1_digest(&[&even]);
        let odd = sha1_digest(&[&odd]);
        assert_eq!(key[0], even[0]);
        assert_eq!(key[1], odd[0]);
        assert_eq!(key[38], even[19]);
        assert_eq!(key[39], odd[19]);
    }

    #[test]
    fn test_proof_agrees_with_server_side_math() {
        let client = SrpClient::new("player", "hunter2");
        let salt = [0x5A_u8; KEY_LENGTH];
        let b = BigNumber::from_bytes_le(&[0x42; 19]);
        let (v, b_pub) = server_side(&client, &salt, &b);
        let b_bytes = b_pub.to_padded_le::<KEY_LENGTH>().unwrap();

        let a = BigNumber::from_bytes_le(&(0..19).collect::<Vec<u8>>());
        let proof = client
            .calculate_proof(&GENERATOR, &prime(), &salt, &b_bytes, &a)
            .unwrap();

        // Server: S = (A * v^u)^b mod N
        let n = BigNumber::from_bytes_le(&prime());
        let a_pub = BigNumber::from_bytes_le(&proof.client_public_key);
        let u = BigNumber::from_bytes_le(&sha1_digest(&[
            &a_pub.to_bytes_le(),
            &b_pub.to_bytes_le(),
        ]));
        let s = (a_pub.clone() * v.modpow(&u, &n)).modpow(&b, &n);
        let server_key = interleave_session_key(&s.to_padded_le::<KEY_LENGTH>().unwrap());
        assert_eq!(proof.session_key, server_key);

        let m2 = calculate_server_proof(&a_pub, &proof.client_proof, &server_key);
        assert!(proof.verify_server_proof(&m2).is_ok());
    }

    #[test]
    fn test_wrong_password_changes_key() {
        let salt = [1_u8; KEY_LENGTH];
        let b = BigNumber::from_bytes_le(&[9; 19]);
        let (_, b_pub) = server_side(&SrpClient::new("player", "right"), &salt, &b);
        let b_bytes = b_pub.to_padded_le::<KEY_LENGTH>().unwrap();
        let a = BigNumber::from_bytes_le(&[3; 19]);

        let good = SrpClient::new("player", "right")
            .calculate_proof(&GENERATOR, &prime(), &salt, &b_bytes, &a)
            .unwrap();
        let bad = SrpClient::new("player", "wrong")
            .calculate_proof(&GENERATOR, &prime(), &salt, &b_bytes, &a)
            .unwrap();
        assert_ne!(good.session_key, bad.session_key);
        assert_eq!(
            bad.verify_server_proof(&good.expected_server_proof),
            Err(SrpError::ServerProofMismatch)
        );
    }

    #[test]
    fn test_rejects_server_key_divisible_by_prime() {
        let client = SrpClient::new("a", "b");
        let result = client.calculate_proof(
            &GENERATOR,
            &prime(),
            &[0; KEY_LENGTH],
            &prime(),
            &BigNumber::from(5),
        );
        assert_eq!(result, Err(SrpError::InvalidServerPublicKey));
    }

    #[test]
    fn test_rejects_zero_prime() {
        let client = SrpClient::new("a", "b");
        let result = client.calculate_proof(
            &GENERATOR,
            &[0; KEY_LENGTH],
            &[0; KEY_LENGTH],
            &[1; KEY_LENGTH],
            &BigNumber::from(5),
        );
        assert_eq!(result, Err(SrpError::InvalidPrime));
    }
}
