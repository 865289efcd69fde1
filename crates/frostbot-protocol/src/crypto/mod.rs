//! Session key agreement and the header stream cipher.

pub mod bigint;
mod cipher;
mod rc4;
pub mod srp;

use sha1::{Digest, Sha1};

pub use bigint::BigNumber;
pub use cipher::{
    ClientCrypto, ServerCrypto, StreamCipher, CLIENT_DECRYPTION_KEY, CLIENT_ENCRYPTION_KEY,
};
pub use srp::{SrpClient, SrpProof};

pub const SESSION_KEY_LENGTH: usize = 40;
pub const PROOF_LENGTH: usize = 20;

/// The 40 byte key shared with the server after a successful login.
pub type SessionKey = [u8; SESSION_KEY_LENGTH];

/// SHA-1 over the concatenation of `parts`.
pub fn sha1_digest(parts: &[&[u8]]) -> [u8; PROOF_LENGTH] {
    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}
