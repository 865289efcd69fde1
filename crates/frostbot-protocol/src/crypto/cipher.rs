use hmac::{Hmac, Mac};
use sha1::Sha1;

use super::rc4::Rc4;
use super::SessionKey;

/// Seeds the stream the client encrypts with (and the server decrypts).
pub const CLIENT_ENCRYPTION_KEY: [u8; 16] = [
    0xC2, 0xB3, 0x72, 0x3C, 0xC6, 0xAE, 0xD9, 0xB5, 0x34, 0x3C, 0x53, 0xEE, 0x2F, 0x43, 0x67, 0xCE,
];

/// Seeds the stream the client decrypts with (and the server encrypts).
pub const CLIENT_DECRYPTION_KEY: [u8; 16] = [
    0xCC, 0x98, 0xAE, 0x04, 0xE8, 0x97, 0xEA, 0xCA, 0x12, 0xDD, 0xC0, 0x93, 0x42, 0x91, 0x53, 0x57,
];

const DROP_LENGTH: usize = 1024;

/// One direction of header encryption: RC4 keyed with
/// HMAC-SHA1(direction key, session key), with the first 1024 bytes of
/// keystream thrown away.
#[derive(Debug, Clone)]
pub struct StreamCipher {
    rc4: Rc4,
}

impl StreamCipher {
    pub fn new(session_key: &SessionKey, direction_key: &[u8; 16]) -> Self {
        let mut mac = <Hmac<Sha1> as Mac>::new_from_slice(direction_key)
            .expect("HMAC accepts keys of any length");
        mac.update(session_key);
        let seed = mac.finalize().into_bytes();

        let mut rc4 = Rc4::new(&seed);
        rc4.apply(&mut [0_u8; DROP_LENGTH]);

        Self { rc4 }
    }

    /// Transforms `data` in place and advances the keystream by its length.
    pub fn apply(&mut self, data: &mut [u8]) {
        self.rc4.apply(data);
    }
}

/// Cipher pair held by the client side of a world connection.
#[derive(Debug, Clone)]
pub struct ClientCrypto {
    encrypter: StreamCipher,
    decrypter: StreamCipher,
}

impl ClientCrypto {
    pub fn new(session_key: &SessionKey) -> Self {
        Self {
            encrypter: StreamCipher::new(session_key, &CLIENT_ENCRYPTION_KEY),
            decrypter: StreamCipher::new(session_key, &CLIENT_DECRYPTION_KEY),
        }
    }

    pub fn encrypter(&mut self) -> &mut StreamCipher {
        &mut self.encrypter
    }

    pub fn decrypter(&mut self) -> &mut StreamCipher {
        &mut self.decrypter
    }

    /// Separates the halves so reading and writing can live on different tasks.
    pub fn split(self) -> (StreamCipher, StreamCipher) {
        (self.encrypter, self.decrypter)
    }
}

/// Mirror of [`ClientCrypto`] for the server end of a connection.
#[derive(Debug, Clone)]
pub struct ServerCrypto {
    encrypter: StreamCipher,
    decrypter: StreamCipher,
}

impl ServerCrypto {
    pub fn new(session_key: &SessionKey) -> Self {
        Self {
            encrypter: StreamCipher::new(session_key, &CLIENT_DECRYPTION_KEY),
            decrypter: StreamCipher::new(session_key, &CLIENT_ENCRYPTION_KEY),
        }
    }

    pub fn encrypter(&mut self) -> &mut StreamCipher {
        &mut self.encrypter
    }

    pub fn decrypter(&mut self) -> &mut StreamCipher {
        &mut self.decrypter
    }

    pub fn split(self) -> (StreamCipher, StreamCipher) {
        (self.encrypter, self.decrypter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(seed: u8) -> SessionKey {
        let mut key = [0_u8; 40];
        for (i, b) in key.iter_mut().enumerate() {
            *b = seed.wrapping_add(i as u8);
        }
        key
    }

    #[test]
    fn test_same_key_same_stream() {
        let mut first = StreamCipher::new(&key(1), &CLIENT_ENCRYPTION_KEY);
        let mut second = StreamCipher::new(&key(1), &CLIENT_ENCRYPTION_KEY);

        for input in [&b"header"[..], &[0_u8; 17][..], &[0xFF; 3][..]] {
            let mut a = input.to_vec();
            let mut b = input.to_vec();
            first.apply(&mut a);
            second.apply(&mut b);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_empty_apply_does_not_advance() {
        let mut touched = StreamCipher::new(&key(3), &CLIENT_DECRYPTION_KEY);
        let mut untouched = touched.clone();

        touched.apply(&mut []);

        let mut a = [1_u8, 2, 3, 4];
        let mut b = a;
        touched.apply(&mut a);
        untouched.apply(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_reapplying_does_not_undo() {
        let mut cipher = StreamCipher::new(&key(5), &CLIENT_ENCRYPTION_KEY);
        let original = [0x10_u8, 0x20, 0x30, 0x40, 0x50, 0x60];
        let mut data = original;
        cipher.apply(&mut data);
        cipher.apply(&mut data);
        assert_ne!(data, original);
    }

    #[test]
    fn test_directions_use_distinct_streams() {
        let mut enc = StreamCipher::new(&key(9), &CLIENT_ENCRYPTION_KEY);
        let mut dec = StreamCipher::new(&key(9), &CLIENT_DECRYPTION_KEY);
        let mut a = [0_u8; 8];
        let mut b = [0_u8; 8];
        enc.apply(&mut a);
        dec.apply(&mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn test_client_and_server_pair_up() {
        let (mut client_enc, mut client_dec) = ClientCrypto::new(&key(11)).split();
        let (mut server_enc, mut server_dec) = ServerCrypto::new(&key(11)).split();

        let mut up = *b"\x00\x04\x37\x00\x00\x00";
        client_enc.apply(&mut up);
        server_dec.apply(&mut up);
        assert_eq!(&up, b"\x00\x04\x37\x00\x00\x00");

        let mut down = *b"\x00\x07\xee\x01";
        server_enc.apply(&mut down);
        client_dec.apply(&mut down);
        assert_eq!(&down, b"\x00\x07\xee\x01");
    }
}
