use std::fmt;
use std::ops;

use num_bigint::BigUint;
use rand::RngCore;

use crate::error::SrpError;

/// Unsigned arbitrary precision integer used by the SRP6 exchange.
///
/// The login protocol sends every number little-endian; [`to_bytes_le`]
/// returns the minimal form (no zero high bytes), which is what the proof
/// digests hash.
///
/// [`to_bytes_le`]: BigNumber::to_bytes_le
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BigNumber {
    value: BigUint,
}

impl BigNumber {
    pub fn from_bytes_le(bytes: &[u8]) -> Self {
        Self {
            value: BigUint::from_bytes_le(bytes),
        }
    }

    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        Self {
            value: BigUint::from_bytes_be(bytes),
        }
    }

    /// A number filled with `len` random bytes.
    pub fn random(len: usize) -> Self {
        let mut bytes = vec![0_u8; len];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::from_bytes_le(&bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.value.bits() == 0
    }

    pub fn modpow(&self, exponent: &Self, modulus: &Self) -> Self {
        Self {
            value: self.value.modpow(&exponent.value, &modulus.value),
        }
    }

    /// Minimal little-endian bytes. Zero is a single zero byte.
    pub fn to_bytes_le(&self) -> Vec<u8> {
        self.value.to_bytes_le()
    }

    pub fn to_bytes_be(&self) -> Vec<u8> {
        self.value.to_bytes_be()
    }

    /// Little-endian bytes zero padded to exactly `N`.
    pub fn to_padded_le<const N: usize>(&self) -> Result<[u8; N], SrpError> {
        let bytes = self.to_bytes_le();
        if bytes.len() > N {
            return Err(SrpError::ValueTooLarge(N));
        }
        let mut out = [0_u8; N];
        out[..bytes.len()].copy_from_slice(&bytes);
        Ok(out)
    }
}

impl From<u32> for BigNumber {
    fn from(value: u32) -> Self {
        Self {
            value: BigUint::from(value),
        }
    }
}

impl fmt::Debug for BigNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BigNumber({:#x})", self.value)
    }
}

impl ops::Add for BigNumber {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            value: self.value + rhs.value,
        }
    }
}

/// Panics when `rhs` is larger than `self`, like the primitive unsigned types.
impl ops::Sub for BigNumber {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            value: self.value - rhs.value,
        }
    }
}

impl ops::Mul for BigNumber {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self {
            value: self.value * rhs.value,
        }
    }
}

impl ops::Rem for BigNumber {
    type Output = Self;

    fn rem(self, rhs: Self) -> Self::Output {
        Self {
            value: self.value % rhs.value,
        }
    }
}
