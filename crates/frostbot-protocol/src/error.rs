use thiserror::Error;

/// Failure while reading structured data out of a packet body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("read of {wanted} bytes at offset {offset} runs past the end of a {len} byte packet")]
    UnexpectedEnd {
        offset: usize,
        wanted: usize,
        len: usize,
    },
    #[error("string starting at offset {0} has no terminator")]
    UnterminatedString(usize),
    #[error("invalid {what}: {value}")]
    InvalidValue { what: &'static str, value: u64 },
    #[error("failed to inflate compressed payload: {0}")]
    Decompress(String),
}

/// Failure while reading or writing a framed world packet.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),
    #[error("payload of {0} bytes does not fit in a packet header")]
    TooLarge(usize),
    #[error("header size {0} is smaller than its opcode")]
    InvalidSize(u32),
    #[error("opcode {0:#x} does not fit in a server header")]
    InvalidOpcode(u32),
}

/// Failure while encoding or decoding a schema-described record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("unknown schema '{0}'")]
    UnknownSchema(String),
    #[error("schema '{0}' has no opcode")]
    NotAPacket(String),
    #[error("record is missing field '{0}'")]
    MissingField(String),
    #[error("field '{field}' expected {expected}")]
    TypeMismatch { field: String, expected: String },
    #[error("field '{field}' holds {actual} elements but the layout fixes {expected}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },
    #[error("field '{field}' length {len} does not fit its size prefix")]
    LengthOverflow { field: String, len: usize },
}

/// Failure during the SRP6 proof calculation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SrpError {
    #[error("server sent a zero modulus")]
    InvalidPrime,
    #[error("server public key is a multiple of the modulus")]
    InvalidServerPublicKey,
    #[error("private key produces a zero public key")]
    InvalidPrivateKey,
    #[error("value does not fit in {0} bytes")]
    ValueTooLarge(usize),
    #[error("server proof does not match the expected digest")]
    ServerProofMismatch,
}
