use thiserror::Error;

use frostbot_protocol::{DecodeError, FrameError, SrpError};

/// Why a login attempt failed. None of these are retried.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("malformed packet: {0}")]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Srp(#[from] SrpError),
    #[error("expected auth command {expected:#04x}, got {actual:#04x}")]
    UnexpectedCommand { expected: u8, actual: u8 },
    #[error("expected opcode {expected:#06x}, got {actual:#06x}")]
    UnexpectedOpcode { expected: u32, actual: u32 },
    #[error("login server refused the {step}: {reason}")]
    LogonRejected { step: &'static str, reason: String },
    #[error("world server refused the session: {0}")]
    WorldRejected(String),
    #[error("realm list is empty")]
    NoRealms,
    #[error("selected realm {selected} but only {count} are listed")]
    InvalidRealmSelection { selected: usize, count: usize },
}
