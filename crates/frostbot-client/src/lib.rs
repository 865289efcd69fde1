//! Login handshake, world session, profiles and configuration for frostbot.

pub mod client;
pub mod config;
pub mod error;
pub mod profiles;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use client::{HandshakeOutcome, HandshakeState, Session, SessionHandle, SessionSettings};
pub use config::{AccountConfig, FrostbotConfig};
pub use error::AuthError;
pub use profiles::{build_table, BuiltinProfiles, ProfileChain, ProfileSet};
