mod connection;
mod session;
mod state;

pub use connection::{connect, with_default_port};
pub use session::{Session, SessionHandle, SessionSettings};
pub use state::{HandshakeOutcome, HandshakeState};
