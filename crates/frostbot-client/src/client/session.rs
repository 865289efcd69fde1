use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use frostbot_events::{BotContext, Event, EventTable, Storage};
use frostbot_protocol::crypto::srp::random_private_key;
use frostbot_protocol::crypto::{BigNumber, ClientCrypto, SrpClient, SrpProof, StreamCipher};
use frostbot_protocol::framing::{read_server_packet, write_client_packet};
use frostbot_protocol::packets::auth::{
    realm_list_request, AuthChallenge, LogonChallenge, LogonProof, DEFAULT_AUTH_PORT,
};
use frostbot_protocol::packets::opcodes;
use frostbot_protocol::packets::world_auth::{AuthResponse, AuthSession, WorldAuthChallenge};
use frostbot_protocol::{FrameError, SrpError, WorldPacket};

use crate::client::connection::{
    connect, local_ipv4, read_challenge_reply, read_proof_reply, read_realm_list_reply,
    with_default_port,
};
use crate::client::state::{HandshakeOutcome, HandshakeState};
use crate::error::AuthError;

/// Attempts at drawing a private key before giving up on a challenge.
const PRIVATE_KEY_ATTEMPTS: usize = 8;

/// Frames the reader may run ahead of the event callbacks.
const INBOUND_FRAMES: usize = 64;

/// Who logs in, where, and with which profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub username: String,
    pub password: String,
    /// Auth server as `host[:port]`
    pub auth_server: String,
    /// Registered name of the event graph node to fire events on
    pub profile: String,
}

/// Fires events for one session and collects the packets callbacks queue.
struct Hooks {
    username: String,
    profile: String,
    events: watch::Receiver<Arc<EventTable>>,
    storage: Arc<Mutex<Storage>>,
    outbox: Vec<WorldPacket>,
    missing_profile_logged: bool,
}

impl Hooks {
    /// Returns true when a callback cancelled the event.
    fn fire(&mut self, event: &mut Event<'_>) -> bool {
        let table = Arc::clone(&self.events.borrow());
        let node = match table.lookup(&self.profile) {
            Some(node) => node,
            None => {
                if !self.missing_profile_logged {
                    warn!(target: "events", "Profile '{}' is not registered; {} falls back to root", self.profile, self.username);
                    self.missing_profile_logged = true;
                }
                table.root()
            }
        };

        let mut storage = self.storage.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ctx = BotContext::new(&self.username, &mut storage, &mut self.outbox);
        table.fire(node, &mut ctx, event);
        ctx.is_cancelled()
    }
}

/// The control side of a running [`Session`]. Dropping it stops the session.
#[derive(Debug)]
pub struct SessionHandle {
    username: String,
    state: watch::Receiver<HandshakeState>,
    outbound: mpsc::UnboundedSender<WorldPacket>,
    shutdown: watch::Sender<bool>,
}

impl SessionHandle {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn state(&self) -> HandshakeState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<HandshakeState> {
        self.state.clone()
    }

    /// Queues a packet for the world connection. Packets queued before the
    /// session is streaming are sent once it is.
    pub fn send(&self, packet: WorldPacket) -> bool {
        self.outbound.send(packet).is_ok()
    }

    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Waits until the state satisfies `predicate`, returning that state.
    /// Returns `None` if the session has gone away first.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&HandshakeState) -> bool,
    ) -> Option<HandshakeState> {
        self.state.wait_for(predicate).await.ok().map(|state| *state)
    }
}

struct WorldLink {
    stream: TcpStream,
    crypto: ClientCrypto,
    /// Kept open when a callback asked for it.
    auth: Option<TcpStream>,
}

enum Progress {
    Established(WorldLink),
    Cancelled(HandshakeState),
}

/// One simulated client: logs in through the auth server, enters the world
/// and then fires an event for every packet it receives.
pub struct Session {
    auth_server: String,
    password: String,
    hooks: Hooks,
    state: watch::Sender<HandshakeState>,
    outbound: mpsc::UnboundedReceiver<WorldPacket>,
    shutdown: watch::Receiver<bool>,
    private_key: Option<BigNumber>,
    client_seed: Option<u32>,
}

impl Session {
    pub fn new(
        settings: SessionSettings,
        events: watch::Receiver<Arc<EventTable>>,
        storage: Arc<Mutex<Storage>>,
    ) -> (Self, SessionHandle) {
        let username = settings.username.to_uppercase();
        let (state_tx, state_rx) = watch::channel(HandshakeState::Idle);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let session = Self {
            auth_server: settings.auth_server,
            password: settings.password,
            hooks: Hooks {
                username: username.clone(),
                profile: settings.profile,
                events,
                storage,
                outbox: Vec::new(),
                missing_profile_logged: false,
            },
            state: state_tx,
            outbound: outbound_rx,
            shutdown: shutdown_rx,
            private_key: None,
            client_seed: None,
        };
        let handle = SessionHandle {
            username,
            state: state_rx,
            outbound: outbound_tx,
            shutdown: shutdown_tx,
        };
        (session, handle)
    }

    /// Uses `key` as the first SRP private exponent instead of a random one.
    pub fn with_private_key(mut self, key: BigNumber) -> Self {
        self.private_key = Some(key);
        self
    }

    pub fn with_client_seed(mut self, seed: u32) -> Self {
        self.client_seed = Some(seed);
        self
    }

    pub fn username(&self) -> &str {
        &self.hooks.username
    }

    fn current_state(&self) -> HandshakeState {
        *self.state.borrow()
    }

    fn set_state(&self, state: HandshakeState) {
        debug!(target: "auth", "{}: {}", self.hooks.username, state);
        self.state.send_replace(state);
    }

    /// Logs in and streams until the world connection closes or shutdown is
    /// requested. The final state is published before returning.
    pub async fn run(mut self) -> Result<HandshakeOutcome, AuthError> {
        self.hooks.fire(&mut Event::Create);

        let mut shutdown = self.shutdown.clone();
        let progress = tokio::select! {
            progress = self.login() => progress,
            () = stopped(&mut shutdown) => {
                let at = self.current_state();
                info!(target: "auth", "{} stopped during login at {}", self.hooks.username, at);
                self.set_state(HandshakeState::Disconnected);
                return Ok(HandshakeOutcome::Stopped(at));
            }
        };

        let result = match progress {
            Ok(Progress::Established(link)) => self
                .stream(link)
                .await
                .map(|()| HandshakeOutcome::Completed),
            Ok(Progress::Cancelled(at)) => Ok(HandshakeOutcome::Cancelled(at)),
            Err(e) => Err(e),
        };

        match &result {
            Ok(HandshakeOutcome::Cancelled(at)) => {
                info!(target: "auth", "{} cancelled login after {}", self.hooks.username, at);
                self.set_state(HandshakeState::Cancelled);
            }
            Ok(_) => self.set_state(HandshakeState::Disconnected),
            Err(e) => {
                error!(target: "auth", "{} failed at {}: {}", self.hooks.username, self.current_state(), e);
                self.set_state(HandshakeState::Failed);
            }
        }
        result
    }

    async fn login(&mut self) -> Result<Progress, AuthError> {
        use HandshakeState::*;

        let address = with_default_port(&self.auth_server, DEFAULT_AUTH_PORT);
        info!(target: "auth", "{} connecting to {}", self.hooks.username, address);
        let mut auth = connect(&address).await?;
        self.set_state(Connected);

        let mut packet = LogonChallenge::new(&self.hooks.username, local_ipv4(&auth)).to_bytes();
        if self.hooks.fire(&mut Event::AuthChallenge {
            packet: &mut packet,
        }) {
            return Ok(Progress::Cancelled(Connected));
        }
        auth.write_all(&packet).await?;
        self.set_state(ChallengeSent);

        let challenge = read_challenge_reply(&mut auth).await?;
        self.set_state(ChallengeReplyReceived);

        let proof = self.answer_challenge(&challenge)?;
        let mut packet = LogonProof {
            client_public_key: proof.client_public_key,
            client_proof: proof.client_proof,
        }
        .to_bytes();
        if self.hooks.fire(&mut Event::AuthProof {
            challenge: &challenge,
            packet: &mut packet,
        }) {
            return Ok(Progress::Cancelled(ChallengeReplyReceived));
        }
        auth.write_all(&packet).await?;
        self.set_state(ProofSent);

        let reply = read_proof_reply(&mut auth).await?;
        proof.verify_server_proof(&reply.server_proof)?;
        self.set_state(ProofVerified);

        let mut packet = realm_list_request();
        if self.hooks.fire(&mut Event::RequestRealms {
            packet: &mut packet,
        }) {
            return Ok(Progress::Cancelled(ProofVerified));
        }
        auth.write_all(&packet).await?;
        self.set_state(RealmsRequested);

        let realms = read_realm_list_reply(&mut auth).await?;
        self.set_state(RealmsReceived);
        if realms.is_empty() {
            return Err(AuthError::NoRealms);
        }

        let mut selected = 0;
        if self.hooks.fire(&mut Event::SelectRealm {
            realms: &realms,
            selected: &mut selected,
        }) {
            return Ok(Progress::Cancelled(RealmsReceived));
        }
        let realm = realms
            .get(selected)
            .ok_or(AuthError::InvalidRealmSelection {
                selected,
                count: realms.len(),
            })?;
        info!(target: "auth", "{} selected realm '{}' at {}:{}", self.hooks.username, realm.name, realm.address, realm.port);
        self.set_state(RealmSelected);

        let mut should_close = true;
        if self.hooks.fire(&mut Event::CloseAuthConnection {
            should_close: &mut should_close,
        }) {
            return Ok(Progress::Cancelled(RealmSelected));
        }
        let auth = if should_close {
            drop(auth);
            None
        } else {
            Some(auth)
        };

        let mut world = connect(&format!("{}:{}", realm.address, realm.port)).await?;
        self.set_state(WorldConnected);

        let packet = read_server_packet(&mut world, None).await?;
        expect_opcode(&packet, opcodes::SMSG_AUTH_CHALLENGE)?;
        let challenge = WorldAuthChallenge::read(&packet)?;
        self.set_state(WorldChallengeReceived);

        let client_seed = self.client_seed.unwrap_or_else(rand::random);
        let mut session = AuthSession::new(
            &self.hooks.username,
            client_seed,
            challenge.server_seed,
            u32::from(realm.id),
            &proof.session_key,
        )
        .to_packet();
        if self.hooks.fire(&mut Event::WorldAuthChallenge {
            challenge: &challenge,
            session: &mut session,
        }) {
            return Ok(Progress::Cancelled(WorldChallengeReceived));
        }
        write_client_packet(&mut world, &session, None).await?;
        self.set_state(SessionSent);

        let mut crypto = ClientCrypto::new(&proof.session_key);
        let packet = read_server_packet(&mut world, Some(crypto.decrypter())).await?;
        expect_opcode(&packet, opcodes::SMSG_AUTH_RESPONSE)?;
        let response = AuthResponse::read(&packet)?;
        if !response.is_ok() {
            let reason = match response.command_detail() {
                Some(detail) => detail.to_string(),
                None => format!("unknown detail {}", response.detail),
            };
            return Err(AuthError::WorldRejected(reason));
        }
        self.set_state(WorldAuthVerified);

        let mut char_enum = WorldPacket::new(opcodes::CMSG_CHAR_ENUM);
        if self.hooks.fire(&mut Event::WorldAuthResponse {
            response: &response,
            char_enum: &mut char_enum,
        }) {
            return Ok(Progress::Cancelled(WorldAuthVerified));
        }
        write_client_packet(&mut world, &char_enum, Some(crypto.encrypter())).await?;

        Ok(Progress::Established(WorldLink {
            stream: world,
            crypto,
            auth,
        }))
    }

    /// Runs SRP against the challenge, drawing a new private key whenever
    /// one produces a zero public key.
    fn answer_challenge(&mut self, challenge: &AuthChallenge) -> Result<SrpProof, AuthError> {
        let client = SrpClient::new(&self.hooks.username, &self.password);
        for _ in 0..PRIVATE_KEY_ATTEMPTS {
            let private_key = self.private_key.take().unwrap_or_else(random_private_key);
            match client.calculate_proof(
                &challenge.generator,
                &challenge.large_safe_prime,
                &challenge.salt,
                &challenge.server_public_key,
                &private_key,
            ) {
                Err(SrpError::InvalidPrivateKey) => {
                    debug!(target: "auth", "{}: private key gave A = 0, drawing another", self.hooks.username);
                }
                other => return Ok(other?),
            }
        }
        Err(SrpError::InvalidPrivateKey.into())
    }

    async fn stream(&mut self, link: WorldLink) -> Result<(), AuthError> {
        let WorldLink {
            stream,
            crypto,
            auth,
        } = link;
        let (mut encrypter, decrypter) = crypto.split();
        let (read_half, mut write_half) = stream.into_split();
        let (frames_tx, frames_rx) = mpsc::channel(INBOUND_FRAMES);
        let reader = tokio::spawn(read_frames(read_half, decrypter, frames_tx));

        self.set_state(HandshakeState::Streaming);
        info!(target: "world", "{} is in the world", self.hooks.username);

        let result = self
            .pump(frames_rx, &mut write_half, &mut encrypter)
            .await;

        reader.abort();
        drop(auth);
        result
    }

    async fn pump(
        &mut self,
        mut frames: mpsc::Receiver<Result<WorldPacket, FrameError>>,
        writer: &mut OwnedWriteHalf,
        encrypter: &mut StreamCipher,
    ) -> Result<(), AuthError> {
        let mut shutdown = self.shutdown.clone();
        while let Ok(packet) = self.outbound.try_recv() {
            self.hooks.outbox.push(packet);
        }
        self.flush(writer, encrypter).await?;

        loop {
            tokio::select! {
                frame = frames.recv() => match frame {
                    Some(Ok(packet)) => {
                        self.hooks.fire(&mut Event::WorldPacket(&packet));
                        self.flush(writer, encrypter).await?;
                    }
                    Some(Err(e)) => {
                        info!(target: "world", "{} world connection closed: {}", self.hooks.username, e);
                        return Ok(());
                    }
                    None => return Ok(()),
                },
                packet = self.outbound.recv() => match packet {
                    Some(packet) => {
                        self.hooks.outbox.push(packet);
                        self.flush(writer, encrypter).await?;
                    }
                    None => return Ok(()),
                },
                () = stopped(&mut shutdown) => {
                    info!(target: "world", "{} logging out", self.hooks.username);
                    return Ok(());
                }
            }
        }
    }

    async fn flush(
        &mut self,
        writer: &mut OwnedWriteHalf,
        encrypter: &mut StreamCipher,
    ) -> Result<(), AuthError> {
        let pending = std::mem::take(&mut self.hooks.outbox);
        for packet in &pending {
            write_client_packet(writer, packet, Some(&mut *encrypter)).await?;
        }
        Ok(())
    }
}

fn expect_opcode(packet: &WorldPacket, expected: u32) -> Result<(), AuthError> {
    if packet.opcode() != expected {
        return Err(AuthError::UnexpectedOpcode {
            expected,
            actual: packet.opcode(),
        });
    }
    Ok(())
}

/// Resolves once shutdown is requested or the handle is dropped. Holds no
/// borrow of the channel value, so the session future stays `Send`.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn read_frames(
    mut reader: OwnedReadHalf,
    mut decrypter: StreamCipher,
    frames: mpsc::Sender<Result<WorldPacket, FrameError>>,
) {
    loop {
        let frame = read_server_packet(&mut reader, Some(&mut decrypter)).await;
        let failed = frame.is_err();
        if frames.send(frame).await.is_err() || failed {
            break;
        }
    }
}
