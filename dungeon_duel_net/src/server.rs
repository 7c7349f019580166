// TCP server and main event loop for the duel coordinator.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread**: non-blocking `accept()` loop that forwards each new
//   connection as `InternalEvent::NewConnection`.
// - **Reader threads** (one per endpoint): read frames with a short socket
//   timeout through `FrameReader`, decode `WireMessage`s and forward them as
//   `InternalEvent::MessageFrom`. A timeout only re-checks the shutdown flag;
//   EOF, an I/O error, a malformed message or `goodbye` ends the loop with
//   `InternalEvent::Disconnected`.
// - **Main thread**: owns the `Session` (and with it the `MatchState`) and
//   handles one event at a time. This is the match's single critical
//   section: two plays arriving together are applied strictly one after the
//   other, and each per-endpoint view is written before the next event is
//   looked at.
//
// Capacity is enforced on the main thread when `NewConnection` is handled: a
// connection beyond `max_endpoints` is shut down and dropped before it gets
// an id or a reader thread, and nothing is broadcast about it.
//
// Shutdown: `CoordinatorHandle::stop` (or drop) clears `keep_running`. The
// main loop notices within one poll interval, closes every endpoint once,
// and joins the listener thread.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use dungeon_duel_game::{MatchRules, MatchState};
use dungeon_duel_protocol::framing::FrameReader;
use dungeon_duel_protocol::message::WireMessage;
use dungeon_duel_protocol::types::{DEFAULT_PORT, EndpointId};

use crate::error::CoordinatorError;
use crate::session::Session;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Events sent from listener/reader threads to the main thread.
enum InternalEvent {
    NewConnection {
        stream: TcpStream,
        peer: SocketAddr,
    },
    MessageFrom {
        endpoint: EndpointId,
        message: WireMessage,
    },
    Disconnected {
        endpoint: EndpointId,
    },
}

/// Handle returned by `start_coordinator` to control the running server.
pub struct CoordinatorHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl CoordinatorHandle {
    /// Signal the coordinator to stop and wait for it. Safe to call twice.
    pub fn stop(&mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for CoordinatorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Configuration for starting a coordinator.
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    pub host: String,
    pub port: u16,
    pub max_endpoints: usize,
    /// Match seed; random when `None`.
    pub seed: Option<u64>,
    pub rules: MatchRules,
    /// Read timeout on endpoint sockets, and the main loop's wake-up period.
    pub poll_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_PORT,
            max_endpoints: 2,
            seed: None,
            rules: MatchRules::default(),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Start the coordinator on a background thread. Returns a handle for
/// stopping it and the actual bound address (port 0 lets the OS pick).
///
/// Binding happens on the calling thread, so an unusable address is
/// reported here and never retried.
pub fn start_coordinator(
    config: CoordinatorConfig,
) -> Result<(CoordinatorHandle, SocketAddr), CoordinatorError> {
    let bind_addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&bind_addr).map_err(|source| CoordinatorError::Bind {
        addr: bind_addr.clone(),
        source,
    })?;
    let addr = listener.local_addr()?;
    listener.set_nonblocking(true)?;
    log::info!("coordinator listening on {addr}");

    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();
    let thread = thread::Builder::new()
        .name("duel-coordinator".into())
        .spawn(move || run_coordinator(listener, config, keep_running_clone))?;

    Ok((
        CoordinatorHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Main coordinator loop. Runs until `keep_running` is cleared.
fn run_coordinator(listener: TcpListener, config: CoordinatorConfig, keep_running: Arc<AtomicBool>) {
    let seed = config.seed.unwrap_or_else(rand::random);
    log::info!("match seed {seed}");
    let mut session = Session::new(MatchState::new(config.rules.clone(), seed), config.max_endpoints);

    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    let listener_thread = thread::Builder::new()
        .name("duel-accept".into())
        .spawn(move || accept_loop(listener, tx_listener, keep_running_listener));
    let listener_thread = match listener_thread {
        Ok(handle) => Some(handle),
        Err(e) => {
            log::error!("could not spawn accept thread: {e}");
            None
        }
    };

    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(config.poll_interval) {
            Ok(event) => {
                handle_event(&mut session, event, &tx, &keep_running, &config);
                // Re-check the flag per event so a flooding peer cannot hold
                // off `stop()`.
                while keep_running.load(Ordering::SeqCst) {
                    let Ok(event) = rx.try_recv() else { break };
                    handle_event(&mut session, event, &tx, &keep_running, &config);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    log::info!("coordinator shutting down");
    session.disconnect_all();
    if let Some(handle) = listener_thread {
        let _ = handle.join();
    }
}

fn accept_loop(listener: TcpListener, tx: Sender<InternalEvent>, keep_running: Arc<AtomicBool>) {
    while keep_running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                if tx.send(InternalEvent::NewConnection { stream, peer }).is_err() {
                    break;
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(e) => {
                log::error!("accept failed: {e}");
                break;
            }
        }
    }
}

/// Dispatch a single event to the session.
fn handle_event(
    session: &mut Session,
    event: InternalEvent,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
    config: &CoordinatorConfig,
) {
    match event {
        InternalEvent::NewConnection { stream, peer } => {
            handle_new_connection(session, stream, peer, tx, keep_running, config);
        }
        InternalEvent::MessageFrom { endpoint, message } => {
            handle_message(session, endpoint, message);
        }
        InternalEvent::Disconnected { endpoint } => {
            session.remove_endpoint(endpoint);
        }
    }
}

/// Seat a new connection and spawn its reader, or close it if the session
/// is full.
fn handle_new_connection(
    session: &mut Session,
    stream: TcpStream,
    peer: SocketAddr,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
    config: &CoordinatorConfig,
) {
    if session.is_full() {
        log::warn!("refusing connection from {peer}: session full");
        let _ = stream.shutdown(std::net::Shutdown::Both);
        return;
    }
    if let Err(e) = configure_stream(&stream, config.poll_interval) {
        log::warn!("dropping connection from {peer}: {e}");
        return;
    }
    let reader_stream = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            log::warn!("dropping connection from {peer}: {e}");
            return;
        }
    };
    let Some(endpoint) = session.add_endpoint(stream) else {
        return;
    };
    log::info!("accepted {peer} as {endpoint}");

    let tx_reader = tx.clone();
    let keep_running_reader = keep_running.clone();
    let spawned = thread::Builder::new()
        .name(format!("duel-reader-{}", endpoint.0))
        .spawn(move || reader_loop(reader_stream, endpoint, tx_reader, keep_running_reader));
    if let Err(e) = spawned {
        log::error!("could not spawn reader for {endpoint}: {e}");
        session.remove_endpoint(endpoint);
    }
}

fn configure_stream(stream: &TcpStream, poll_interval: Duration) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;
    stream.set_read_timeout(Some(poll_interval))?;
    stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
    Ok(())
}

/// Reader loop for a single endpoint. Runs in its own thread.
fn reader_loop(
    stream: TcpStream,
    endpoint: EndpointId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    let mut reader = FrameReader::new(stream);
    while keep_running.load(Ordering::SeqCst) {
        match reader.read_wire() {
            Ok(Some(WireMessage::Goodbye)) => {
                log::info!("{endpoint} said goodbye");
                let _ = tx.send(InternalEvent::Disconnected { endpoint });
                break;
            }
            Ok(Some(message)) => {
                log::debug!("<- {endpoint}: {}", message.kind());
                if tx.send(InternalEvent::MessageFrom { endpoint, message }).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => {
                if e.kind() != io::ErrorKind::UnexpectedEof {
                    log::warn!("{endpoint} read failed: {e}");
                }
                let _ = tx.send(InternalEvent::Disconnected { endpoint });
                break;
            }
        }
    }
}

fn handle_message(session: &mut Session, endpoint: EndpointId, message: WireMessage) {
    match message {
        WireMessage::Ready => session.on_endpoint_ready(endpoint),
        WireMessage::CardPlayed { card } => session.on_card_played(endpoint, card),
        WireMessage::Chat { text } => session.on_chat(endpoint, text),
        // Goodbye is handled in the reader loop.
        WireMessage::Goodbye => {}
        other => session.on_unexpected(endpoint, other.kind()),
    }
}
