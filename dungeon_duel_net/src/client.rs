// TCP endpoint for connecting to the duel coordinator.
//
// Architecture:
// - `Endpoint::connect()` opens the TCP connection, spawns the background
//   reader thread, and only then sends `ready`. The coordinator will not
//   start a match until both endpoints have done this, so no state update
//   can arrive before something is listening for it.
// - The reader thread reads frames with a short socket timeout. A timeout is
//   not a disconnect; it only lets the thread notice `stop()`. Every inbound
//   message and every transport notice becomes an `EndpointEvent` on one
//   `mpsc` channel.
// - `poll()` / `recv_timeout()` drain that channel on the owner's schedule.
//   Nothing calls back into the owner from the reader thread.
// - The write half sits behind a mutex in state shared with
//   `EndpointSender`, so any thread can send. A failed send tears the
//   connection down.
//
// `Disconnected` is emitted exactly once per endpoint no matter how many of
// these race: a remote close seen by the reader, a failed send, `stop()`
// called twice, drop.

use std::fmt;
use std::io::BufWriter;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use dungeon_duel_game::Card;
use dungeon_duel_protocol::framing::{FrameReader, write_wire};
use dungeon_duel_protocol::message::WireMessage;

use crate::error::EndpointError;

#[derive(Clone, Debug)]
pub struct EndpointConfig {
    /// Socket read timeout; bounds how long `stop()` waits for the reader.
    pub read_timeout: Duration,
    /// Socket write timeout; bounds how long `send()` (and the `goodbye` in
    /// `stop()`) can block on a peer that stopped reading.
    pub write_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(250),
            write_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Everything the endpoint reports to its owner.
#[derive(Clone, Debug, PartialEq)]
pub enum EndpointEvent {
    Connected { peer: SocketAddr },
    Message(WireMessage),
    Disconnected { reason: String },
    Error { message: String },
}

/// State shared between the endpoint, its senders and its reader thread.
struct Shared {
    writer: Mutex<Option<BufWriter<TcpStream>>>,
    running: AtomicBool,
    disconnected: AtomicBool,
    events: Sender<EndpointEvent>,
}

impl Shared {
    fn writer(&self) -> MutexGuard<'_, Option<BufWriter<TcpStream>>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, msg: &WireMessage) -> Result<(), EndpointError> {
        let result = {
            let mut writer = self.writer();
            let Some(writer) = writer.as_mut() else {
                log::warn!("cannot send {}: not connected", msg.kind());
                return Err(EndpointError::NotConnected);
            };
            write_wire(writer, msg)
        };
        match result {
            Ok(()) => {
                log::debug!("sent {}", msg.kind());
                Ok(())
            }
            Err(e) => {
                log::warn!("send of {} failed: {e}", msg.kind());
                let _ = self.events.send(EndpointEvent::Error {
                    message: format!("send failed: {e}"),
                });
                self.close_transport();
                self.notify_disconnected(format!("send failed: {e}"));
                Err(EndpointError::Send(e))
            }
        }
    }

    /// Stop the reader and close the socket. Safe to repeat.
    fn close_transport(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(writer) = self.writer().take() {
            let _ = writer.get_ref().shutdown(Shutdown::Both);
        }
    }

    fn notify_disconnected(&self, reason: String) {
        if !self.disconnected.swap(true, Ordering::SeqCst) {
            log::info!("disconnected: {reason}");
            let _ = self.events.send(EndpointEvent::Disconnected { reason });
        }
    }
}

/// Cloneable send-only handle, usable from any thread.
#[derive(Clone)]
pub struct EndpointSender {
    shared: Arc<Shared>,
}

impl EndpointSender {
    pub fn send(&self, msg: &WireMessage) -> Result<(), EndpointError> {
        self.shared.send(msg)
    }
}

/// One side's live connection to a coordinator.
pub struct Endpoint {
    shared: Arc<Shared>,
    inbox: Receiver<EndpointEvent>,
    reader_thread: Option<JoinHandle<()>>,
}

impl Endpoint {
    /// Connect, start the reader thread, then announce readiness.
    pub fn connect(
        addr: impl ToSocketAddrs + fmt::Display,
        config: &EndpointConfig,
    ) -> Result<Self, EndpointError> {
        let (stream, peer) = open(addr, config.connect_timeout)?;
        stream.set_nodelay(true).map_err(EndpointError::Setup)?;
        stream
            .set_read_timeout(Some(config.read_timeout))
            .map_err(EndpointError::Setup)?;
        stream
            .set_write_timeout(Some(config.write_timeout))
            .map_err(EndpointError::Setup)?;
        let reader_stream = stream.try_clone().map_err(EndpointError::Setup)?;

        let (tx, rx) = mpsc::channel();
        let shared = Arc::new(Shared {
            writer: Mutex::new(Some(BufWriter::new(stream))),
            running: AtomicBool::new(true),
            disconnected: AtomicBool::new(false),
            events: tx,
        });
        let _ = shared.events.send(EndpointEvent::Connected { peer });
        log::info!("connected to {peer}");

        let reader_shared = shared.clone();
        let reader_thread = thread::Builder::new()
            .name("duel-endpoint-reader".into())
            .spawn(move || reader_loop(reader_stream, reader_shared))
            .map_err(EndpointError::Setup)?;

        let mut endpoint = Self {
            shared,
            inbox: rx,
            reader_thread: Some(reader_thread),
        };
        if let Err(e) = endpoint.send(&WireMessage::Ready) {
            endpoint.stop();
            return Err(e);
        }
        Ok(endpoint)
    }

    pub fn sender(&self) -> EndpointSender {
        EndpointSender {
            shared: self.shared.clone(),
        }
    }

    /// Send one message. Fails with `NotConnected` after teardown; a failed
    /// write tears the connection down.
    pub fn send(&self, msg: &WireMessage) -> Result<(), EndpointError> {
        self.shared.send(msg)
    }

    pub fn play_card(&self, card: Card) -> Result<(), EndpointError> {
        self.send(&WireMessage::CardPlayed { card })
    }

    pub fn chat(&self, text: impl Into<String>) -> Result<(), EndpointError> {
        self.send(&WireMessage::Chat { text: text.into() })
    }

    pub fn is_connected(&self) -> bool {
        !self.shared.disconnected.load(Ordering::SeqCst)
    }

    /// Drain all queued events (non-blocking).
    pub fn poll(&self) -> Vec<EndpointEvent> {
        self.inbox.try_iter().collect()
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EndpointEvent> {
        self.inbox.recv_timeout(timeout).ok()
    }

    /// Ordered, idempotent teardown: say goodbye if still connected, stop the
    /// reader, close the socket, report `Disconnected` once.
    pub fn stop(&mut self) {
        if self.shared.running.load(Ordering::SeqCst) {
            let mut writer = self.shared.writer();
            if let Some(writer) = writer.as_mut() {
                let _ = write_wire(writer, &WireMessage::Goodbye);
            }
        }
        self.shared.close_transport();
        if let Some(handle) = self.reader_thread.take() {
            let _ = handle.join();
        }
        self.shared.notify_disconnected("stopped".into());
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open(
    addr: impl ToSocketAddrs + fmt::Display,
    timeout: Duration,
) -> Result<(TcpStream, SocketAddr), EndpointError> {
    let resolve_err = || EndpointError::Resolve {
        addr: addr.to_string(),
    };
    let addrs: Vec<SocketAddr> = addr.to_socket_addrs().map_err(|_| resolve_err())?.collect();
    let mut last_err = None;
    for candidate in &addrs {
        match TcpStream::connect_timeout(candidate, timeout) {
            Ok(stream) => return Ok((stream, *candidate)),
            Err(e) => last_err = Some(e),
        }
    }
    match last_err {
        Some(source) => Err(EndpointError::Connect {
            addr: addr.to_string(),
            source,
        }),
        None => Err(resolve_err()),
    }
}

/// Reader thread: frames in, events out, until the stream ends or `stop()`.
fn reader_loop(stream: TcpStream, shared: Arc<Shared>) {
    let mut reader = FrameReader::new(stream);
    while shared.running.load(Ordering::SeqCst) {
        match reader.read_wire() {
            Ok(Some(msg)) => {
                log::debug!("received {}", msg.kind());
                if shared.events.send(EndpointEvent::Message(msg)).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => {
                if !shared.running.load(Ordering::SeqCst) {
                    break;
                }
                let reason = if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    "connection closed by coordinator".to_string()
                } else {
                    let _ = shared.events.send(EndpointEvent::Error {
                        message: format!("read failed: {e}"),
                    });
                    format!("read failed: {e}")
                };
                shared.close_transport();
                shared.notify_disconnected(reason);
                break;
            }
        }
    }
}
