// Integration smoke test for the duel coordinator.
//
// Starts a coordinator on localhost and drives it with plain TCP sockets that
// speak the protocol crate's framing and message types directly, no
// `Endpoint` involved. Covers the ready handshake, tailored state updates,
// rejected plays, chat, capacity refusal, disconnect handling and shutdown.

use std::io::{self, BufReader, BufWriter};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use dungeon_duel_game::{MatchRules, Side};
use dungeon_duel_net::{CoordinatorConfig, CoordinatorError, CoordinatorHandle, start_coordinator};
use dungeon_duel_protocol::framing::{read_message, write_message, write_wire};
use dungeon_duel_protocol::message::{StateUpdate, WireMessage, decode};

/// A raw protocol peer.
struct Peer {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Peer {
    fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let reader_stream = stream.try_clone().unwrap();
        Self {
            reader: BufReader::new(reader_stream),
            writer: BufWriter::new(stream),
        }
    }

    /// Connect and send `ready`, then wait for the welcome chat so the
    /// coordinator has registered this peer before the caller moves on.
    fn connect_ready(addr: SocketAddr) -> Self {
        let mut peer = Self::connect(addr);
        peer.send(&WireMessage::Ready);
        peer.expect("welcome", |m| {
            matches!(m, WireMessage::Chat { text } if text.starts_with("Welcome"))
        });
        peer
    }

    fn send(&mut self, msg: &WireMessage) {
        write_wire(&mut self.writer, msg).unwrap();
    }

    fn recv(&mut self) -> io::Result<WireMessage> {
        let bytes = read_message(&mut self.reader)?;
        Ok(decode(&bytes).unwrap())
    }

    /// Read until `pred` matches; panics if the stream ends or stalls first.
    fn expect(&mut self, what: &str, pred: impl Fn(&WireMessage) -> bool) -> WireMessage {
        loop {
            match self.recv() {
                Ok(msg) if pred(&msg) => return msg,
                Ok(_) => {}
                Err(e) => panic!("stream ended while waiting for {what}: {e}"),
            }
        }
    }

    fn expect_state(&mut self) -> StateUpdate {
        match self.expect("state update", |m| matches!(m, WireMessage::StateUpdate(_))) {
            WireMessage::StateUpdate(update) => update,
            _ => unreachable!(),
        }
    }

    fn expect_turn(&mut self) -> bool {
        match self.expect("turn announcement", |m| {
            matches!(m, WireMessage::TurnAnnouncement { .. })
        }) {
            WireMessage::TurnAnnouncement { your_turn } => your_turn,
            _ => unreachable!(),
        }
    }
}

fn start(seed: u64) -> (CoordinatorHandle, SocketAddr) {
    let config = CoordinatorConfig {
        port: 0,
        seed: Some(seed),
        rules: MatchRules::default(),
        poll_interval: Duration::from_millis(50),
        ..CoordinatorConfig::default()
    };
    start_coordinator(config).unwrap()
}

/// Two ready peers with the match started; `a` moves first. Returns each
/// peer's opening view.
fn started_match(addr: SocketAddr) -> (Peer, Peer, StateUpdate, StateUpdate) {
    let mut a = Peer::connect_ready(addr);
    a.expect("waiting notice", |m| {
        matches!(m, WireMessage::Chat { text } if text.starts_with("Waiting"))
    });
    let mut b = Peer::connect_ready(addr);
    let view_a = a.expect_state();
    let view_b = b.expect_state();
    assert!(a.expect_turn());
    assert!(!b.expect_turn());
    (a, b, view_a, view_b)
}

#[test]
fn handshake_and_first_play() {
    let (mut handle, addr) = start(42);
    let (mut a, mut b, view_a, view_b) = started_match(addr);

    assert_eq!(view_a.seat, Side::A);
    assert_eq!(view_b.seat, Side::B);
    assert!(view_a.your_turn);
    assert_eq!(view_a.own.hand().len(), 7);
    assert_eq!(view_b.opponent.hand_count, 7);
    assert_eq!(view_a.opponent.health, view_b.own.health());

    let card = view_a.own.hand()[0].clone();
    a.send(&WireMessage::CardPlayed { card: card.clone() });

    let seen = b.expect("opponent card", |m| matches!(m, WireMessage::CardPlayed { .. }));
    assert_eq!(seen, WireMessage::CardPlayed { card });

    let after_a = a.expect_state();
    assert!(!after_a.your_turn);
    assert!(!a.expect_turn());
    let after_b = b.expect_state();
    assert!(after_b.your_turn);
    assert!(b.expect_turn());
    assert_eq!(after_b.opponent.hand_count, after_a.own.hand().len());

    handle.stop();
}

#[test]
fn out_of_turn_play_is_rejected() {
    let (mut handle, addr) = start(7);
    let (_a, mut b, _view_a, view_b) = started_match(addr);

    let card = view_b.own.hand()[0].clone();
    b.send(&WireMessage::CardPlayed { card });
    let rejected = b.expect("rejection", |m| matches!(m, WireMessage::Rejected { .. }));
    assert_eq!(
        rejected,
        WireMessage::Rejected {
            reason: "not your turn".into()
        }
    );

    handle.stop();
}

#[test]
fn chat_is_relayed_with_role_prefix() {
    let (mut handle, addr) = start(3);
    let (mut a, mut b, _, _) = started_match(addr);

    b.send(&WireMessage::Chat {
        text: "hello there".into(),
    });
    let expected = WireMessage::Chat {
        text: "Player 2: hello there".into(),
    };
    assert_eq!(a.expect("chat", |m| *m == expected), expected);
    assert_eq!(b.expect("chat echo", |m| *m == expected), expected);

    handle.stop();
}

#[test]
fn third_connection_is_refused() {
    let (mut handle, addr) = start(11);
    let (mut a, _b, _, _) = started_match(addr);

    let mut third = Peer::connect(addr);
    let err = third.recv().unwrap_err();
    assert!(
        !matches!(
            err.kind(),
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
        ),
        "third connection should be closed, got {err}"
    );

    // The refused connection produced no join notice: the next thing A sees
    // is its own chat.
    a.send(&WireMessage::Chat { text: "ping".into() });
    assert_eq!(
        a.recv().unwrap(),
        WireMessage::Chat {
            text: "Player 1: ping".into()
        }
    );

    handle.stop();
}

#[test]
fn goodbye_pauses_the_match() {
    let (mut handle, addr) = start(5);
    let (mut a, mut b, view_a, _) = started_match(addr);

    b.send(&WireMessage::Goodbye);
    let paused = a.expect("pause notice", |m| matches!(m, WireMessage::Paused { .. }));
    assert!(matches!(paused, WireMessage::Paused { reason } if reason.contains("Player 2")));

    a.send(&WireMessage::CardPlayed {
        card: view_a.own.hand()[0].clone(),
    });
    assert_eq!(
        a.expect("rejection", |m| matches!(m, WireMessage::Rejected { .. })),
        WireMessage::Rejected {
            reason: "match paused".into()
        }
    );

    handle.stop();
}

#[test]
fn malformed_message_counts_as_disconnect() {
    let (mut handle, addr) = start(9);
    let (mut a, mut b, _, _) = started_match(addr);

    write_message(&mut b.writer, b"{\"kind\":").unwrap();
    a.expect("pause notice", |m| matches!(m, WireMessage::Paused { .. }));

    handle.stop();
}

#[test]
fn bind_failure_is_reported() {
    let occupied = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();
    let result = start_coordinator(CoordinatorConfig {
        port,
        ..CoordinatorConfig::default()
    });
    assert!(matches!(result, Err(CoordinatorError::Bind { .. })));
}

#[test]
fn stop_closes_endpoints_and_is_idempotent() {
    let (mut handle, addr) = start(1);
    let mut a = Peer::connect_ready(addr);

    handle.stop();
    handle.stop();
    assert!(!handle.is_running());

    // Everything already queued drains, then the stream ends.
    loop {
        match a.recv() {
            Ok(_) => {}
            Err(e) => {
                assert!(!matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ));
                break;
            }
        }
    }
}

#[test]
fn stop_stays_prompt_while_a_peer_floods_chat() {
    let (mut handle, addr) = start(13);
    let Peer {
        mut reader,
        mut writer,
    } = Peer::connect_ready(addr);

    // Keep reading the echoes so the coordinator's writes never stall.
    thread::spawn(move || {
        while read_message(&mut reader).is_ok() {}
    });
    thread::spawn(move || {
        let chat = WireMessage::Chat {
            text: "spam".into(),
        };
        while write_wire(&mut writer, &chat).is_ok() {}
    });
    thread::sleep(Duration::from_millis(200));

    let started = Instant::now();
    handle.stop();
    assert!(!handle.is_running());
    assert!(
        started.elapsed() < Duration::from_secs(3),
        "stop took {:?}",
        started.elapsed()
    );
}
