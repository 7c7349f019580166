// End-to-end integration tests for networked matches.
//
// Each test starts a real coordinator, connects real `Endpoint`s (through
// `TestGameClient`) and checks what the endpoints' owners would observe:
// match start, alternating turns, game over, pauses and teardown notices.

use std::thread;
use std::time::{Duration, Instant};

use dungeon_duel_game::{Card, CardVariant, GameEvent, MatchRules};
use dungeon_duel_net::{CoordinatorConfig, CoordinatorHandle, EndpointError, start_coordinator};
use multiplayer_tests::TestGameClient;

/// Upper bound on a whole match; real matches finish in well under a second.
const MATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Start a coordinator on a random port, connect two clients in order and
/// wait until both have their opening state. The first client moves first.
fn start_test_match(seed: u64) -> (CoordinatorHandle, TestGameClient, TestGameClient) {
    let config = CoordinatorConfig {
        port: 0,
        seed: Some(seed),
        rules: MatchRules::default(),
        poll_interval: Duration::from_millis(50),
        ..CoordinatorConfig::default()
    };
    let (handle, addr) = start_coordinator(config).unwrap();

    let mut first = TestGameClient::connect(addr);
    first.poll_until("waiting notice", |c| c.saw_action("Waiting for an opponent"));
    let mut second = TestGameClient::connect(addr);

    first.poll_until_started();
    second.poll_until_started();
    first.poll_until("opening turn", |c| c.your_turn);
    (handle, first, second)
}

// ---------------------------------------------------------------------------
// Test scenarios
// ---------------------------------------------------------------------------

#[test]
fn opening_state_is_symmetric() {
    let (mut handle, first, mut second) = start_test_match(42);
    second.pump();

    assert_eq!(first.hand.len(), 7);
    assert_eq!(second.hand.len(), 7);
    assert!(first.your_turn);
    assert!(!second.your_turn);
    assert!(first.saw_action("You are Player 1"));
    assert!(second.saw_action("You are Player 2"));
    assert!(second.events.contains(&GameEvent::OpponentHandCountUpdated { count: 7 }));
    let (first_own, first_foe) = first.healths().unwrap();
    assert_eq!(second.healths(), Some((first_foe, first_own)));

    handle.stop();
}

#[test]
fn full_match_reaches_game_over() {
    let (mut handle, mut first, mut second) = start_test_match(2024);

    let start = Instant::now();
    let mut plays = 0;
    while first.outcome.is_none() || second.outcome.is_none() {
        assert!(start.elapsed() < MATCH_TIMEOUT, "match did not finish after {plays} plays");
        for client in [&mut first, &mut second] {
            client.pump();
            if client.your_turn && client.outcome.is_none() {
                client.play_aggressively().unwrap();
                plays += 1;
            }
        }
        thread::sleep(Duration::from_millis(5));
    }

    // Exactly one side wins, and both agree on who.
    assert_ne!(first.outcome, second.outcome);
    let winner_summary = if first.outcome == Some(true) {
        "Player 1 wins"
    } else {
        "Player 2 wins"
    };
    assert!(first.saw_action(winner_summary));
    assert!(second.saw_action(winner_summary));

    // The opponent's plays were shown to each side.
    assert!(
        second
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::CardPlayed { by_opponent: true, .. }))
    );

    // Nothing more can be played.
    let card = first.hand.first().cloned();
    if let Some(card) = card {
        first.play(card).unwrap();
        first.poll_until("rejection", |c| c.saw_action("Rejected: match is over"));
    }

    handle.stop();
}

#[test]
fn turns_alternate_strictly() {
    let (mut handle, mut first, mut second) = start_test_match(99);

    first.play_aggressively().unwrap();
    second.poll_until("second's turn", |c| c.your_turn);
    first.pump();
    assert!(!first.your_turn);

    // Playing again out of turn is refused and changes nothing.
    let card = first.hand[0].clone();
    first.play(card).unwrap();
    first.poll_until("rejection", |c| c.saw_action("Rejected: not your turn"));
    second.pump();
    assert!(second.your_turn);

    handle.stop();
}

#[test]
fn unknown_card_is_rejected() {
    let (mut handle, mut first, _second) = start_test_match(5);

    first
        .play(Card::new(CardVariant::Fireball, "Not In My Hand"))
        .unwrap();
    first.poll_until("rejection", |c| c.saw_action("Rejected: card not found"));
    assert!(first.your_turn);

    handle.stop();
}

#[test]
fn chat_reaches_both_sides() {
    let (mut handle, mut first, mut second) = start_test_match(8);

    second.chat("good luck").unwrap();
    first.poll_until("chat", |c| c.saw_action("Player 2: good luck"));
    second.poll_until("chat echo", |c| c.saw_action("Player 2: good luck"));

    handle.stop();
}

#[test]
fn leaving_mid_match_pauses_the_other_side() {
    let (mut handle, mut first, mut second) = start_test_match(13);

    second.stop();
    first.poll_until("pause", |c| c.saw_status("Match paused"));
    assert!(first.is_connected());

    let card = first.hand[0].clone();
    first.play(card).unwrap();
    first.poll_until("rejection", |c| c.saw_action("Rejected: match paused"));

    handle.stop();
}

#[test]
fn stop_twice_reports_one_disconnect() {
    let (mut handle, mut first, _second) = start_test_match(21);

    first.stop();
    first.stop();
    first.pump();
    assert_eq!(first.disconnect_notices, 1);
    assert!(!first.is_connected());
    assert!(matches!(
        first.chat("anyone?"),
        Err(EndpointError::NotConnected)
    ));

    handle.stop();
}

#[test]
fn coordinator_shutdown_disconnects_endpoints() {
    let (mut handle, mut first, mut second) = start_test_match(34);

    handle.stop();
    first.poll_until("disconnect", |c| c.disconnect_notices == 1);
    second.poll_until("disconnect", |c| c.disconnect_notices == 1);
    assert!(first.saw_status("Disconnected"));

    // Stopping afterwards does not produce a second notice.
    first.stop();
    first.pump();
    assert_eq!(first.disconnect_notices, 1);
}
