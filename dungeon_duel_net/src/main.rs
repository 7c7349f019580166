// CLI entry point for Dungeon Duel.
//
// Three modes sharing one line-oriented terminal UI:
// - `serve` runs a standalone coordinator that two `connect` clients join.
// - `connect` joins a coordinator as one endpoint.
// - `solo` plays against the simulated opponent, no network involved.
//
// Input is read on a helper thread and handed to the main loop over a
// channel; match events are drained from the endpoint (or solo match) on the
// same loop, so the UI code only ever runs on the main thread.
//
// Usage:
//   duel serve   [--host <HOST>] [--port <PORT>] [--seed <N>]
//   duel connect [--host <HOST>] [--port <PORT>]
//   duel solo    [--seed <N>]
//
// Logging goes through `env_logger`; set RUST_LOG to change the level
// (default: info).

use std::error::Error;
use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use dungeon_duel_game::{Card, GameEventListener, SoloConfig, SoloMatch};
use dungeon_duel_net::{
    CoordinatorConfig, Endpoint, EndpointConfig, EndpointEvent, MatchView, start_coordinator,
};
use dungeon_duel_protocol::DEFAULT_PORT;

const HELP: &str = "\
duel - two-player turn-based card battle

USAGE:
  duel <COMMAND> [OPTIONS]

COMMANDS:
  serve                 Host a match for two players
  connect               Join a hosted match
  solo                  Play against the computer (default)

OPTIONS:
  -h, --help            Prints help information
  --host <host>         Address to bind or connect to (default: 127.0.0.1)
  --port <port>         TCP port (default: 12345)
  --seed <n>            Fix the match seed (serve, solo)

IN GAME:
  <n>                   Play card number n from your hand
  hand                  Show your hand again
  say <text>            Chat with your opponent (connect)
  quit                  Leave
";

const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, PartialEq)]
enum Command {
    Serve {
        host: String,
        port: u16,
        seed: Option<u64>,
    },
    Connect {
        host: String,
        port: u16,
    },
    Solo {
        seed: Option<u64>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let command = match parse_args() {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {e}.");
            eprintln!("Run `duel --help` for usage.");
            std::process::exit(1);
        }
    };

    let result = match command {
        Command::Serve { host, port, seed } => run_serve(host, port, seed),
        Command::Connect { host, port } => run_connect(&host, port),
        Command::Solo { seed } => run_solo(seed),
    };
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn parse_args() -> Result<Command, pico_args::Error> {
    let mut pargs = pico_args::Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let subcommand = pargs.subcommand()?;
    let host: String = pargs
        .opt_value_from_str("--host")?
        .unwrap_or_else(|| "127.0.0.1".into());
    let port: u16 = pargs.opt_value_from_str("--port")?.unwrap_or(DEFAULT_PORT);
    let seed: Option<u64> = pargs.opt_value_from_str("--seed")?;

    let command = match subcommand.as_deref() {
        Some("serve") => Command::Serve { host, port, seed },
        Some("connect") => Command::Connect { host, port },
        Some("solo") | None => Command::Solo { seed },
        Some(other) => {
            return Err(pico_args::Error::ArgumentParsingFailed {
                cause: format!("unknown command '{other}'"),
            });
        }
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        eprintln!("Warning: unused arguments left: {remaining:?}.");
    }

    Ok(command)
}

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

fn run_serve(host: String, port: u16, seed: Option<u64>) -> Result<(), Box<dyn Error>> {
    let config = CoordinatorConfig {
        host,
        port,
        seed,
        ..CoordinatorConfig::default()
    };
    let (mut handle, addr) = start_coordinator(config)?;
    println!("Coordinator listening on {addr}");
    println!("Type 'quit' to stop.");

    let input = spawn_input();
    loop {
        match input.recv() {
            Ok(line) if parse_input(&line) == Some(Input::Quit) => break,
            Ok(_) => {}
            // No terminal attached: keep serving until the process is killed.
            Err(_) => {
                while handle.is_running() {
                    thread::sleep(TICK * 10);
                }
                break;
            }
        }
    }

    println!("Shutting down...");
    handle.stop();
    Ok(())
}

fn run_connect(host: &str, port: u16) -> Result<(), Box<dyn Error>> {
    let mut endpoint = Endpoint::connect(format!("{host}:{port}"), &EndpointConfig::default())?;
    let mut view = MatchView::new();
    let mut ui = Terminal::default();
    let input = spawn_input();

    'session: loop {
        if let Some(event) = endpoint.recv_timeout(TICK) {
            let closed = matches!(event, EndpointEvent::Disconnected { .. });
            for game_event in view.apply_event(&event) {
                game_event.dispatch(&mut ui);
            }
            if closed || ui.finished {
                break 'session;
            }
        }
        loop {
            let line = match input.try_recv() {
                Ok(line) => line,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break 'session,
            };
            let sent = match parse_input(&line) {
                Some(Input::Quit) => break 'session,
                Some(Input::Hand) => {
                    ui.print_hand();
                    Ok(())
                }
                Some(Input::Play(n)) => match ui.card(n) {
                    Some(card) => endpoint.play_card(card),
                    None => {
                        println!("You have no card {n}.");
                        Ok(())
                    }
                },
                Some(Input::Chat(text)) => endpoint.chat(text),
                None => Ok(()),
            };
            if let Err(e) = sent {
                println!("Could not send: {e}");
            }
        }
    }

    endpoint.stop();
    for event in endpoint.poll() {
        for game_event in view.apply_event(&event) {
            game_event.dispatch(&mut ui);
        }
    }
    Ok(())
}

fn run_solo(seed: Option<u64>) -> Result<(), Box<dyn Error>> {
    let mut config = SoloConfig::default();
    if let Some(seed) = seed {
        config.seed = seed;
    }
    let solo = SoloMatch::start(config);
    let mut ui = Terminal::default();
    let input = spawn_input();

    'game: loop {
        while let Some(event) = solo.recv_timeout(TICK) {
            event.dispatch(&mut ui);
            if ui.finished {
                break 'game;
            }
        }
        loop {
            let line = match input.try_recv() {
                Ok(line) => line,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break 'game,
            };
            match parse_input(&line) {
                Some(Input::Quit) => break 'game,
                Some(Input::Hand) => ui.print_hand(),
                Some(Input::Play(n)) => match ui.card(n) {
                    // Refusals arrive as events; nothing to print here.
                    Some(card) => {
                        let _ = solo.play_card(&card);
                    }
                    None => println!("You have no card {n}."),
                },
                Some(Input::Chat(_)) => println!("Nobody is listening."),
                None => {}
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Terminal UI
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
enum Input {
    Play(usize),
    Chat(String),
    Hand,
    Quit,
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line {
        "q" | "quit" | "exit" => return Some(Input::Quit),
        "h" | "hand" => return Some(Input::Hand),
        _ => {}
    }
    if let Ok(n) = line.parse::<usize>() {
        return Some(Input::Play(n));
    }
    let text = line.strip_prefix("say ").unwrap_or(line).trim();
    Some(Input::Chat(text.to_string()))
}

/// Stdin lines, read on a helper thread. The channel closes at EOF.
fn spawn_input() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new().name("duel-input".into()).spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    if let Err(e) = spawned {
        log::error!("could not read input: {e}");
    }
    rx
}

#[derive(Default)]
struct Terminal {
    hand: Vec<Card>,
    finished: bool,
}

impl Terminal {
    /// 1-based card lookup.
    fn card(&self, n: usize) -> Option<Card> {
        n.checked_sub(1).and_then(|i| self.hand.get(i)).cloned()
    }

    fn print_hand(&self) {
        if self.hand.is_empty() {
            println!("  (your hand is empty)");
        }
        for (i, card) in self.hand.iter().enumerate() {
            println!("  {:>2}. {card} [{}]", i + 1, card.magnitude);
        }
    }
}

impl GameEventListener for Terminal {
    fn on_health_updated(
        &mut self,
        self_health: u32,
        self_shield: u32,
        opponent_health: u32,
        opponent_shield: u32,
    ) {
        println!(
            "  You: {self_health} HP, {self_shield} shield | Opponent: {opponent_health} HP, {opponent_shield} shield"
        );
    }

    fn on_hand_updated(&mut self, hand: &[Card]) {
        self.hand = hand.to_vec();
        self.print_hand();
    }

    fn on_opponent_hand_count_updated(&mut self, count: usize) {
        println!("  Opponent holds {count} cards.");
    }

    fn on_turn_changed(&mut self, is_self_turn: bool) {
        if is_self_turn {
            println!(">> Your turn. Play a card by number.");
        } else {
            println!(">> Opponent's turn.");
        }
    }

    fn on_status_updated(&mut self, status: &str) {
        println!("[{status}]");
    }

    fn on_action_occurred(&mut self, description: &str) {
        println!("* {description}");
    }

    fn on_game_over(&mut self, did_self_win: bool, self_health: u32, opponent_health: u32) {
        self.finished = true;
        let verdict = if did_self_win { "You win!" } else { "You lose." };
        println!("=== {verdict} (you {self_health} HP, opponent {opponent_health} HP) ===");
    }

    fn on_card_played(&mut self, card: &Card, by_opponent: bool) {
        if by_opponent {
            println!("Opponent played {card}.");
        } else {
            println!("You played {card}.");
        }
    }
}
