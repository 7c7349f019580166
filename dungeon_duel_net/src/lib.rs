// dungeon_duel_net: networked play for Dungeon Duel.
//
// Module overview:
// - `server.rs`:  Coordinator startup, listener and reader threads, and the
//                 main event loop that owns the `Session`.
// - `session.rs`: Endpoint seating, the ready handshake, the authoritative
//                 match and per-endpoint fan-out.
// - `client.rs`:  `Endpoint`, one side's connection to a coordinator, with
//                 an event channel for everything it receives.
// - `view.rs`:    Translates wire messages into `dungeon_duel_game`
//                 presentation events.
// - `error.rs`:   `CoordinatorError` and `EndpointError`.
//
// The `duel` binary (`main.rs`) wraps all of this, plus the solo scheduler
// from `dungeon_duel_game`, in a line-oriented terminal UI.
//
// Plain `std::net` with OS threads and `mpsc` channels throughout; there is
// no async runtime.

pub mod client;
pub mod error;
pub mod server;
pub mod session;
pub mod view;

pub use client::{Endpoint, EndpointConfig, EndpointEvent, EndpointSender};
pub use error::{CoordinatorError, EndpointError};
pub use server::{CoordinatorConfig, CoordinatorHandle, start_coordinator};
pub use view::MatchView;
