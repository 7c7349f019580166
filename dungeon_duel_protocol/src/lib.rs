// dungeon_duel_protocol: wire protocol between duel endpoints and the
// session coordinator.
//
// Shared by the coordinator and the endpoint in `dungeon_duel_net`. Payload
// types (cards, combatants, sides) come straight from `dungeon_duel_game`, so
// a state update carries exactly what the rules engine holds.
//
// Module overview:
// - `types.rs`:    `EndpointId` and the default coordinator port.
// - `message.rs`:  The `WireMessage` envelope and its JSON encode/decode.
// - `framing.rs`:  Length-delimited framing over any `Read`/`Write` stream,
//                  plus the timeout-tolerant `FrameReader`.
//
// No async runtime: framing works on blocking `std::net::TcpStream`s (with or
// without a read timeout) and on in-memory buffers in tests.

pub mod framing;
pub mod message;
pub mod types;

pub use framing::{FrameReader, MAX_MESSAGE_SIZE, read_message, write_message, write_wire};
pub use message::{StateUpdate, WireMessage, decode, encode};
pub use types::{DEFAULT_PORT, EndpointId};
