// Identifier types for the wire protocol.
//
// `EndpointId` is assigned by the coordinator to every accepted connection
// and never reused within one coordinator run. It is distinct from the seat a
// connection occupies (`dungeon_duel_game::Side`): the first accepted
// connection sits on side A, the second on side B, but a reconnect after a
// drop gets a new id for the freed seat.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default TCP port for the coordinator.
pub const DEFAULT_PORT: u16 = 12345;

/// Coordinator-assigned connection id (compact u32, monotonic).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EndpointId(pub u32);

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "endpoint#{}", self.0)
    }
}
