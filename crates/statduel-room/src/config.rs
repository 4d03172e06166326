//! Room-level configuration (server policy, not match settings).
//!
//! Match settings (`roundsToWin`, `maxWinners`) live in the protocol
//! crate because the creator edits them over the wire. `RoomConfig` is
//! the operator-facing side: hard limits the server enforces.

/// Operator configuration applied to every room.
#[derive(Debug, Clone, Copy)]
pub struct RoomConfig {
    /// Hard cap on members per room. Joins beyond this are rejected
    /// with `RoomFull`.
    pub max_players: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self { max_players: 8 }
    }
}
