//! Error types for the room layer.
//!
//! Every variant maps to a request that was rejected *before* any
//! mutation happened. Room errors are reported only to the connection
//! that caused them; they are never broadcast and never fatal to the
//! room itself — a room only dies when its last player leaves.

use statduel_protocol::{PlayerId, RoomCode};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No live room with this code.
    #[error("Room not found")]
    NotFound(RoomCode),

    /// A non-creator attempted a creator-only action
    /// (start, settings, admin transfer).
    #[error("only the room creator can do that")]
    NotAuthorized(PlayerId),

    /// Someone other than the current picker tried to pick a stat.
    #[error("it is not your turn to pick")]
    NotYourTurn(PlayerId),

    /// A stat was already selected for the current round.
    #[error("a stat was already selected this round")]
    AlreadySelected,

    /// Rejected settings (e.g. `roundsToWin` below 1) at room creation.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The request is not valid in the room's current phase.
    #[error("that action is not valid right now: {0}")]
    InvalidPhase(String),

    /// The lobby cannot start a match yet (too few players, or someone
    /// has not signalled they are back in the room).
    #[error("not ready to start: {0}")]
    NotReady(String),

    /// The room is at its player cap.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The referenced player is not a member of this room.
    #[error("player {0} is not in this room")]
    UnknownPlayer(PlayerId),

    /// The room's command channel is closed (actor gone).
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}
