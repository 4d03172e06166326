//! Error types for the session layer.

use statduel_protocol::{PlayerId, RoomCode};

/// Errors that can occur during session management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists for the given player.
    #[error("session not found for player {0}")]
    NotFound(PlayerId),

    /// The reconnection token doesn't match what the server issued for
    /// this player. Could be a stale token, a typo, or a guess.
    #[error("invalid reconnection token")]
    InvalidToken,

    /// The token is real but belongs to a different room than the one
    /// the client claims to be resuming into.
    #[error("token does not belong to room {0}")]
    RoomMismatch(RoomCode),

    /// The session's reconnection grace period has elapsed.
    #[error("session expired for player {0}")]
    SessionExpired(PlayerId),

    /// The player already has an active (Connected) session.
    /// A player can only have one session at a time.
    #[error("player {0} already has an active session")]
    AlreadyConnected(PlayerId),
}
