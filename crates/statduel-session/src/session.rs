//! Session types: the server's record of a connected player.
//!
//! A session tracks who the player is, which room they are bound to,
//! what connection state they're in, and the secret token that lets
//! them resume after a transport drop.

use std::time::Instant;

use statduel_protocol::{PlayerId, RoomCode};

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long (in seconds) a disconnected player has to reconnect
    /// before their session is permanently expired and their seat in
    /// the room is given up.
    ///
    /// Default: 30 seconds. Set to 0 to disable reconnection entirely.
    pub reconnect_grace_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace_secs: 30,
        }
    }
}

/// The current state of a player's session.
///
/// ```text
///   Connected ──(disconnect)──→ Disconnected ──(timeout)──→ Expired
///       ↑                            │
///       └────────(reconnect)─────────┘
/// ```
///
/// `Instant` is the monotonic clock — unaffected by system clock
/// changes, which matters for measuring the grace period.
#[derive(Debug, Clone)]
pub enum SessionState {
    /// Player is actively connected.
    Connected,

    /// Player disconnected at the given instant. They have until
    /// `since + grace_period` to reconnect.
    Disconnected { since: Instant },

    /// Grace period elapsed; the session is dead and will be cleaned
    /// up after the room has been told.
    Expired,
}

/// A single player's session on the server.
///
/// Created when a player creates or joins a room; destroyed when they
/// leave for good or their grace period runs out.
#[derive(Debug, Clone)]
pub struct Session {
    /// Which player this session belongs to.
    pub player_id: PlayerId,

    /// The room this identity is bound to. A player is in at most one
    /// room at a time, and a reconnect must name the same room.
    pub room_code: RoomCode,

    /// Current lifecycle state.
    pub state: SessionState,

    /// A secret the client can present to resume this identity after a
    /// drop, instead of joining as a new player. 32 hex characters
    /// (128 bits), sent once in the `sessionGranted` event.
    pub reconnect_token: String,
}
