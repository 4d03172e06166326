//! The session manager: tracks every player identity the server has
//! handed out, and whether its owner is currently connected.
//!
//! # Concurrency note
//!
//! `SessionManager` is NOT thread-safe by itself — it uses a plain
//! `HashMap`. This is intentional: the manager is owned by the server
//! and accessed behind a mutex at a higher level. Keeping it simple
//! here avoids hidden locking overhead.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::Rng;
use statduel_protocol::{PlayerId, RoomCode};

use crate::{Session, SessionConfig, SessionError, SessionState};

/// Manages all active player sessions.
///
/// ## Lifecycle
///
/// ```text
/// create() ──→ disconnect() ──→ reconnect()
///     │              │               │
///     │              ▼               │
///     │         expire_stale()       │
///     ▼              │               ▼
/// [Connected]        ▼          [Connected]
///              [Disconnected]
///                    │ (after grace period)
///                    ▼
///                [Expired] ──→ cleanup_expired()
/// ```
pub struct SessionManager {
    /// All sessions, keyed by player ID — one session per player.
    sessions: HashMap<PlayerId, Session>,

    /// Index from reconnection tokens to player IDs, kept in sync
    /// with `sessions` so a reconnect never scans.
    tokens: HashMap<String, PlayerId>,

    config: SessionConfig,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            tokens: HashMap::new(),
            config,
        }
    }

    /// Creates a session binding a player to a room, with a fresh
    /// reconnection token.
    ///
    /// # Errors
    /// [`SessionError::AlreadyConnected`] if the player already has an
    /// active session.
    pub fn create(
        &mut self,
        player_id: PlayerId,
        room_code: RoomCode,
    ) -> Result<&Session, SessionError> {
        if let Some(existing) = self.sessions.get(&player_id) {
            if matches!(existing.state, SessionState::Connected) {
                return Err(SessionError::AlreadyConnected(player_id));
            }
            // Stale disconnected/expired session: drop its old token
            // before issuing a new one.
            self.tokens.remove(&existing.reconnect_token);
        }

        let token = generate_token();
        let session = Session {
            player_id,
            room_code,
            state: SessionState::Connected,
            reconnect_token: token.clone(),
        };

        self.tokens.insert(token, player_id);
        self.sessions.insert(player_id, session);

        tracing::info!(%player_id, "session created");

        Ok(self.sessions.get(&player_id).expect("just inserted"))
    }

    /// Marks a player as disconnected, starting the grace period.
    /// Their seat in the room is kept until the period runs out.
    pub fn disconnect(
        &mut self,
        player_id: PlayerId,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;

        session.state = SessionState::Disconnected {
            since: Instant::now(),
        };

        tracing::info!(%player_id, "player disconnected, grace period started");
        Ok(())
    }

    /// Resumes a dropped session from a `reconnect` intent.
    ///
    /// All three claims must line up: the token must be one the server
    /// issued, it must belong to the claimed player, and the session
    /// must be bound to the claimed room.
    ///
    /// # Errors
    /// - [`SessionError::InvalidToken`] — token unknown or not this
    ///   player's
    /// - [`SessionError::RoomMismatch`] — token is for another room
    /// - [`SessionError::SessionExpired`] — grace period elapsed
    pub fn reconnect(
        &mut self,
        player_id: PlayerId,
        room_code: &RoomCode,
        token: &str,
    ) -> Result<&Session, SessionError> {
        let owner = self
            .tokens
            .get(token)
            .copied()
            .ok_or(SessionError::InvalidToken)?;
        if owner != player_id {
            return Err(SessionError::InvalidToken);
        }

        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::InvalidToken)?;
        if session.room_code != *room_code {
            return Err(SessionError::RoomMismatch(room_code.clone()));
        }

        match &session.state {
            SessionState::Disconnected { since } => {
                let grace =
                    Duration::from_secs(self.config.reconnect_grace_secs);
                if since.elapsed() > grace {
                    session.state = SessionState::Expired;
                    return Err(SessionError::SessionExpired(player_id));
                }
                session.state = SessionState::Connected;
                tracing::info!(%player_id, "player reconnected");
                Ok(self.sessions.get(&player_id).expect("just modified"))
            }
            SessionState::Connected => {
                Err(SessionError::AlreadyConnected(player_id))
            }
            SessionState::Expired => {
                Err(SessionError::SessionExpired(player_id))
            }
        }
    }

    /// Destroys a session immediately (explicit leave — no grace).
    pub fn remove(&mut self, player_id: PlayerId) {
        if let Some(session) = self.sessions.remove(&player_id) {
            self.tokens.remove(&session.reconnect_token);
            tracing::info!(%player_id, "session removed");
        }
    }

    /// Scans all sessions and expires any past the grace period.
    ///
    /// Call periodically from a sweeper task. Returns the expired
    /// identities with their room bindings so the caller can give up
    /// each seat before [`cleanup_expired`](Self::cleanup_expired)
    /// deletes the data.
    pub fn expire_stale(&mut self) -> Vec<(PlayerId, RoomCode)> {
        let grace = Duration::from_secs(self.config.reconnect_grace_secs);
        let mut expired = Vec::new();

        for session in self.sessions.values_mut() {
            if let SessionState::Disconnected { since } = &session.state {
                if since.elapsed() > grace {
                    session.state = SessionState::Expired;
                    expired
                        .push((session.player_id, session.room_code.clone()));
                    tracing::info!(
                        player_id = %session.player_id,
                        room_code = %session.room_code,
                        "session expired (grace period elapsed)"
                    );
                }
            }
        }

        expired
    }

    /// Removes all expired sessions, freeing the maps. Separate from
    /// `expire_stale` so higher layers can react to each expiry first.
    pub fn cleanup_expired(&mut self) {
        self.sessions.retain(|_, session| {
            if matches!(session.state, SessionState::Expired) {
                self.tokens.remove(&session.reconnect_token);
                false
            } else {
                true
            }
        });
    }

    /// Looks up a session by player ID.
    pub fn get(&self, player_id: &PlayerId) -> Option<&Session> {
        self.sessions.get(player_id)
    }

    /// The room a player's session is bound to, if any.
    pub fn room_of(&self, player_id: &PlayerId) -> Option<&RoomCode> {
        self.sessions.get(player_id).map(|s| &s.room_code)
    }

    /// Returns the number of sessions (any state).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Generates a random 32-character hex string (128 bits of entropy) —
/// enough that guessing a live token is computationally infeasible.
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================
