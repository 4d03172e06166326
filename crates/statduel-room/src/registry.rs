//! Room registry: creates, tracks, and routes players to rooms.

use std::collections::HashMap;

use rand::Rng;
use statduel_protocol::{ClientIntent, GameSettings, PlayerId, RoomCode};

use crate::actor::{spawn_room, LeaveAck, PlayerSender, RoomHandle, RoomInfo};
use crate::{Dealer, Room, RoomConfig, RoomError};

/// Characters used in generated room codes. Ambiguous glyphs (0/O, 1/I)
/// are excluded because players read these codes off someone's screen.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of generated room codes.
const CODE_LEN: usize = 4;

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Owns all active rooms and tracks which player is in which room.
///
/// This is the entry point for room operations from higher layers
/// (connection handler, server accept loop). The dealer is cloned into
/// each room so rooms stay independent.
pub struct RoomRegistry<D: Dealer + Clone> {
    /// Active rooms, keyed by their join code.
    rooms: HashMap<RoomCode, RoomHandle>,

    /// Maps each player to the room they're currently in.
    /// A player can be in at most ONE room at a time (key invariant).
    player_rooms: HashMap<PlayerId, RoomCode>,

    config: RoomConfig,
    dealer: D,
}

impl<D: Dealer + Clone> RoomRegistry<D> {
    pub fn new(config: RoomConfig, dealer: D) -> Self {
        Self {
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
            config,
            dealer,
        }
    }

    /// Creates a new empty room and returns its join code.
    ///
    /// Settings are validated here, before a task is spawned; the
    /// per-membership clamp happens inside the room as players join.
    pub fn create_room(
        &mut self,
        settings: GameSettings,
    ) -> Result<RoomCode, RoomError> {
        if settings.rounds_to_win == 0 {
            return Err(RoomError::InvalidSettings(
                "roundsToWin must be at least 1".into(),
            ));
        }
        if settings.max_winners == 0 {
            return Err(RoomError::InvalidSettings(
                "maxWinners must be at least 1".into(),
            ));
        }

        let code = self.generate_code();
        let room = Room::new(code.clone(), settings);
        let handle = spawn_room(
            room,
            self.config,
            self.dealer.clone(),
            DEFAULT_CHANNEL_SIZE,
        );
        self.rooms.insert(code.clone(), handle);
        tracing::info!(room_code = %code, "room created");
        Ok(code)
    }

    fn generate_code(&self) -> RoomCode {
        let mut rng = rand::rng();
        loop {
            let code: String = (0..CODE_LEN)
                .map(|_| {
                    CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]
                        as char
                })
                .collect();
            let code = RoomCode::new(code);
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }

    /// Adds a player to a room.
    ///
    /// Enforces the "one room at a time" invariant.
    pub async fn join_room(
        &mut self,
        player_id: PlayerId,
        code: &RoomCode,
        name: &str,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        if let Some(current) = self.player_rooms.get(&player_id) {
            return Err(RoomError::InvalidPhase(format!(
                "already in room {current}"
            )));
        }

        let handle = self
            .rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;

        handle.join(player_id, name, sender).await?;
        self.player_rooms.insert(player_id, code.clone());
        Ok(())
    }

    /// Reattaches a player's identity to a new outbound channel after
    /// a transport drop within the grace period.
    pub async fn reconnect_room(
        &mut self,
        player_id: PlayerId,
        code: &RoomCode,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;

        handle.reconnect(player_id, sender).await?;
        self.player_rooms.insert(player_id, code.clone());
        Ok(())
    }

    /// Removes a player from their current room. Empty rooms are
    /// dropped from the registry (their actor has already stopped).
    pub async fn leave_room(
        &mut self,
        player_id: PlayerId,
    ) -> Result<LeaveAck, RoomError> {
        let code = self
            .player_rooms
            .remove(&player_id)
            .ok_or(RoomError::UnknownPlayer(player_id))?;

        let Some(handle) = self.rooms.get(&code) else {
            return Ok(LeaveAck { room_empty: true });
        };
        let ack = handle.leave(player_id).await?;

        if ack.room_empty {
            self.rooms.remove(&code);
            tracing::info!(room_code = %code, "empty room removed");
        }
        Ok(ack)
    }

    /// Drops a player's outbound channel, keeping their seat. Their
    /// membership survives until a reconnect or an expiry-driven leave.
    pub async fn detach(&self, player_id: PlayerId) -> Result<(), RoomError> {
        let code = self
            .player_rooms
            .get(&player_id)
            .ok_or(RoomError::UnknownPlayer(player_id))?;
        let handle = self
            .rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        handle.detach(player_id).await
    }

    /// Routes a game intent from a player to their current room.
    pub async fn route_intent(
        &self,
        player_id: PlayerId,
        intent: ClientIntent,
    ) -> Result<(), RoomError> {
        let code = self
            .player_rooms
            .get(&player_id)
            .ok_or(RoomError::UnknownPlayer(player_id))?;
        let handle = self
            .rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        handle.send_intent(player_id, intent).await
    }

    /// Returns info about a specific room.
    pub async fn room_info(
        &self,
        code: &RoomCode,
    ) -> Result<RoomInfo, RoomError> {
        let handle = self
            .rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        handle.info().await
    }

    /// Shuts down a room and removes all its players from the index.
    pub async fn destroy_room(
        &mut self,
        code: &RoomCode,
    ) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;

        let _ = handle.shutdown().await;
        self.player_rooms.retain(|_, c| c != code);

        tracing::info!(room_code = %code, "room destroyed");
        Ok(())
    }

    /// Returns the room code a player is currently in, if any.
    pub fn player_room(&self, player_id: PlayerId) -> Option<&RoomCode> {
        self.player_rooms.get(&player_id)
    }

    /// Returns the number of active rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
