//! The per-room state machine: one intent in, a batch of events out.
//!
//! A [`RoomSession`] owns one [`Room`] plus the dealer that feeds it
//! cards, and converts each client intent into an ordered batch of
//! `(recipient, event)` pairs. It performs no I/O — the actor layer
//! feeds it intents and delivers its output — which keeps every game
//! rule unit-testable without a socket in sight.
//!
//! Because cards are hidden information, any event carrying a player
//! list is fanned out per viewer through [`view::redact`], so two
//! recipients of "the same" broadcast may see different card fields.
//!
//! ```text
//!              startGame                 selectStat (tie)
//!   Lobby ───────────────► Playing ◄──────────────────► TieBreak
//!     ▲                       │                             │
//!     │   playerBackToRoom    │ selectStat / attrition      │
//!     └─────────── Ended ◄────┴─────────────────────────────┘
//! ```

use statduel_protocol::{
    ClientIntent, GamePhase, PlayerId, Recipient, RoomCode, ServerEvent,
    SettingsPatch, StatKey,
};

use crate::engine::{self, RoundOutcome};
use crate::membership::{self, LeaveOutcome};
use crate::{view, Dealer, Room, RoomConfig, RoomError};

/// One event addressed to one recipient set.
pub type Outgoing = (Recipient, ServerEvent);

/// A room, its dealer, and the rules binding them.
pub struct RoomSession<D: Dealer> {
    room: Room,
    config: RoomConfig,
    dealer: D,
}

impl<D: Dealer> RoomSession<D> {
    pub fn new(room: Room, config: RoomConfig, dealer: D) -> Self {
        Self { room, config, dealer }
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn code(&self) -> &RoomCode {
        self.room.code()
    }

    // -----------------------------------------------------------------
    // Membership entry points (driven by dedicated actor commands)
    // -----------------------------------------------------------------

    /// Adds a member. The first join is the room's creation and answers
    /// with `roomCreated`; later joins broadcast `playerJoined` and
    /// send the joiner a full snapshot.
    pub fn handle_join(
        &mut self,
        id: PlayerId,
        name: &str,
    ) -> Result<Vec<Outgoing>, RoomError> {
        membership::join(&mut self.room, &self.config, id, name)?;

        if self.room.players.len() == 1 {
            return Ok(vec![(
                Recipient::Player(id),
                ServerEvent::RoomCreated {
                    room_code: self.room.code().clone(),
                    players: self.room.players_snapshot(),
                },
            )]);
        }

        let mut out = self.fanout(|_, players| ServerEvent::PlayerJoined { players });
        out.push((Recipient::Player(id), self.snapshot_for(id)));
        Ok(out)
    }

    /// Reattaches a dropped member and resyncs them. Mid-match, the
    /// resync includes the round context a snapshot alone lacks.
    pub fn handle_reconnect(
        &mut self,
        id: PlayerId,
    ) -> Result<Vec<Outgoing>, RoomError> {
        membership::reconnect(&mut self.room, id)?;

        let mut out =
            self.fanout(|_, players| ServerEvent::PlayerReconnected { players });
        out.push((Recipient::Player(id), self.snapshot_for(id)));
        if self.room.phase.in_match() {
            if let Some(picker) = self.room.current_picker {
                out.push((
                    Recipient::Player(id),
                    ServerEvent::RoundStarted {
                        room_code: self.room.code().clone(),
                        players: view::redact(&self.room, id),
                        current_round: self.room.current_round,
                        current_picker: picker,
                        in_tie_breaker: self.room.phase == GamePhase::TieBreak,
                        game_ended: false,
                    },
                ));
            }
        }
        Ok(out)
    }

    /// Removes a member and repairs the match around the hole they
    /// leave: tie-breaks shrink (and may collapse to a win by
    /// attrition), the picker seat is re-filled, and the game ends
    /// early when too few contenders remain.
    pub fn handle_leave(
        &mut self,
        id: PlayerId,
    ) -> Result<(Vec<Outgoing>, LeaveOutcome), RoomError> {
        let was_picker = self.room.current_picker == Some(id);
        let old_index = self.room.position(id);

        let outcome = membership::leave(&mut self.room, id)?;
        if outcome.room_empty {
            return Ok((Vec::new(), outcome));
        }

        let mut out = self.fanout(|_, players| ServerEvent::PlayerLeft {
            players,
            left_player: Some(outcome.left_player.clone()),
            new_creator_id: outcome.new_creator,
        });

        if !self.room.phase.in_match() {
            return Ok((out, outcome));
        }

        // --- match repair ---------------------------------------------
        self.room.tie_break.retain(|p| *p != id);

        // A tie-break with one contender left resolves by attrition.
        let mut round_completed = false;
        if self.room.phase == GamePhase::TieBreak
            && self.room.tie_break.len() == 1
        {
            let survivor = self.room.tie_break[0];
            let stat = self.room.tie_stat.unwrap_or(StatKey::Hp);
            let (_, game_ended) = engine::award_round_win(&mut self.room, survivor);
            // Treat it as a resolved round: reveal cards, allow nextRound.
            self.room.selected_stat = Some(stat);
            round_completed = true;
            out.extend(self.round_complete(stat, game_ended, false));
        }

        let game_ended = engine::evaluate_end(&mut self.room);
        if game_ended {
            if !round_completed {
                out.extend(
                    self.fanout(|_, players| ServerEvent::GameStateUpdate {
                        room_code: self.room.code().clone(),
                        players,
                        phase: self.room.phase,
                        settings: self.room.settings,
                    }),
                );
            }
            return Ok((out, outcome));
        }

        // The departed picker's seat passes to whoever shifted into (or
        // follows) their slot in join order.
        if was_picker {
            self.room.current_picker =
                engine::picker_from(&self.room, old_index.unwrap_or(0));
            if self.room.selected_stat.is_none() {
                if let Some(picker) = self.room.current_picker {
                    out.extend(self.round_started(picker));
                }
            }
        }

        Ok((out, outcome))
    }

    // -----------------------------------------------------------------
    // Intent dispatch
    // -----------------------------------------------------------------

    /// Routes an in-room intent from a known member. Errors are
    /// reported to the sender only; the room is never mutated on error.
    pub fn handle_intent(
        &mut self,
        sender: PlayerId,
        intent: ClientIntent,
    ) -> Result<Vec<Outgoing>, RoomError> {
        if !self.room.contains(sender) {
            return Err(RoomError::UnknownPlayer(sender));
        }

        match intent {
            ClientIntent::StartGame => self.start_game(sender),
            ClientIntent::SelectStat { stat } => self.select_stat(sender, stat),
            ClientIntent::NextRound => self.next_round(),
            ClientIntent::UpdateSettings { settings } => {
                self.update_settings(sender, settings)
            }
            ClientIntent::TransferCreator { new_creator_id } => {
                self.transfer_creator(sender, new_creator_id)
            }
            ClientIntent::PlayerBackToRoom => self.player_back_to_room(sender),
            // Binding intents are consumed before a room ever sees them.
            ClientIntent::CreateRoom { .. }
            | ClientIntent::JoinRoom { .. }
            | ClientIntent::Reconnect { .. }
            | ClientIntent::LeaveRoom => Err(RoomError::InvalidPhase(
                "already in a room".into(),
            )),
        }
    }

    /// Creator-only: starts the match from the lobby.
    fn start_game(&mut self, sender: PlayerId) -> Result<Vec<Outgoing>, RoomError> {
        if self.room.phase != GamePhase::Lobby {
            return Err(RoomError::InvalidPhase(
                "game already in progress".into(),
            ));
        }
        if self.room.creator_id() != Some(sender) {
            return Err(RoomError::NotAuthorized(sender));
        }
        if self.room.players.len() < 2 {
            return Err(RoomError::NotReady("need at least 2 players".into()));
        }
        if self.room.players.iter().any(|p| !p.is_back_in_room) {
            return Err(RoomError::NotReady(
                "not all players are back in the room".into(),
            ));
        }

        self.room.reset_game_state();
        engine::deal_all(&mut self.room, &mut self.dealer);
        self.room.phase = GamePhase::Playing;
        self.room.current_picker = engine::first_picker(&self.room);
        for player in &mut self.room.players {
            player.is_back_in_room = false;
        }

        tracing::info!(
            room_code = %self.room.code(),
            players = self.room.players.len(),
            "game started"
        );

        let picker = self.room.current_picker.unwrap_or(sender);
        Ok(self.round_started(picker))
    }

    /// Picker-only: locks the round's stat and resolves it.
    fn select_stat(
        &mut self,
        sender: PlayerId,
        stat: StatKey,
    ) -> Result<Vec<Outgoing>, RoomError> {
        if !self.room.phase.in_match() {
            return Err(RoomError::InvalidPhase("no round in progress".into()));
        }
        if self.room.current_picker != Some(sender) {
            return Err(RoomError::NotYourTurn(sender));
        }
        if self.room.selected_stat.is_some() {
            return Err(RoomError::AlreadySelected);
        }

        self.room.selected_stat = Some(stat);
        let outcome = engine::resolve(&mut self.room, stat);

        match outcome {
            RoundOutcome::Won { game_ended, .. } => {
                // selected_stat stays set: cards remain revealed and
                // nextRound is the legal follow-up.
                Ok(self.round_complete(stat, game_ended, false))
            }
            RoundOutcome::Tied { tied } => {
                // Reveal the tied round first, then restart among the
                // tied subset with fresh hidden cards.
                let mut out = self.round_complete(stat, false, true);

                self.room.selected_stat = None;
                engine::deal_to(&mut self.room, &tied, &mut self.dealer);
                let picker = self
                    .room
                    .current_picker
                    .filter(|p| tied.contains(p))
                    .or_else(|| tied.first().copied())
                    .unwrap_or(sender);
                self.room.current_picker = Some(picker);

                out.extend(self.round_started(picker));
                Ok(out)
            }
        }
    }

    /// Advances past a resolved round: new cards for the actives, next
    /// non-winner in join order picks.
    fn next_round(&mut self) -> Result<Vec<Outgoing>, RoomError> {
        if self.room.phase != GamePhase::Playing
            || self.room.selected_stat.is_none()
        {
            return Err(RoomError::InvalidPhase(
                "no resolved round to advance past".into(),
            ));
        }

        self.room.current_round += 1;
        self.room.selected_stat = None;
        engine::deal_active(&mut self.room, &mut self.dealer);

        match engine::next_picker(&self.room) {
            Some(picker) => {
                self.room.current_picker = Some(picker);
                Ok(self.round_started(picker))
            }
            None => {
                // No eligible picker means everyone clinched already;
                // resolution should have ended the game before this.
                engine::evaluate_end(&mut self.room);
                Ok(self.fanout(|_, players| ServerEvent::GameStateUpdate {
                    room_code: self.room.code().clone(),
                    players,
                    phase: self.room.phase,
                    settings: self.room.settings,
                }))
            }
        }
    }

    /// Creator-only, lobby-only: patches and re-clamps the settings.
    fn update_settings(
        &mut self,
        sender: PlayerId,
        patch: SettingsPatch,
    ) -> Result<Vec<Outgoing>, RoomError> {
        if self.room.phase != GamePhase::Lobby {
            return Err(RoomError::InvalidPhase(
                "settings are locked during a match".into(),
            ));
        }
        if self.room.creator_id() != Some(sender) {
            return Err(RoomError::NotAuthorized(sender));
        }
        if patch.rounds_to_win == Some(0) {
            return Err(RoomError::InvalidSettings(
                "roundsToWin must be at least 1".into(),
            ));
        }
        if patch.max_winners == Some(0) {
            return Err(RoomError::InvalidSettings(
                "maxWinners must be at least 1".into(),
            ));
        }

        if let Some(rounds) = patch.rounds_to_win {
            self.room.settings.rounds_to_win = rounds;
        }
        if let Some(max) = patch.max_winners {
            self.room.settings.max_winners = max;
        }
        self.room.clamp_settings();

        Ok(self.fanout(|_, players| ServerEvent::GameStateUpdate {
            room_code: self.room.code().clone(),
            players,
            phase: self.room.phase,
            settings: self.room.settings,
        }))
    }

    /// Creator-only: explicit admin handover.
    fn transfer_creator(
        &mut self,
        sender: PlayerId,
        target: PlayerId,
    ) -> Result<Vec<Outgoing>, RoomError> {
        membership::transfer_admin(&mut self.room, sender, target)?;
        Ok(self.fanout(|_, players| ServerEvent::CreatorTransferred {
            previous_creator_id: sender,
            new_creator_id: target,
            players,
        }))
    }

    /// After a match ends, the first "back to room" resets the game and
    /// reopens the lobby; later ones just flip the sender's flag.
    fn player_back_to_room(
        &mut self,
        sender: PlayerId,
    ) -> Result<Vec<Outgoing>, RoomError> {
        match self.room.phase {
            GamePhase::Ended => {
                self.room.reset_game_state();
                self.room.phase = GamePhase::Lobby;
                membership::mark_back_in_room(&mut self.room, sender)?;

                tracing::info!(
                    room_code = %self.room.code(),
                    "game reset, lobby reopened"
                );

                let mut out = vec![(Recipient::All, ServerEvent::GameReset)];
                out.extend(self.fanout(|_, players| {
                    ServerEvent::GameStateUpdate {
                        room_code: self.room.code().clone(),
                        players,
                        phase: self.room.phase,
                        settings: self.room.settings,
                    }
                }));
                Ok(out)
            }
            GamePhase::Lobby => {
                membership::mark_back_in_room(&mut self.room, sender)?;
                Ok(vec![(
                    Recipient::All,
                    ServerEvent::PlayerStatusUpdate {
                        id: sender,
                        is_back_in_room: true,
                    },
                )])
            }
            GamePhase::Playing | GamePhase::TieBreak => {
                Err(RoomError::InvalidPhase("a match is in progress".into()))
            }
        }
    }

    // -----------------------------------------------------------------
    // Event construction
    // -----------------------------------------------------------------

    /// Builds one copy of a players-carrying event per member, each
    /// with that member's redacted view.
    fn fanout<F>(&self, make: F) -> Vec<Outgoing>
    where
        F: Fn(PlayerId, Vec<statduel_protocol::Player>) -> ServerEvent,
    {
        self.room
            .players
            .iter()
            .map(|p| {
                (
                    Recipient::Player(p.id),
                    make(p.id, view::redact(&self.room, p.id)),
                )
            })
            .collect()
    }

    fn round_started(&self, picker: PlayerId) -> Vec<Outgoing> {
        self.fanout(|_, players| ServerEvent::RoundStarted {
            room_code: self.room.code().clone(),
            players,
            current_round: self.room.current_round,
            current_picker: picker,
            in_tie_breaker: self.room.phase == GamePhase::TieBreak,
            game_ended: false,
        })
    }

    fn round_complete(
        &self,
        stat: StatKey,
        game_ended: bool,
        in_tie_breaker: bool,
    ) -> Vec<Outgoing> {
        self.fanout(|_, players| ServerEvent::RoundComplete {
            game_winners: self.room.winners.clone(),
            stat,
            players,
            game_ended,
            in_tie_breaker,
        })
    }

    fn snapshot_for(&self, viewer: PlayerId) -> ServerEvent {
        ServerEvent::GameStateUpdate {
            room_code: self.room.code().clone(),
            players: view::redact(&self.room, viewer),
            phase: self.room.phase,
            settings: self.room.settings,
        }
    }
}
