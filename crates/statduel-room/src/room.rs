//! The `Room` data model: players, settings, and round-scoped state.
//!
//! `Room` is plain data plus invariant-preserving accessors. All
//! mutation goes through the membership module (joins, leaves, admin)
//! and the round engine (dealing, resolution, rotation); the session
//! state machine composes both. Nothing here does I/O.

use statduel_protocol::{
    GamePhase, GameSettings, Player, PlayerId, RoomCode, StatKey,
};

/// One game instance: an ordered player list, match settings, and the
/// state of the current round.
///
/// `players` is kept in join order; that ordering is load-bearing
/// (creator succession and picker rotation both walk it).
#[derive(Debug, Clone)]
pub struct Room {
    code: RoomCode,
    pub players: Vec<Player>,
    pub settings: GameSettings,
    pub phase: GamePhase,
    /// 1-based round counter; meaningful only while in a match.
    pub current_round: u32,
    /// The player whose turn it is to pick a stat. `None` in the lobby.
    pub current_picker: Option<PlayerId>,
    /// The stat chosen this round. Set by `selectStat`, cleared when
    /// the next round (or a tie-break cycle) starts.
    pub selected_stat: Option<StatKey>,
    /// Players who clinched, in clinch order (index 0 = gold).
    /// Append-only during a match; entries survive the player leaving.
    pub winners: Vec<PlayerId>,
    /// The subset currently contesting a tie. Join-ordered; empty
    /// outside `TieBreak`.
    pub tie_break: Vec<PlayerId>,
    /// The stat that produced the pending tie. Kept so a tie-break that
    /// collapses by attrition (everyone else left) can still report
    /// which stat the round was about.
    pub tie_stat: Option<StatKey>,
}

impl Room {
    /// Creates an empty room in the lobby phase. The first player to
    /// join becomes the creator.
    pub fn new(code: RoomCode, settings: GameSettings) -> Self {
        Self {
            code,
            players: Vec::new(),
            settings,
            phase: GamePhase::Lobby,
            current_round: 1,
            current_picker: None,
            selected_stat: None,
            winners: Vec::new(),
            tie_break: Vec::new(),
            tie_stat: None,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Looks up a member by id.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Join-order index of a member.
    pub fn position(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.position(id).is_some()
    }

    /// The current admin. `None` only when the room is empty.
    pub fn creator_id(&self) -> Option<PlayerId> {
        self.players.iter().find(|p| p.is_creator).map(|p| p.id)
    }

    pub fn is_winner(&self, id: PlayerId) -> bool {
        self.winners.contains(&id)
    }

    /// Players still competing: members not yet in `winners`,
    /// in join order.
    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| !self.winners.contains(&p.id))
    }

    pub fn active_count(&self) -> usize {
        self.active_players().count()
    }

    /// Re-clamps match settings against the current membership.
    ///
    /// `rounds_to_win` is floored at 1. `max_winners` must leave at
    /// least one non-winner, so it is clamped to `[1, players − 1]`
    /// (treated as `[1, 1]` until a second player joins).
    pub fn clamp_settings(&mut self) {
        self.settings.rounds_to_win = self.settings.rounds_to_win.max(1);
        let ceiling = (self.players.len().saturating_sub(1)).max(1) as u32;
        self.settings.max_winners =
            self.settings.max_winners.clamp(1, ceiling);
    }

    /// Wholesale snapshot of the member list (unredacted).
    pub fn players_snapshot(&self) -> Vec<Player> {
        self.players.clone()
    }

    /// Clears all match progress; used when the room returns to the
    /// lobby after a game ended.
    pub fn reset_game_state(&mut self) {
        self.current_round = 1;
        self.current_picker = None;
        self.selected_stat = None;
        self.winners.clear();
        self.tie_break.clear();
        self.tie_stat = None;
        for player in &mut self.players {
            player.score = 0;
            player.pokemon = None;
        }
    }
}
