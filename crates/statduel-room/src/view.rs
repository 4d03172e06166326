//! Per-viewer projection of room state.
//!
//! Cards are hidden information until the round's stat is locked in.
//! Every event that carries a player list goes through [`redact`] so a
//! client only ever sees:
//!
//! - its own card,
//! - everyone's card once a stat has been selected this round,
//! - everyone's card after the game ends,
//! - the cards of players who already clinched a medal (their final
//!   card stays face up as part of the podium).
//!
//! Hidden cards are replaced by [`Card::face_down`] rather than
//! omitted, so client list shapes stay stable.

use statduel_protocol::{Card, GamePhase, Player, PlayerId};

use crate::Room;

/// Returns the player list as `viewer` is allowed to see it.
pub fn redact(room: &Room, viewer: PlayerId) -> Vec<Player> {
    room.players
        .iter()
        .map(|p| {
            let mut player = p.clone();
            if player.pokemon.is_some() && !card_visible(room, viewer, p.id) {
                player.pokemon = Some(Card::face_down());
            }
            player
        })
        .collect()
}

fn card_visible(room: &Room, viewer: PlayerId, owner: PlayerId) -> bool {
    owner == viewer
        || room.selected_stat.is_some()
        || room.phase == GamePhase::Ended
        || room.is_winner(owner)
}
