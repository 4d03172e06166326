//! Membership rules: join, leave, reconnect, admin transfer.
//!
//! These functions mutate a [`Room`] and uphold the membership
//! invariants: exactly one creator while the room is non-empty,
//! `max_winners` re-clamped whenever the player count changes, and
//! creator succession always re-derived from join order.
//!
//! Round-state repair after a leave (picker advance, tie shrinkage,
//! early game end) belongs to the session/engine, not here — leaving is
//! a membership fact; its consequences for the match are game rules.

use statduel_protocol::{GamePhase, Player, PlayerId};

use crate::{Room, RoomConfig, RoomError};

/// What happened when a player left, for event construction.
#[derive(Debug)]
pub struct LeaveOutcome {
    /// The removed player (final state, for the `playerLeft` event).
    pub left_player: Player,
    /// Set when creator rights passed by succession.
    pub new_creator: Option<PlayerId>,
    /// The room has no members left and should be destroyed.
    pub room_empty: bool,
}

/// Appends a new member. The first member becomes the creator.
///
/// Joins are lobby-only: a running match never gains players (reattach
/// of a dropped member goes through [`reconnect`] instead).
pub fn join(
    room: &mut Room,
    config: &RoomConfig,
    id: PlayerId,
    name: &str,
) -> Result<(), RoomError> {
    if room.phase != GamePhase::Lobby && room.phase != GamePhase::Ended {
        return Err(RoomError::InvalidPhase(
            "game already in progress".into(),
        ));
    }
    if room.players.len() >= config.max_players {
        return Err(RoomError::RoomFull(room.code().clone()));
    }

    let is_creator = room.players.is_empty();
    room.players.push(Player::new(id, name, is_creator));
    room.clamp_settings();

    tracing::info!(
        room_code = %room.code(),
        player_id = %id,
        players = room.players.len(),
        "player joined"
    );
    Ok(())
}

/// Removes a member. Creator rights, if held by the leaver, pass to the
/// next player in join order — always re-derived, never remembered.
pub fn leave(room: &mut Room, id: PlayerId) -> Result<LeaveOutcome, RoomError> {
    let idx = room.position(id).ok_or(RoomError::UnknownPlayer(id))?;
    let left_player = room.players.remove(idx);

    let mut new_creator = None;
    if left_player.is_creator {
        if let Some(head) = room.players.first_mut() {
            head.is_creator = true;
            new_creator = Some(head.id);
        }
    }
    room.clamp_settings();

    tracing::info!(
        room_code = %room.code(),
        player_id = %id,
        players = room.players.len(),
        "player left"
    );

    Ok(LeaveOutcome {
        left_player,
        new_creator,
        room_empty: room.players.is_empty(),
    })
}

/// Explicit admin handover by the current creator.
pub fn transfer_admin(
    room: &mut Room,
    requester: PlayerId,
    target: PlayerId,
) -> Result<(), RoomError> {
    if room.creator_id() != Some(requester) {
        return Err(RoomError::NotAuthorized(requester));
    }
    if !room.contains(target) {
        return Err(RoomError::UnknownPlayer(target));
    }

    for player in &mut room.players {
        player.is_creator = player.id == target;
    }

    tracing::info!(
        room_code = %room.code(),
        from = %requester,
        to = %target,
        "admin rights transferred"
    );
    Ok(())
}

/// Marks a player as present in the current waiting room.
pub fn mark_back_in_room(room: &mut Room, id: PlayerId) -> Result<(), RoomError> {
    let player = room
        .player_mut(id)
        .ok_or(RoomError::UnknownPlayer(id))?;
    player.is_back_in_room = true;
    Ok(())
}

/// Reattaches a prior identity after a transport drop.
///
/// Membership-wise this is a no-op if the player is still a member —
/// the caller swaps the outbound channel. Fails with `UnknownPlayer`
/// when the identity is gone (grace period elapsed, or they left), in
/// which case the caller should fall back to a plain join.
pub fn reconnect(room: &mut Room, id: PlayerId) -> Result<(), RoomError> {
    let player = room
        .player_mut(id)
        .ok_or(RoomError::UnknownPlayer(id))?;
    player.is_back_in_room = true;
    tracing::info!(room_code = %room.code(), player_id = %id, "player reconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use statduel_protocol::{GameSettings, RoomCode};

    fn empty_room() -> Room {
        Room::new(RoomCode::new("TEST"), GameSettings::default())
    }

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn config() -> RoomConfig {
        RoomConfig::default()
    }

    // =====================================================================
    // join()
    // =====================================================================

    #[test]
    fn test_join_first_player_becomes_creator() {
        let mut room = empty_room();
        join(&mut room, &config(), pid(1), "Ash").unwrap();
        join(&mut room, &config(), pid(2), "Misty").unwrap();

        assert_eq!(room.creator_id(), Some(pid(1)));
        assert!(!room.players[1].is_creator);
    }

    #[test]
    fn test_join_rejects_when_full() {
        let cfg = RoomConfig { max_players: 2 };
        let mut room = empty_room();
        join(&mut room, &cfg, pid(1), "Ash").unwrap();
        join(&mut room, &cfg, pid(2), "Misty").unwrap();

        let result = join(&mut room, &cfg, pid(3), "Brock");
        assert!(matches!(result, Err(RoomError::RoomFull(_))));
        assert_eq!(room.players.len(), 2);
    }

    #[test]
    fn test_join_rejected_mid_match() {
        let mut room = empty_room();
        join(&mut room, &config(), pid(1), "Ash").unwrap();
        join(&mut room, &config(), pid(2), "Misty").unwrap();
        room.phase = GamePhase::Playing;

        let result = join(&mut room, &config(), pid(3), "Brock");
        assert!(matches!(result, Err(RoomError::InvalidPhase(_))));
    }

    #[test]
    fn test_join_reclamps_max_winners() {
        let mut room = empty_room();
        room.settings.max_winners = 3;
        join(&mut room, &config(), pid(1), "Ash").unwrap();
        // Single member: clamp collapses to 1.
        assert_eq!(room.settings.max_winners, 1);

        join(&mut room, &config(), pid(2), "Misty").unwrap();
        join(&mut room, &config(), pid(3), "Brock").unwrap();
        join(&mut room, &config(), pid(4), "May").unwrap();
        // Clamp never raises a value back up.
        assert_eq!(room.settings.max_winners, 1);
    }

    // =====================================================================
    // leave()
    // =====================================================================

    #[test]
    fn test_leave_creator_passes_rights_in_join_order() {
        let mut room = empty_room();
        join(&mut room, &config(), pid(1), "Ash").unwrap();
        join(&mut room, &config(), pid(2), "Misty").unwrap();
        join(&mut room, &config(), pid(3), "Brock").unwrap();

        let outcome = leave(&mut room, pid(1)).unwrap();

        assert_eq!(outcome.new_creator, Some(pid(2)));
        assert_eq!(room.creator_id(), Some(pid(2)));
        assert!(!outcome.room_empty);
    }

    #[test]
    fn test_leave_non_creator_keeps_creator() {
        let mut room = empty_room();
        join(&mut room, &config(), pid(1), "Ash").unwrap();
        join(&mut room, &config(), pid(2), "Misty").unwrap();

        let outcome = leave(&mut room, pid(2)).unwrap();

        assert_eq!(outcome.new_creator, None);
        assert_eq!(room.creator_id(), Some(pid(1)));
    }

    #[test]
    fn test_leave_last_player_reports_empty() {
        let mut room = empty_room();
        join(&mut room, &config(), pid(1), "Ash").unwrap();

        let outcome = leave(&mut room, pid(1)).unwrap();

        assert!(outcome.room_empty);
        assert!(room.players.is_empty());
    }

    #[test]
    fn test_leave_unknown_player_errors() {
        let mut room = empty_room();
        join(&mut room, &config(), pid(1), "Ash").unwrap();

        assert!(matches!(
            leave(&mut room, pid(99)),
            Err(RoomError::UnknownPlayer(_))
        ));
    }

    #[test]
    fn test_exactly_one_creator_through_churn() {
        // The single-creator invariant must hold after any sequence of
        // joins, leaves, and transfers.
        let mut room = empty_room();
        let cfg = config();
        join(&mut room, &cfg, pid(1), "Ash").unwrap();
        join(&mut room, &cfg, pid(2), "Misty").unwrap();
        join(&mut room, &cfg, pid(3), "Brock").unwrap();
        transfer_admin(&mut room, pid(1), pid(3)).unwrap();
        leave(&mut room, pid(3)).unwrap();
        join(&mut room, &cfg, pid(4), "May").unwrap();
        leave(&mut room, pid(2)).unwrap();

        let creators =
            room.players.iter().filter(|p| p.is_creator).count();
        assert_eq!(creators, 1);
        // pid(3) held rights and left; succession goes to the current
        // head of join order, which is pid(1).
        assert_eq!(room.creator_id(), Some(pid(1)));
    }

    // =====================================================================
    // transfer_admin()
    // =====================================================================

    #[test]
    fn test_transfer_admin_swaps_flags() {
        let mut room = empty_room();
        join(&mut room, &config(), pid(1), "Ash").unwrap();
        join(&mut room, &config(), pid(2), "Misty").unwrap();

        transfer_admin(&mut room, pid(1), pid(2)).unwrap();

        assert_eq!(room.creator_id(), Some(pid(2)));
        assert!(!room.players[0].is_creator);
    }

    #[test]
    fn test_transfer_admin_requires_creator() {
        let mut room = empty_room();
        join(&mut room, &config(), pid(1), "Ash").unwrap();
        join(&mut room, &config(), pid(2), "Misty").unwrap();

        let result = transfer_admin(&mut room, pid(2), pid(1));
        assert!(matches!(result, Err(RoomError::NotAuthorized(_))));
        assert_eq!(room.creator_id(), Some(pid(1)));
    }

    #[test]
    fn test_transfer_admin_unknown_target_errors() {
        let mut room = empty_room();
        join(&mut room, &config(), pid(1), "Ash").unwrap();

        let result = transfer_admin(&mut room, pid(1), pid(42));
        assert!(matches!(result, Err(RoomError::UnknownPlayer(_))));
    }

    // =====================================================================
    // reconnect() / mark_back_in_room()
    // =====================================================================

    #[test]
    fn test_reconnect_live_member_succeeds() {
        let mut room = empty_room();
        join(&mut room, &config(), pid(1), "Ash").unwrap();
        room.players[0].is_back_in_room = false;

        reconnect(&mut room, pid(1)).unwrap();
        assert!(room.players[0].is_back_in_room);
    }

    #[test]
    fn test_reconnect_gone_member_errors() {
        let mut room = empty_room();
        join(&mut room, &config(), pid(1), "Ash").unwrap();

        assert!(matches!(
            reconnect(&mut room, pid(9)),
            Err(RoomError::UnknownPlayer(_))
        ));
    }

    #[test]
    fn test_mark_back_in_room_sets_flag() {
        let mut room = empty_room();
        join(&mut room, &config(), pid(1), "Ash").unwrap();
        room.players[0].is_back_in_room = false;

        mark_back_in_room(&mut room, pid(1)).unwrap();
        assert!(room.players[0].is_back_in_room);
    }
}
