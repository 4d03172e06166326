//! Per-connection handler: intent routing and the outbound event pump.
//!
//! Each accepted connection gets its own Tokio task running this
//! handler, plus a second task that pumps room events back out over
//! the socket. There is no handshake: a connection is anonymous until
//! its first binding intent (`createRoom`, `joinRoom`, `reconnect`),
//! which ties it to a room and answers with a `sessionGranted` event
//! carrying the player's id and reconnection token.
//!
//! The flow is:
//!   1. Mint a fresh `PlayerId` for the connection
//!   2. Loop: receive envelopes → dispatch binding or room intents
//!   3. On close, mark the session disconnected and detach the seat
//!      (the grace-period sweeper turns expiry into a real leave)

use std::sync::Arc;
use std::time::Instant;

use statduel_protocol::{
    ClientIntent, Codec, Envelope, GameSettings, Payload, PlayerId,
    ProtocolError, RoomCode, ServerEvent,
};
use statduel_room::{Dealer, PlayerSender};
use statduel_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::StatduelError;
use crate::server::ServerState;

/// Player names longer than this are rejected at the door.
const NAME_MAX_CHARS: usize = 20;

/// Drop guard that starts the reconnection grace period when the
/// handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since
/// `Drop` is synchronous, we spawn a fire-and-forget task for the
/// async locks. A player who already left explicitly has no session,
/// so the disconnect is a no-op and their seat is not detached twice.
struct DisconnectGuard<D: Dealer + Clone> {
    player_id: PlayerId,
    state: Arc<ServerState<D>>,
}

impl<D: Dealer + Clone> Drop for DisconnectGuard<D> {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let had_session =
                state.sessions.lock().await.disconnect(player_id).is_ok();
            if had_session {
                let _ = state.rooms.lock().await.detach(player_id).await;
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<D: Dealer + Clone>(
    conn: WebSocketConnection,
    state: Arc<ServerState<D>>,
) -> Result<(), StatduelError> {
    let conn_id = conn.id();
    let mut player_id = state.mint_player_id();
    tracing::debug!(%conn_id, %player_id, "handling new connection");

    // The connection is shared between this loop (reads) and the event
    // pump (writes); the transport allows both at once.
    let conn = Arc::new(conn);
    let (tx, rx) = mpsc::unbounded_channel();
    let writer =
        tokio::spawn(pump_events(Arc::clone(&conn), rx, state.codec));

    let mut guard = DisconnectGuard {
        player_id,
        state: Arc::clone(&state),
    };

    loop {
        let text = match conn.recv().await {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::info!(%player_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                writer.abort();
                return Err(e.into());
            }
        };

        let envelope: Envelope = match state.codec.decode(text.as_bytes()) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(
                    %player_id, error = %e, "failed to decode envelope"
                );
                send_error(&tx, "malformed message");
                continue;
            }
        };

        let intent = match envelope.payload {
            Payload::Intent(intent) => intent,
            Payload::Event(_) => {
                send_error(&tx, "clients send intents, not events");
                continue;
            }
        };

        match intent {
            ClientIntent::CreateRoom {
                player_name,
                settings,
            } => {
                create_room(&state, player_id, &player_name, settings, &tx)
                    .await;
            }
            ClientIntent::JoinRoom {
                room_code,
                player_name,
            } => {
                join_room(&state, player_id, &room_code, &player_name, &tx)
                    .await;
            }
            ClientIntent::Reconnect {
                room_code,
                player_id: claimed,
                token,
            } => {
                // On success the connection adopts the resumed
                // identity; the guard must clean up *that* player.
                if reconnect(&state, player_id, claimed, &room_code, &token, &tx)
                    .await
                {
                    player_id = claimed;
                    guard.player_id = claimed;
                }
            }
            ClientIntent::LeaveRoom => {
                leave_room(&state, player_id, &tx).await;
            }
            room_intent => {
                let result = state
                    .rooms
                    .lock()
                    .await
                    .route_intent(player_id, room_intent)
                    .await;
                if let Err(e) = result {
                    send_error(&tx, &e.to_string());
                }
            }
        }
    }

    // The socket is gone; nothing left to pump.
    writer.abort();

    // `guard` drops here → grace period starts.
    Ok(())
}

// ---------------------------------------------------------------------------
// Binding intents
// ---------------------------------------------------------------------------

/// Creates a room with the sender as creator and sole member.
///
/// The client sees `roomCreated` (emitted by the room on join) and
/// then `sessionGranted` with its id and reconnection token.
async fn create_room<D: Dealer + Clone>(
    state: &Arc<ServerState<D>>,
    player_id: PlayerId,
    name: &str,
    settings: GameSettings,
    tx: &PlayerSender,
) {
    let Some(name) = valid_name(name) else {
        send_error(tx, "playerName must be 1 to 20 characters");
        return;
    };

    let code = {
        let mut rooms = state.rooms.lock().await;
        if let Some(current) = rooms.player_room(player_id) {
            send_error(tx, &format!("already in room {current}"));
            return;
        }
        let code = match rooms.create_room(settings) {
            Ok(code) => code,
            Err(e) => {
                send_error(tx, &e.to_string());
                return;
            }
        };
        // Joining a freshly spawned room only fails if its actor died.
        if let Err(e) =
            rooms.join_room(player_id, &code, &name, tx.clone()).await
        {
            let _ = rooms.destroy_room(&code).await;
            send_error(tx, &e.to_string());
            return;
        }
        code
    };

    grant_session(state, player_id, code, tx).await;
}

/// Joins an existing room by code.
async fn join_room<D: Dealer + Clone>(
    state: &Arc<ServerState<D>>,
    player_id: PlayerId,
    code: &RoomCode,
    name: &str,
    tx: &PlayerSender,
) {
    let Some(name) = valid_name(name) else {
        send_error(tx, "playerName must be 1 to 20 characters");
        return;
    };

    let result = state
        .rooms
        .lock()
        .await
        .join_room(player_id, code, &name, tx.clone())
        .await;
    if let Err(e) = result {
        send_error(tx, &e.to_string());
        return;
    }

    grant_session(state, player_id, code.clone(), tx).await;
}

/// Issues the session for a player who just entered a room and tells
/// them their identity and reconnection token.
async fn grant_session<D: Dealer + Clone>(
    state: &Arc<ServerState<D>>,
    player_id: PlayerId,
    room_code: RoomCode,
    tx: &PlayerSender,
) {
    let token = {
        let mut sessions = state.sessions.lock().await;
        match sessions.create(player_id, room_code) {
            Ok(session) => session.reconnect_token.clone(),
            Err(e) => {
                drop(sessions);
                // Roll the join back rather than leave a member with
                // no session (the sweeper would never reap them).
                let _ = state.rooms.lock().await.leave_room(player_id).await;
                send_error(tx, &e.to_string());
                return;
            }
        }
    };

    let _ = tx.send(ServerEvent::SessionGranted { player_id, token });
}

/// Resumes a dropped session within the grace period.
///
/// Returns `true` if the connection adopted the claimed identity. On
/// any failure the client is told why and can fall back to a plain
/// join (as a new player).
async fn reconnect<D: Dealer + Clone>(
    state: &Arc<ServerState<D>>,
    conn_player: PlayerId,
    claimed: PlayerId,
    room_code: &RoomCode,
    token: &str,
    tx: &PlayerSender,
) -> bool {
    // A connection holds at most one identity. Letting a seated
    // connection resume a second one would orphan the first: the old
    // session stays Connected and the sweeper never reaps its seat.
    if let Some(current) = state.rooms.lock().await.player_room(conn_player) {
        send_error(tx, &format!("already in room {current}"));
        return false;
    }

    let token = {
        let mut sessions = state.sessions.lock().await;
        match sessions.reconnect(claimed, room_code, token) {
            Ok(session) => session.reconnect_token.clone(),
            Err(e) => {
                send_error(tx, &e.to_string());
                return false;
            }
        }
    };

    let result = state
        .rooms
        .lock()
        .await
        .reconnect_room(claimed, room_code, tx.clone())
        .await;
    if let Err(e) = result {
        // Session resumed but the room is gone (e.g. emptied out while
        // the player was away). Drop the session so the client rejoins
        // from scratch.
        state.sessions.lock().await.remove(claimed);
        send_error(tx, &e.to_string());
        return false;
    }

    let _ = tx.send(ServerEvent::SessionGranted {
        player_id: claimed,
        token,
    });
    true
}

/// Leaves the current room for good — no grace period.
async fn leave_room<D: Dealer + Clone>(
    state: &Arc<ServerState<D>>,
    player_id: PlayerId,
    tx: &PlayerSender,
) {
    let result = state.rooms.lock().await.leave_room(player_id).await;
    match result {
        Ok(_) => state.sessions.lock().await.remove(player_id),
        Err(e) => send_error(tx, &e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Forwards room events to the socket, wrapped in envelopes.
///
/// Runs until the channel closes (player left and handler exited) or a
/// send fails (socket gone). `seq` restarts at 1 per connection —
/// it's a diagnostic counter, not protocol state.
async fn pump_events(
    conn: Arc<WebSocketConnection>,
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
    codec: impl Codec,
) {
    let start = Instant::now();
    let mut seq: u64 = 1;

    while let Some(event) = rx.recv().await {
        let envelope = Envelope {
            seq: next_seq(&mut seq),
            timestamp: start.elapsed().as_millis() as u64,
            payload: Payload::Event(event),
        };
        let text = match encode_text(&codec, &envelope) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send(&text).await {
            tracing::debug!(
                conn_id = %conn.id(),
                error = %e,
                "send failed, stopping event pump"
            );
            break;
        }
    }
}

/// Encodes an envelope as a text frame.
///
/// The codec produces bytes; `JsonCodec` output is always valid UTF-8,
/// so the error arm is for a hypothetical misbehaving codec.
fn encode_text(
    codec: &impl Codec,
    envelope: &Envelope,
) -> Result<String, ProtocolError> {
    let bytes = codec.encode(envelope)?;
    String::from_utf8(bytes).map_err(|e| {
        ProtocolError::InvalidMessage(format!("encoded frame is not UTF-8: {e}"))
    })
}

/// Queues an error event for the offending connection only.
fn send_error(tx: &PlayerSender, message: &str) {
    let _ = tx.send(ServerEvent::Error {
        message: message.to_string(),
    });
}

/// Validates and normalizes a player name: trimmed, 1–20 characters.
fn valid_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let chars = trimmed.chars().count();
    if chars == 0 || chars > NAME_MAX_CHARS {
        return None;
    }
    Some(trimmed.to_string())
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_name_trims_surrounding_whitespace() {
        assert_eq!(valid_name("  Ash  "), Some("Ash".to_string()));
    }

    #[test]
    fn test_valid_name_rejects_blank_input() {
        assert_eq!(valid_name("   "), None);
        assert_eq!(valid_name(""), None);
    }

    #[test]
    fn test_valid_name_counts_characters_not_bytes() {
        // 20 multi-byte characters is exactly at the limit.
        let name = "ポ".repeat(20);
        assert_eq!(valid_name(&name), Some(name.clone()));
        assert_eq!(valid_name(&format!("{name}ポ")), None);
    }

    #[test]
    fn test_next_seq_counts_up_from_the_current_value() {
        let mut seq = 1;
        assert_eq!(next_seq(&mut seq), 1);
        assert_eq!(next_seq(&mut seq), 2);
        assert_eq!(seq, 3);
    }
}
