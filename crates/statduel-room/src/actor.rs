//! Room actor: an isolated Tokio task that owns one game room.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. That makes the room a unit of serial
//! execution — intents from every connection in the room are applied
//! strictly in arrival order, and a mutation plus its broadcast is
//! atomic with respect to other intents on the same room. Different
//! rooms share no mutable state and run fully in parallel.

use std::collections::HashMap;

use statduel_protocol::{
    ClientIntent, GamePhase, PlayerId, Recipient, RoomCode, ServerEvent,
};
use tokio::sync::{mpsc, oneshot};

use crate::session::RoomSession;
use crate::{Dealer, Room, RoomConfig, RoomError};

/// Channel sender for delivering outbound events to a player's
/// connection handler. Unbounded: a slow client must never stall the
/// room's command loop.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in some variants is a reply channel — the
/// caller sends a command and awaits the response on it.
pub(crate) enum RoomCommand {
    /// Add a player and register their outbound channel.
    Join {
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Reattach a known player's identity to a new outbound channel.
    Reconnect {
        player_id: PlayerId,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Remove a player for good.
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<LeaveAck, RoomError>>,
    },

    /// Drop a player's outbound channel without removing them — the
    /// grace-period limbo between a transport drop and either a
    /// reconnect or an expiry-driven `Leave`.
    Detach { player_id: PlayerId },

    /// Deliver a game intent from a player (fire-and-forget; rule
    /// rejections come back as an `error` event on their channel).
    Intent {
        sender: PlayerId,
        intent: ClientIntent,
    },

    /// Request room metadata.
    Info { reply: oneshot::Sender<RoomInfo> },

    /// Shut down the room.
    Shutdown,
}

/// Acknowledgement of a processed leave.
#[derive(Debug, Clone, Copy)]
pub struct LeaveAck {
    /// The room has no members left; the caller should drop it from
    /// the registry (the actor stops on its own).
    pub room_empty: bool,
}

/// A snapshot of room metadata (not the game state itself).
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub room_code: RoomCode,
    pub phase: GamePhase,
    pub player_count: usize,
    pub max_players: usize,
}

/// Handle to a running room actor. Cheap to clone — it's just an
/// `mpsc::Sender` wrapper. The registry holds one per room.
#[derive(Clone)]
pub struct RoomHandle {
    room_code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    /// Sends a join request and awaits the verdict.
    pub async fn join(
        &self,
        player_id: PlayerId,
        name: &str,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                player_id,
                name: name.to_owned(),
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_code.clone()))?
    }

    /// Reattaches a dropped player to a new outbound channel.
    pub async fn reconnect(
        &self,
        player_id: PlayerId,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Reconnect {
                player_id,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_code.clone()))?
    }

    /// Sends a leave request and awaits the verdict.
    pub async fn leave(
        &self,
        player_id: PlayerId,
    ) -> Result<LeaveAck, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Leave {
                player_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_code.clone()))?
    }

    /// Drops a player's outbound channel, keeping their seat.
    pub async fn detach(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Detach { player_id })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_code.clone()))
    }

    /// Delivers a game intent (fire-and-forget).
    pub async fn send_intent(
        &self,
        sender: PlayerId,
        intent: ClientIntent,
    ) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Intent { sender, intent })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_code.clone()))
    }

    /// Requests the current room metadata.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Info { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_code.clone()))
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_code.clone()))
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<D: Dealer> {
    session: RoomSession<D>,
    max_players: usize,
    /// Per-player outbound channels. A seat without a channel is a
    /// member in the disconnect grace period.
    senders: HashMap<PlayerId, PlayerSender>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl<D: Dealer> RoomActor<D> {
    /// Runs the actor loop, processing commands until the room empties
    /// or is shut down.
    async fn run(mut self) {
        tracing::info!(room_code = %self.session.code(), "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    player_id,
                    name,
                    sender,
                    reply,
                } => {
                    let result = self.handle_join(player_id, &name, sender);
                    let _ = reply.send(result);
                }
                RoomCommand::Reconnect {
                    player_id,
                    sender,
                    reply,
                } => {
                    let result = self.handle_reconnect(player_id, sender);
                    let _ = reply.send(result);
                }
                RoomCommand::Leave { player_id, reply } => {
                    let result = self.handle_leave(player_id);
                    let empty =
                        matches!(result, Ok(LeaveAck { room_empty: true }));
                    let _ = reply.send(result);
                    if empty {
                        break;
                    }
                }
                RoomCommand::Detach { player_id } => {
                    self.senders.remove(&player_id);
                    tracing::debug!(
                        room_code = %self.session.code(),
                        %player_id,
                        "player detached, seat held"
                    );
                }
                RoomCommand::Intent { sender, intent } => {
                    self.handle_intent(sender, intent);
                }
                RoomCommand::Info { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::Shutdown => {
                    tracing::info!(
                        room_code = %self.session.code(),
                        "room shutting down"
                    );
                    break;
                }
            }
        }

        tracing::info!(room_code = %self.session.code(), "room actor stopped");
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        name: &str,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        let events = self.session.handle_join(player_id, name)?;
        self.senders.insert(player_id, sender);
        self.dispatch(events);
        Ok(())
    }

    fn handle_reconnect(
        &mut self,
        player_id: PlayerId,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        let events = self.session.handle_reconnect(player_id)?;
        self.senders.insert(player_id, sender);
        self.dispatch(events);
        Ok(())
    }

    fn handle_leave(
        &mut self,
        player_id: PlayerId,
    ) -> Result<LeaveAck, RoomError> {
        let (events, outcome) = self.session.handle_leave(player_id)?;
        self.senders.remove(&player_id);
        self.dispatch(events);
        Ok(LeaveAck {
            room_empty: outcome.room_empty,
        })
    }

    fn handle_intent(&mut self, sender: PlayerId, intent: ClientIntent) {
        match self.session.handle_intent(sender, intent) {
            Ok(events) => self.dispatch(events),
            Err(err) => {
                tracing::debug!(
                    room_code = %self.session.code(),
                    %sender,
                    %err,
                    "intent rejected"
                );
                self.send_to(
                    sender,
                    ServerEvent::Error {
                        message: err.to_string(),
                    },
                );
            }
        }
    }

    /// Delivers an event batch to the addressed recipients.
    fn dispatch(&self, events: Vec<(Recipient, ServerEvent)>) {
        for (recipient, event) in events {
            match recipient {
                Recipient::All => {
                    for pid in self.senders.keys() {
                        self.send_to(*pid, event.clone());
                    }
                }
                Recipient::Player(pid) => {
                    self.send_to(pid, event);
                }
            }
        }
    }

    /// Sends an event to a single player. Silently drops if the
    /// receiver is gone (player in the disconnect grace period).
    fn send_to(&self, player_id: PlayerId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&player_id) {
            let _ = sender.send(event);
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_code: self.session.code().clone(),
            phase: self.session.room().phase,
            player_count: self.session.room().players.len(),
            max_players: self.max_players,
        }
    }
}

/// Spawns a new room actor task and returns a handle to it.
///
/// `channel_size` bounds the command queue — when it fills, senders
/// wait, applying backpressure per room.
pub(crate) fn spawn_room<D: Dealer>(
    room: Room,
    config: RoomConfig,
    dealer: D,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let room_code = room.code().clone();

    let actor = RoomActor {
        session: RoomSession::new(room, config, dealer),
        max_players: config.max_players,
        senders: HashMap::new(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_code,
        sender: tx,
    }
}
