//! `StatduelServer` builder and server loop.
//!
//! This is the entry point for running a Statduel server. It ties
//! together all the layers: transport → protocol → session → room.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use statduel_protocol::{JsonCodec, PlayerId};
use statduel_room::{Dealer, RoomConfig, RoomRegistry, RosterDealer};
use statduel_session::{SessionConfig, SessionManager};
use statduel_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::StatduelError;
use crate::handler::handle_connection;

/// How often the server sweeps for sessions whose reconnection grace
/// period has run out.
const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
/// Interior mutability via `Mutex` where needed; the two locks are
/// never held at the same time.
pub(crate) struct ServerState<D: Dealer + Clone> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) rooms: Mutex<RoomRegistry<D>>,
    pub(crate) codec: JsonCodec,
    next_player_id: AtomicU64,
}

impl<D: Dealer + Clone> ServerState<D> {
    /// Mints a fresh player identity for a newly accepted connection.
    ///
    /// Identity is transient: a connection that later reconnects into
    /// an existing session adopts that session's id instead.
    pub(crate) fn mint_player_id(&self) -> PlayerId {
        PlayerId(self.next_player_id.fetch_add(1, Ordering::Relaxed))
    }
}

/// Builder for configuring and starting a Statduel server.
///
/// # Example
///
/// ```rust,ignore
/// use statduel::prelude::*;
///
/// let server = StatduelServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct StatduelServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
    room_config: RoomConfig,
}

impl StatduelServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            session_config: SessionConfig::default(),
            room_config: RoomConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the session (reconnection grace) configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets the room (player cap) configuration.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Builds the server with the standard roster dealer.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport` — the browser client
    /// speaks JSON over a WebSocket, so these are not configurable.
    pub async fn build(
        self,
    ) -> Result<StatduelServer<RosterDealer>, StatduelError> {
        self.build_with_dealer(RosterDealer).await
    }

    /// Builds the server with a custom dealer (deterministic tests).
    pub async fn build_with_dealer<D: Dealer + Clone>(
        self,
        dealer: D,
    ) -> Result<StatduelServer<D>, StatduelError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new(self.session_config)),
            rooms: Mutex::new(RoomRegistry::new(self.room_config, dealer)),
            codec: JsonCodec,
            next_player_id: AtomicU64::new(1),
        });

        Ok(StatduelServer { transport, state })
    }
}

impl Default for StatduelServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Statduel server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct StatduelServer<D: Dealer + Clone> {
    transport: WebSocketTransport,
    state: Arc<ServerState<D>>,
}

impl<D: Dealer + Clone> StatduelServer<D> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, StatduelError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a handler task per accepted connection and a background
    /// sweeper that turns expired sessions into leaves. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), StatduelError> {
        tracing::info!("Statduel server running");

        let sweeper_state = Arc::clone(&self.state);
        tokio::spawn(async move {
            sweep_expired_sessions(sweeper_state).await;
        });

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Periodically expires sessions whose grace period ran out and
/// removes the corresponding players from their rooms, exactly as if
/// they had sent a leave themselves.
async fn sweep_expired_sessions<D: Dealer + Clone>(state: Arc<ServerState<D>>) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        ticker.tick().await;

        let expired = state.sessions.lock().await.expire_stale();
        if expired.is_empty() {
            continue;
        }

        for (player_id, room_code) in &expired {
            tracing::info!(
                %player_id,
                %room_code,
                "grace period elapsed, removing player from room"
            );
            let result = state.rooms.lock().await.leave_room(*player_id).await;
            if let Err(e) = result {
                tracing::debug!(%player_id, error = %e, "expiry leave failed");
            }
        }

        state.sessions.lock().await.cleanup_expired();
    }
}
