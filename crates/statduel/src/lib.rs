//! # Statduel
//!
//! Server-authoritative backend for a "pick a stat, highest wins" card
//! game. Players share a four-letter room code, each round the current
//! picker chooses one of four stats, and everyone's hidden card is
//! compared on it — first to the configured number of round wins takes
//! a medal.
//!
//! This crate ties the layers together and runs the server:
//!
//! ```text
//! statduel-transport   WebSocket accept/send/recv
//! statduel-protocol    Envelope / ClientIntent / ServerEvent (JSON)
//! statduel-session     reconnect tokens and grace periods
//! statduel-room        room actors, rules, hidden-card redaction
//! statduel (this)      connection handler + server loop
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use statduel::prelude::*;
//!
//! # async fn run() -> Result<(), StatduelError> {
//! let server = StatduelServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::StatduelError;
pub use server::{StatduelServer, StatduelServerBuilder};

/// Everything needed to run a server or write an integration test.
pub mod prelude {
    pub use crate::{StatduelError, StatduelServer, StatduelServerBuilder};
    pub use statduel_protocol::{
        Card, ClientIntent, Envelope, GamePhase, GameSettings, Payload,
        Player, PlayerId, RoomCode, ServerEvent, SettingsPatch, StatKey,
    };
    pub use statduel_room::{Dealer, RoomConfig, RosterDealer};
    pub use statduel_session::SessionConfig;
}
