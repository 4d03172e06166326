//! Room lifecycle and game rules for Statduel.
//!
//! Each room runs as an isolated Tokio task (actor model) owning one
//! [`Room`] of game state. Layers, from the outside in:
//!
//! - [`RoomRegistry`] — creates/destroys rooms, routes players
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`RoomSession`] — the synchronous intent → events state machine
//! - [`engine`] — dealing, stat resolution, scoring, picker rotation
//! - [`membership`] — join/leave/creator-succession rules
//! - [`view`] — per-viewer redaction of hidden cards

mod actor;
mod config;
mod deck;
pub mod engine;
mod error;
pub mod membership;
mod registry;
mod room;
mod session;
pub mod view;

pub use actor::{LeaveAck, PlayerSender, RoomHandle, RoomInfo};
pub use config::RoomConfig;
pub use deck::{Dealer, RosterDealer};
pub use error::RoomError;
pub use membership::LeaveOutcome;
pub use registry::RoomRegistry;
pub use room::Room;
pub use session::{Outgoing, RoomSession};
