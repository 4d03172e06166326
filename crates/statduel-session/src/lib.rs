//! Player session tracking for Statduel.
//!
//! This crate owns the lifecycle of player identities:
//!
//! 1. **Session tracking** — which identity is bound to which room, and
//!    whether its owner is currently connected ([`SessionManager`])
//! 2. **Reconnection** — letting players resume their seat after a
//!    brief transport drop (token-based, with a configurable grace
//!    period)
//!
//! # How it fits in the stack
//!
//! ```text
//! Room layer (above)     ← seats, game state, broadcasts
//!     ↕
//! Session layer (this)   ← identity, connection state, grace periods
//!     ↕
//! Protocol layer (below) ← PlayerId, RoomCode, wire types
//! ```

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Session, SessionConfig, SessionState};
