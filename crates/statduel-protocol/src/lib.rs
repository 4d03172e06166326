//! Wire protocol for Statduel.
//!
//! This crate defines the "language" that the browser client and the
//! server speak:
//!
//! - **Types** ([`Envelope`], [`ClientIntent`], [`ServerEvent`],
//!   [`Player`], [`Card`], ...) — the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong doing so.
//!
//! The protocol layer sits between transport (raw bytes) and the room
//! layer (game rules). It knows nothing about connections or rooms —
//! only message shapes.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Room (game semantics)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Card, ClientIntent, Envelope, GamePhase, GameSettings, Payload, Player,
    PlayerId, Recipient, RoomCode, ServerEvent, SettingsPatch, StatBlock,
    StatKey,
};
