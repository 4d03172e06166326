//! Unified error type for the Statduel server.

use statduel_protocol::ProtocolError;
use statduel_room::RoomError;
use statduel_session::SessionError;
use statduel_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `statduel` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum StatduelError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (token, grace period, expiry).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (full, not found, invalid phase).
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use statduel_protocol::{PlayerId, RoomCode};

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::Shutdown;
        let top: StatduelError = err.into();
        assert!(matches!(top, StatduelError::Transport(_)));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let top: StatduelError = err.into();
        assert!(matches!(top, StatduelError::Protocol(_)));
        assert!(top.to_string().contains("bad"));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::InvalidToken;
        let top: StatduelError = err.into();
        assert!(matches!(top, StatduelError::Session(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotYourTurn(PlayerId(3));
        let top: StatduelError = err.into();
        assert!(matches!(top, StatduelError::Room(_)));
    }

    #[test]
    fn test_room_not_found_message_survives_wrapping() {
        let err = RoomError::NotFound(RoomCode::new("XK42"));
        let top: StatduelError = err.into();
        assert_eq!(top.to_string(), "Room not found");
    }
}
