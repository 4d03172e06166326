//! Core protocol types for Statduel's wire format.
//!
//! Everything in this module travels "on the wire": these are the
//! structures that get serialized to JSON, pushed through a WebSocket,
//! and parsed by the browser client on the other side.
//!
//! The client expects camelCase keys (`roomCode`, `isBackInRoom`, ...),
//! so every enum here carries `rename_all` / `rename_all_fields`
//! attributes. The JSON shape tests at the bottom pin those down —
//! a mismatch means the client silently ignores our events.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// Newtype over `u64` so a `PlayerId` can never be confused with a raw
/// number or a room code in a function signature. `#[serde(transparent)]`
/// keeps the JSON representation a plain number: `PlayerId(42)` → `42`.
///
/// Identity is transient: it is minted when a connection is accepted and
/// survives a disconnect only through the reconnection flow (same id,
/// token-checked). A leave followed by a fresh join is a new identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A short, human-shareable room identifier ("battle room code").
///
/// Generated server-side from an uppercase alphanumeric alphabet with
/// lookalike characters removed, unique among live rooms. Players type
/// these by hand, so `parse` normalizes to uppercase and trims.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Wraps an already-normalized code. Callers outside the registry
    /// should prefer [`RoomCode::parse`].
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Normalizes user input: trim whitespace, uppercase.
    pub fn parse(input: &str) -> Self {
        Self(input.trim().to_ascii_uppercase())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Cards and stats
// ---------------------------------------------------------------------------

/// The four comparable stats on a card.
///
/// Serialized lowercase (`"hp"`, `"attack"`, ...) because that is what
/// the client sends when the picker taps a stat button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatKey {
    Hp,
    Attack,
    Defense,
    Speed,
}

impl StatKey {
    /// All stat keys, in display order.
    pub const ALL: [StatKey; 4] =
        [StatKey::Hp, StatKey::Attack, StatKey::Defense, StatKey::Speed];
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatKey::Hp => "hp",
            StatKey::Attack => "attack",
            StatKey::Defense => "defense",
            StatKey::Speed => "speed",
        };
        f.write_str(s)
    }
}

/// The non-HP stats of a card, grouped the way the client renders them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatBlock {
    pub attack: u16,
    pub defense: u16,
    pub speed: u16,
}

/// A dealt card: one creature with its display info and comparable stats.
///
/// `kind` is the creature's elemental type (`"fire"`, `"water"`, ...);
/// the client uses it only to pick a background color. It serializes as
/// `"type"` because that's the field name the client reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub name: String,
    pub sprite: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub hp: u16,
    pub stats: StatBlock,
}

impl Card {
    /// Reads the value of the given stat.
    pub fn value(&self, stat: StatKey) -> u16 {
        match stat {
            StatKey::Hp => self.hp,
            StatKey::Attack => self.stats.attack,
            StatKey::Defense => self.stats.defense,
            StatKey::Speed => self.stats.speed,
        }
    }

    /// The placeholder card sent to viewers who may not see the real one.
    ///
    /// Redaction replaces a hidden card with this constant shape instead
    /// of omitting it, so the client still knows a card was dealt.
    pub fn face_down() -> Self {
        Self {
            name: "???".to_string(),
            sprite: "/pokeball.png".to_string(),
            kind: "normal".to_string(),
            hp: 0,
            stats: StatBlock { attack: 0, defense: 0, speed: 0 },
        }
    }
}

// ---------------------------------------------------------------------------
// Players and settings
// ---------------------------------------------------------------------------

/// A player as both the room model and the wire representation.
///
/// The room crate mutates this directly; snapshots are just clones.
/// `pokemon` is `None` outside a match and between deals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub score: u32,
    pub pokemon: Option<Card>,
    pub is_creator: bool,
    pub is_back_in_room: bool,
}

impl Player {
    /// Creates a fresh player with zero score and no card.
    ///
    /// New members start with `is_back_in_room = true`: they are, by
    /// definition, present in the current waiting room.
    pub fn new(id: PlayerId, name: impl Into<String>, is_creator: bool) -> Self {
        Self {
            id,
            name: name.into(),
            score: 0,
            pokemon: None,
            is_creator,
            is_back_in_room: true,
        }
    }
}

/// Match settings, configurable by the creator while in the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    /// Round wins a player needs to clinch a medal. Always ≥ 1.
    pub rounds_to_win: u32,
    /// How many players can clinch before the game ends.
    /// Clamped to `[1, players - 1]` whenever membership changes.
    pub max_winners: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self { rounds_to_win: 3, max_winners: 1 }
    }
}

/// A partial settings update. Absent fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub rounds_to_win: Option<u32>,
    pub max_winners: Option<u32>,
}

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// The lifecycle phase of a room.
///
/// ```text
/// Lobby ──startGame──→ Playing ──tie──→ TieBreak
///   ↑                     │  ↑              │
///   │                     │  └──resolved────┘
///   └────backToRoom─── Ended ←──winners full
/// ```
///
/// `Lobby` covers both "room just created" and "waiting between
/// matches" — there is no observable difference between the two.
/// `TieBreak` is a sub-state of round resolution: only the tied subset
/// participates until a strict winner emerges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GamePhase {
    Lobby,
    Playing,
    TieBreak,
    Ended,
}

impl GamePhase {
    /// Returns `true` while a match is actively running.
    pub fn in_match(&self) -> bool {
        matches!(self, Self::Playing | Self::TieBreak)
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Lobby => "lobby",
            Self::Playing => "playing",
            Self::TieBreak => "tieBreak",
            Self::Ended => "ended",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Recipient — who should receive an event?
// ---------------------------------------------------------------------------

/// Specifies who should receive a server event.
///
/// The room session returns `(Recipient, ServerEvent)` pairs; the room
/// actor fans them out. Errors always go `Player(offender)` — a failed
/// request is never broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every player in the room.
    All,
    /// One specific player.
    Player(PlayerId),
}

// ---------------------------------------------------------------------------
// ClientIntent — what clients may ask for
// ---------------------------------------------------------------------------

/// An inbound request from a client.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON, so a stat
/// pick arrives as `{ "type": "selectStat", "stat": "attack" }`.
///
/// Room-scoped intents carry no room code: a connection is bound to at
/// most one room at a time, and the binding is server-side state. Only
/// the intents that *establish* a binding name a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientIntent {
    /// Create a room with the sender as sole member and creator.
    CreateRoom {
        player_name: String,
        #[serde(default)]
        settings: GameSettings,
    },

    /// Join an existing room by code.
    JoinRoom {
        room_code: RoomCode,
        player_name: String,
    },

    /// Resume a prior identity after a transport drop, within the
    /// grace period. Falls back to a plain join if the session is gone.
    Reconnect {
        room_code: RoomCode,
        player_id: PlayerId,
        token: String,
    },

    /// Creator-only: start the match from the lobby.
    StartGame,

    /// Picker-only: choose the stat the current round compares on.
    SelectStat { stat: StatKey },

    /// Advance past a resolved round. Any member may send this.
    NextRound,

    /// Creator-only, lobby-only: patch the match settings.
    UpdateSettings { settings: SettingsPatch },

    /// Creator-only: hand admin rights to another member.
    TransferCreator { new_creator_id: PlayerId },

    /// Leave the room for good (no grace period).
    LeaveRoom,

    /// Signal presence in the waiting room after a match ended.
    /// The first such signal after `Ended` also resets the game state.
    PlayerBackToRoom,
}

// ---------------------------------------------------------------------------
// ServerEvent — what the server tells clients
// ---------------------------------------------------------------------------

/// An outbound event to one or more clients.
///
/// Every event that carries `players` is a wholesale snapshot — the
/// client replaces its local list, never merges. That keeps delivery
/// idempotent-safe: replaying an event is harmless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// To the creator only, in response to `createRoom`.
    RoomCreated {
        room_code: RoomCode,
        players: Vec<Player>,
    },

    /// To the joining connection only: its identity and reconnect token.
    SessionGranted {
        player_id: PlayerId,
        token: String,
    },

    /// To the whole room when someone joins.
    PlayerJoined { players: Vec<Player> },

    /// To the whole room when a dropped player resumes in time.
    PlayerReconnected { players: Vec<Player> },

    /// Full room snapshot: sent to joiners and after settings changes.
    GameStateUpdate {
        room_code: RoomCode,
        players: Vec<Player>,
        phase: GamePhase,
        settings: GameSettings,
    },

    /// A round (or tie-break cycle) is ready for the picker.
    RoundStarted {
        room_code: RoomCode,
        players: Vec<Player>,
        current_round: u32,
        current_picker: PlayerId,
        in_tie_breaker: bool,
        game_ended: bool,
    },

    /// The picked stat has been compared and scores updated.
    RoundComplete {
        game_winners: Vec<PlayerId>,
        stat: StatKey,
        players: Vec<Player>,
        game_ended: bool,
        in_tie_breaker: bool,
    },

    /// Admin rights moved, either explicitly or by succession.
    CreatorTransferred {
        previous_creator_id: PlayerId,
        new_creator_id: PlayerId,
        players: Vec<Player>,
    },

    /// Someone left; `new_creator_id` is set when succession happened.
    PlayerLeft {
        players: Vec<Player>,
        left_player: Option<Player>,
        new_creator_id: Option<PlayerId>,
    },

    /// A single player's back-in-room flag flipped.
    PlayerStatusUpdate {
        id: PlayerId,
        is_back_in_room: bool,
    },

    /// Scores, cards, winners, and round counter were reset.
    GameReset,

    /// Request failure, delivered only to the offending connection.
    Error { message: String },
}

// ---------------------------------------------------------------------------
// Envelope — the top-level wire format
// ---------------------------------------------------------------------------

/// The direction-agnostic content of an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum Payload {
    /// Client → server.
    Intent(ClientIntent),
    /// Server → client.
    Event(ServerEvent),
}

/// The top-level message wrapper; every wire message is one of these.
///
/// `seq` is a per-sender monotonic counter and `timestamp` is
/// milliseconds since the sender started — both are diagnostics, not
/// ordering machinery (the transport is ordered per sender already).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub seq: u64,
    pub timestamp: u64,
    pub payload: Payload,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! JSON shape tests. The browser client parses these messages by
    //! key name, so the exact casing and tagging is load-bearing.

    use super::*;

    // =====================================================================
    // Identity types
    // =====================================================================

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&PlayerId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_player_id_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
    }

    #[test]
    fn test_room_code_parse_normalizes_case_and_whitespace() {
        let code = RoomCode::parse("  ab2x \n");
        assert_eq!(code.as_str(), "AB2X");
    }

    #[test]
    fn test_room_code_serializes_as_plain_string() {
        let json = serde_json::to_string(&RoomCode::new("XK42")).unwrap();
        assert_eq!(json, "\"XK42\"");
    }

    // =====================================================================
    // StatKey / Card
    // =====================================================================

    #[test]
    fn test_stat_key_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&StatKey::Hp).unwrap(), "\"hp\"");
        assert_eq!(
            serde_json::to_string(&StatKey::Attack).unwrap(),
            "\"attack\""
        );
    }

    #[test]
    fn test_stat_key_deserializes_from_client_strings() {
        let stat: StatKey = serde_json::from_str("\"defense\"").unwrap();
        assert_eq!(stat, StatKey::Defense);
    }

    #[test]
    fn test_card_value_reads_each_stat() {
        let card = Card {
            name: "pikachu".into(),
            sprite: "/sprites/25.png".into(),
            kind: "electric".into(),
            hp: 35,
            stats: StatBlock { attack: 55, defense: 40, speed: 90 },
        };
        assert_eq!(card.value(StatKey::Hp), 35);
        assert_eq!(card.value(StatKey::Attack), 55);
        assert_eq!(card.value(StatKey::Defense), 40);
        assert_eq!(card.value(StatKey::Speed), 90);
    }

    #[test]
    fn test_card_kind_serializes_as_type() {
        // The client reads `pokemon.type` for its background color.
        let card = Card::face_down();
        let json: serde_json::Value = serde_json::to_value(&card).unwrap();
        assert_eq!(json["type"], "normal");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_face_down_card_leaks_no_stats() {
        let card = Card::face_down();
        for stat in StatKey::ALL {
            assert_eq!(card.value(stat), 0);
        }
        assert_eq!(card.name, "???");
    }

    // =====================================================================
    // Player / settings
    // =====================================================================

    #[test]
    fn test_player_json_uses_camel_case_keys() {
        let player = Player::new(PlayerId(1), "Ash", true);
        let json: serde_json::Value = serde_json::to_value(&player).unwrap();
        assert_eq!(json["isCreator"], true);
        assert_eq!(json["isBackInRoom"], true);
        assert!(json["pokemon"].is_null());
        assert_eq!(json["score"], 0);
    }

    #[test]
    fn test_game_settings_default_matches_client() {
        let settings = GameSettings::default();
        assert_eq!(settings.rounds_to_win, 3);
        assert_eq!(settings.max_winners, 1);
    }

    #[test]
    fn test_settings_patch_tolerates_partial_json() {
        let patch: SettingsPatch =
            serde_json::from_str(r#"{"roundsToWin": 5}"#).unwrap();
        assert_eq!(patch.rounds_to_win, Some(5));
        assert_eq!(patch.max_winners, None);
    }

    // =====================================================================
    // GamePhase
    // =====================================================================

    #[test]
    fn test_game_phase_serializes_camel_case() {
        assert_eq!(
            serde_json::to_string(&GamePhase::TieBreak).unwrap(),
            "\"tieBreak\""
        );
        assert_eq!(
            serde_json::to_string(&GamePhase::Lobby).unwrap(),
            "\"lobby\""
        );
    }

    #[test]
    fn test_game_phase_in_match() {
        assert!(!GamePhase::Lobby.in_match());
        assert!(GamePhase::Playing.in_match());
        assert!(GamePhase::TieBreak.in_match());
        assert!(!GamePhase::Ended.in_match());
    }

    // =====================================================================
    // ClientIntent — JSON shapes the client actually emits
    // =====================================================================

    #[test]
    fn test_create_room_intent_json_format() {
        let json = r#"{
            "type": "createRoom",
            "playerName": "Misty",
            "settings": { "roundsToWin": 2, "maxWinners": 1 }
        }"#;
        let intent: ClientIntent = serde_json::from_str(json).unwrap();
        assert_eq!(
            intent,
            ClientIntent::CreateRoom {
                player_name: "Misty".into(),
                settings: GameSettings { rounds_to_win: 2, max_winners: 1 },
            }
        );
    }

    #[test]
    fn test_create_room_intent_defaults_settings_when_missing() {
        let json = r#"{ "type": "createRoom", "playerName": "Misty" }"#;
        let intent: ClientIntent = serde_json::from_str(json).unwrap();
        assert!(matches!(
            intent,
            ClientIntent::CreateRoom { settings, .. }
                if settings == GameSettings::default()
        ));
    }

    #[test]
    fn test_select_stat_intent_json_format() {
        let json = r#"{ "type": "selectStat", "stat": "speed" }"#;
        let intent: ClientIntent = serde_json::from_str(json).unwrap();
        assert_eq!(intent, ClientIntent::SelectStat { stat: StatKey::Speed });
    }

    #[test]
    fn test_transfer_creator_intent_json_format() {
        let json = r#"{ "type": "transferCreator", "newCreatorId": 3 }"#;
        let intent: ClientIntent = serde_json::from_str(json).unwrap();
        assert_eq!(
            intent,
            ClientIntent::TransferCreator { new_creator_id: PlayerId(3) }
        );
    }

    #[test]
    fn test_unit_intents_round_trip() {
        for intent in [
            ClientIntent::StartGame,
            ClientIntent::NextRound,
            ClientIntent::LeaveRoom,
            ClientIntent::PlayerBackToRoom,
        ] {
            let bytes = serde_json::to_vec(&intent).unwrap();
            let decoded: ClientIntent =
                serde_json::from_slice(&bytes).unwrap();
            assert_eq!(intent, decoded);
        }
    }

    // =====================================================================
    // ServerEvent — JSON shapes the client listens for
    // =====================================================================

    #[test]
    fn test_room_created_event_json_format() {
        let event = ServerEvent::RoomCreated {
            room_code: RoomCode::new("AB2X"),
            players: vec![Player::new(PlayerId(1), "Ash", true)],
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "roomCreated");
        assert_eq!(json["roomCode"], "AB2X");
        assert_eq!(json["players"][0]["name"], "Ash");
    }

    #[test]
    fn test_round_complete_event_json_format() {
        let event = ServerEvent::RoundComplete {
            game_winners: vec![PlayerId(2)],
            stat: StatKey::Attack,
            players: vec![],
            game_ended: true,
            in_tie_breaker: false,
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "roundComplete");
        assert_eq!(json["gameWinners"], serde_json::json!([2]));
        assert_eq!(json["stat"], "attack");
        assert_eq!(json["gameEnded"], true);
        assert_eq!(json["inTieBreaker"], false);
    }

    #[test]
    fn test_player_left_event_omits_nothing() {
        // `newCreatorId: null` must still be present — the client checks
        // for it explicitly.
        let event = ServerEvent::PlayerLeft {
            players: vec![],
            left_player: None,
            new_creator_id: None,
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "playerLeft");
        assert!(json["newCreatorId"].is_null());
    }

    #[test]
    fn test_error_event_json_format() {
        let event = ServerEvent::Error { message: "Room not found".into() };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "Room not found");
    }

    // =====================================================================
    // Envelope / Payload
    // =====================================================================

    #[test]
    fn test_envelope_round_trip() {
        let envelope = Envelope {
            seq: 7,
            timestamp: 1500,
            payload: Payload::Intent(ClientIntent::NextRound),
        };
        let bytes = serde_json::to_vec(&envelope).unwrap();
        let decoded: Envelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(envelope, decoded);
    }

    #[test]
    fn test_payload_is_adjacently_tagged() {
        let payload = Payload::Event(ServerEvent::GameReset);
        let json: serde_json::Value = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "event");
        assert_eq!(json["data"]["type"], "gameReset");
    }

    #[test]
    fn test_decode_garbage_returns_error() {
        let garbage = b"not json at all";
        let result: Result<Envelope, _> = serde_json::from_slice(garbage);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_unknown_intent_type_returns_error() {
        let unknown = r#"{"type": "petThePikachu"}"#;
        let result: Result<ClientIntent, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }
}
