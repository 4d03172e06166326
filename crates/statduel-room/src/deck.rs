//! Card dealing: the [`Dealer`] trait and the built-in roster dealer.
//!
//! Dealing is the only randomness inside a match, so it sits behind a
//! trait. Production rooms use [`RosterDealer`] (random draws from a
//! fixed creature roster); tests inject a scripted dealer to force
//! exact stat values, ties, and tie-break redraws.

use rand::Rng;
use statduel_protocol::{Card, StatBlock};

/// Hands out one fresh card per call.
///
/// `&mut self` so dealers may carry state (an RNG, a script, a shoe of
/// cards). `Send + Sync + 'static` because each room actor owns its
/// dealer inside a Tokio task, and the registry's prototype copy sits
/// in server state shared across connection tasks.
pub trait Dealer: Send + Sync + 'static {
    /// Deals the next card.
    fn deal(&mut self) -> Card;
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// One roster row: dex number, name, elemental type, and base stats.
struct RosterEntry {
    dex: u16,
    name: &'static str,
    kind: &'static str,
    hp: u16,
    attack: u16,
    defense: u16,
    speed: u16,
}

/// The draw pool. Base stats from the classic dex; duplicates across
/// players are allowed (two pikachus tie on every stat, which the
/// tie-break handles like any other tie).
const ROSTER: &[RosterEntry] = &[
    RosterEntry { dex: 1, name: "bulbasaur", kind: "grass", hp: 45, attack: 49, defense: 49, speed: 45 },
    RosterEntry { dex: 4, name: "charmander", kind: "fire", hp: 39, attack: 52, defense: 43, speed: 65 },
    RosterEntry { dex: 7, name: "squirtle", kind: "water", hp: 44, attack: 48, defense: 65, speed: 43 },
    RosterEntry { dex: 25, name: "pikachu", kind: "electric", hp: 35, attack: 55, defense: 40, speed: 90 },
    RosterEntry { dex: 39, name: "jigglypuff", kind: "fairy", hp: 115, attack: 45, defense: 20, speed: 20 },
    RosterEntry { dex: 52, name: "meowth", kind: "normal", hp: 40, attack: 45, defense: 35, speed: 90 },
    RosterEntry { dex: 54, name: "psyduck", kind: "water", hp: 50, attack: 52, defense: 48, speed: 55 },
    RosterEntry { dex: 58, name: "growlithe", kind: "fire", hp: 55, attack: 70, defense: 45, speed: 60 },
    RosterEntry { dex: 66, name: "machop", kind: "fighting", hp: 70, attack: 80, defense: 50, speed: 35 },
    RosterEntry { dex: 74, name: "geodude", kind: "rock", hp: 40, attack: 80, defense: 100, speed: 20 },
    RosterEntry { dex: 92, name: "gastly", kind: "ghost", hp: 30, attack: 35, defense: 30, speed: 80 },
    RosterEntry { dex: 95, name: "onix", kind: "rock", hp: 35, attack: 45, defense: 160, speed: 70 },
    RosterEntry { dex: 98, name: "krabby", kind: "water", hp: 30, attack: 105, defense: 90, speed: 50 },
    RosterEntry { dex: 100, name: "voltorb", kind: "electric", hp: 40, attack: 30, defense: 50, speed: 100 },
    RosterEntry { dex: 104, name: "cubone", kind: "ground", hp: 50, attack: 50, defense: 95, speed: 35 },
    RosterEntry { dex: 106, name: "hitmonlee", kind: "fighting", hp: 50, attack: 120, defense: 53, speed: 87 },
    RosterEntry { dex: 109, name: "koffing", kind: "poison", hp: 40, attack: 65, defense: 95, speed: 35 },
    RosterEntry { dex: 123, name: "scyther", kind: "bug", hp: 70, attack: 110, defense: 80, speed: 105 },
    RosterEntry { dex: 126, name: "magmar", kind: "fire", hp: 65, attack: 95, defense: 57, speed: 93 },
    RosterEntry { dex: 127, name: "pinsir", kind: "bug", hp: 65, attack: 125, defense: 100, speed: 85 },
    RosterEntry { dex: 128, name: "tauros", kind: "normal", hp: 75, attack: 100, defense: 95, speed: 110 },
    RosterEntry { dex: 129, name: "magikarp", kind: "water", hp: 20, attack: 10, defense: 55, speed: 80 },
    RosterEntry { dex: 131, name: "lapras", kind: "ice", hp: 130, attack: 85, defense: 80, speed: 60 },
    RosterEntry { dex: 133, name: "eevee", kind: "normal", hp: 55, attack: 55, defense: 50, speed: 55 },
    RosterEntry { dex: 143, name: "snorlax", kind: "normal", hp: 160, attack: 110, defense: 65, speed: 30 },
    RosterEntry { dex: 148, name: "dragonair", kind: "dragon", hp: 61, attack: 84, defense: 65, speed: 70 },
];

impl RosterEntry {
    fn to_card(&self) -> Card {
        Card {
            name: self.name.to_string(),
            sprite: format!(
                "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/{}.png",
                self.dex
            ),
            kind: self.kind.to_string(),
            hp: self.hp,
            stats: StatBlock {
                attack: self.attack,
                defense: self.defense,
                speed: self.speed,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// RosterDealer
// ---------------------------------------------------------------------------

/// Deals uniformly random draws from [`ROSTER`].
///
/// Stateless: the thread-local RNG is fetched per draw, which keeps the
/// dealer `Send` without carrying an RNG across await points.
#[derive(Debug, Clone, Copy, Default)]
pub struct RosterDealer;

impl Dealer for RosterDealer {
    fn deal(&mut self) -> Card {
        let idx = rand::rng().random_range(0..ROSTER.len());
        ROSTER[idx].to_card()
    }
}
