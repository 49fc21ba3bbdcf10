//! Cards and the digit classification table
//!
//! A round draws a 3-hex-digit value `d` in `[0, 4095]` from a block hash:
//!
//! ```text
//! 0 ..= 4055     Deck(d % 52)          78 values per card
//! 4056           rejected
//! 4057 ..= 4060  Jackpot(d - 4057)     one per suit
//! 4061 ..= 4095  rejected
//! ```
//!
//! Rejected values make the dealer draw again, which keeps the deck uniform.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest value a 3-hex-digit window can hold.
pub const MAX_DIGITS: u16 = 0xFFF;
/// Values below this map onto the deck. 4056 = 78 * 52.
pub const DECK_BAND_END: u16 = 4056;
pub const JACKPOT_BAND_START: u16 = 4057;
pub const JACKPOT_BAND_END: u16 = 4060;
pub const DECK_SIZE: u8 = 52;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    /// Fixed suit order; deck and jackpot indices follow it.
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn color(self) -> Color {
        match self {
            Suit::Hearts | Suit::Diamonds => Color::Red,
            Suit::Clubs | Suit::Spades => Color::Black,
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Suit::Hearts => "Hearts",
            Suit::Diamonds => "Diamonds",
            Suit::Clubs => "Clubs",
            Suit::Spades => "Spades",
        };
        f.write_str(name)
    }
}

impl FromStr for Suit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hearts" => Ok(Suit::Hearts),
            "diamonds" => Ok(Suit::Diamonds),
            "clubs" => Ok(Suit::Clubs),
            "spades" => Ok(Suit::Spades),
            _ => Err(format!("Invalid suit: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Red,
    Black,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => f.write_str("Red"),
            Color::Black => f.write_str("Black"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "Jack",
            Rank::Queen => "Queen",
            Rank::King => "King",
            Rank::Ace => "Ace",
        };
        f.write_str(name)
    }
}

/// One of the 52 standard cards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeckCard {
    pub rank: Rank,
    pub suit: Suit,
}

impl DeckCard {
    /// Deck order is suit-major: index 0 is the 2 of Hearts, 51 the Ace of Spades.
    pub fn from_index(index: u8) -> Option<Self> {
        if index >= DECK_SIZE {
            return None;
        }
        Some(Self {
            suit: Suit::ALL[usize::from(index / 13)],
            rank: Rank::ALL[usize::from(index % 13)],
        })
    }

    pub fn index(&self) -> u8 {
        (self.suit.index() * 13 + self.rank as usize) as u8
    }
}

impl fmt::Display for DeckCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {}", self.rank, self.suit)
    }
}

/// Rare outcome outside the deck, one per suit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JackpotCard {
    pub suit: Suit,
}

impl fmt::Display for JackpotCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Jackpot of {}", self.suit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CardOutcome {
    Deck(DeckCard),
    Jackpot(JackpotCard),
}

impl CardOutcome {
    pub fn suit(&self) -> Suit {
        match self {
            CardOutcome::Deck(card) => card.suit,
            CardOutcome::Jackpot(card) => card.suit,
        }
    }

    pub fn is_jackpot(&self) -> bool {
        matches!(self, CardOutcome::Jackpot(_))
    }
}

impl fmt::Display for CardOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardOutcome::Deck(card) => card.fmt(f),
            CardOutcome::Jackpot(card) => card.fmt(f),
        }
    }
}

/// Map a drawn value onto an outcome. `None` means draw again; values above
/// [`MAX_DIGITS`] cannot come out of a 3-digit window and are rejected too.
pub fn classify(digits: u16) -> Option<CardOutcome> {
    match digits {
        d if d < DECK_BAND_END => {
            DeckCard::from_index((d % u16::from(DECK_SIZE)) as u8).map(CardOutcome::Deck)
        }
        JACKPOT_BAND_START..=JACKPOT_BAND_END => Some(CardOutcome::Jackpot(JackpotCard {
            suit: Suit::ALL[usize::from(digits - JACKPOT_BAND_START)],
        })),
        _ => None,
    }
}
