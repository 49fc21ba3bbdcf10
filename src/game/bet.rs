use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::cards::{Color, Suit};

pub const SUIT_PAYOUT: u32 = 4;
pub const COLOR_PAYOUT: u32 = 2;

/// What the player backs for a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bet {
    Suit(Suit),
    Color(Color),
}

impl Bet {
    /// Multiple of the wager paid back when a card of `suit` is dealt.
    pub fn payout_multiplier(&self, suit: Suit) -> u32 {
        match self {
            Bet::Suit(backed) if *backed == suit => SUIT_PAYOUT,
            Bet::Color(backed) if *backed == suit.color() => COLOR_PAYOUT,
            _ => 0,
        }
    }

    pub fn winnings(&self, suit: Suit, wager: Decimal) -> Decimal {
        wager * Decimal::from(self.payout_multiplier(suit))
    }
}

impl fmt::Display for Bet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bet::Suit(suit) => suit.fmt(f),
            Bet::Color(color) => color.fmt(f),
        }
    }
}

impl FromStr for Bet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "red" => Ok(Bet::Color(Color::Red)),
            "black" => Ok(Bet::Color(Color::Black)),
            other => other
                .parse::<Suit>()
                .map(Bet::Suit)
                .map_err(|_| format!("Invalid bet: {} (expected a suit, red or black)", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suit_bet_pays_four_times() {
        let bet = Bet::Suit(Suit::Clubs);
        assert_eq!(bet.winnings(Suit::Clubs, Decimal::from(3)), Decimal::from(12));
        assert_eq!(bet.winnings(Suit::Spades, Decimal::from(3)), Decimal::ZERO);
    }

    #[test]
    fn test_color_bet_pays_twice() {
        let red = Bet::Color(Color::Red);
        assert_eq!(red.payout_multiplier(Suit::Hearts), 2);
        assert_eq!(red.payout_multiplier(Suit::Diamonds), 2);
        assert_eq!(red.payout_multiplier(Suit::Clubs), 0);

        let black = Bet::Color(Color::Black);
        assert_eq!(black.payout_multiplier(Suit::Spades), 2);
        assert_eq!(black.payout_multiplier(Suit::Hearts), 0);
    }

    #[test]
    fn test_parse() {
        assert_eq!("Red".parse::<Bet>().unwrap(), Bet::Color(Color::Red));
        assert_eq!("black".parse::<Bet>().unwrap(), Bet::Color(Color::Black));
        assert_eq!("hearts".parse::<Bet>().unwrap(), Bet::Suit(Suit::Hearts));
        assert!("green".parse::<Bet>().is_err());
    }
}
