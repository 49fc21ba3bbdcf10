//! Suits game: bets, payouts and the per-player session

pub mod bet;
pub mod session;

pub use bet::Bet;
pub use session::{GameSession, MAX_JACKPOT_REDRAWS, RoundResult, SessionError, max_wager};
