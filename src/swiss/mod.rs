pub mod pairing;
pub mod standings;
pub mod tiebreak;

pub use pairing::{RoundPairing, pair_round};
pub use standings::{StandingRow, compute_standings};
pub use tiebreak::TiebreakContext;
