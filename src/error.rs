use thiserror::Error;

use crate::domain::models::TournamentId;

/// Typed failure conditions of the pairing and rating engine.
///
/// Services wrap these in `anyhow::Error`; callers that need to branch on a
/// condition can downcast back to `EngineError`.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    /// Fewer than 2 active participants when pairing was requested.
    #[error("need at least 2 active players to pair, found {0}")]
    InsufficientPlayers(usize),

    /// A match, participant, player or deck reference could not be resolved
    /// during replay. Fatal for the whole replay: skipping the offending
    /// match would silently corrupt the rating accounting.
    #[error("data integrity failure: {0}")]
    DataIntegrity(String),

    #[error("tournament {0} not found")]
    TournamentNotFound(TournamentId),

    /// Round transitions require every match of earlier rounds to carry a
    /// terminal result.
    #[error("cannot pair round {round}: {pending} matches of round {pending_round} are unresolved")]
    RoundNotComplete {
        round: i32,
        pending_round: i32,
        pending: usize,
    },

    /// Match rows are immutable once a result is set.
    #[error("match {0} already has a result recorded")]
    MatchAlreadyDecided(i64),
}
