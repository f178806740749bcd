pub mod engine;
pub mod model;
pub mod radar;

pub use engine::{
    DeckReplayOutcome, PlayerReplayOutcome, replay_deck_ratings, replay_player_ratings,
};
pub use model::{expected_score, k_factor};
