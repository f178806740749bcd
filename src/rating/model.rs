use crate::config::settings::EloSettings;

/// Logistic expectation of player A scoring against player B.
///
/// Symmetric: `expected_score(a, b) + expected_score(b, a) == 1`.
pub fn expected_score(rating_a: f64, rating_b: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf((rating_b - rating_a) / 400.0))
}

/// K-factor tiered by experience. Boundaries are inclusive-low: a player
/// with exactly `established_games` played is already established.
pub fn k_factor(games_played: i32, settings: &EloSettings) -> i32 {
    if games_played < settings.established_games {
        settings.k_factor_new
    } else if games_played < settings.veteran_games {
        settings.k_factor_established
    } else {
        settings.k_factor_veteran
    }
}
