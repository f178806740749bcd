use crate::domain::models::{Player, RadarAttributes};

/// 30 games maps to full experience: ln(30 + 1) / ln(31) == 1.
const EXPERIENCE_FULL_AT: f64 = 31.0;
/// A top-4 finish counts toward the top-cut rate.
const TOP_CUT_PLACING: usize = 4;

/// One completed match considered for the clutch facet.
#[derive(Debug, Clone, Copy)]
pub struct ClutchSample {
    /// Opponent's rating at the time of the match was above the player's.
    pub opponent_was_higher: bool,
    pub won: bool,
}

/// Percentile of `elo` within the rated population (rating less than or
/// equal, inclusive of the player's own entry). 50.0 when nobody has played
/// yet.
pub fn skill_percentile(elo: f64, population_elos: &[f64]) -> f64 {
    if population_elos.is_empty() {
        return 50.0;
    }
    let at_or_below = population_elos.iter().filter(|&&e| e <= elo).count();
    at_or_below as f64 / population_elos.len() as f64 * 100.0
}

/// Bayesian-adjusted win rate on a 0-100 scale.
pub fn consistency(player: &Player) -> f64 {
    player.adjusted_win_rate() * 100.0
}

/// Log-scaled games played, saturating at 100.
pub fn experience(games_played: i32) -> f64 {
    if games_played <= 0 {
        return 0.0;
    }
    let scaled = (f64::from(games_played) + 1.0).ln() / EXPERIENCE_FULL_AT.ln() * 100.0;
    scaled.min(100.0)
}

/// Win rate against higher-rated opponents. `None` until the player has
/// faced at least one.
pub fn clutch(samples: &[ClutchSample]) -> Option<f64> {
    let uphill: Vec<&ClutchSample> =
        samples.iter().filter(|s| s.opponent_was_higher).collect();
    if uphill.is_empty() {
        return None;
    }
    let wins = uphill.iter().filter(|s| s.won).count();
    Some(wins as f64 / uphill.len() as f64 * 100.0)
}

/// Fraction of completed tournaments finished in the top 4. `None` until at
/// least one tournament has been completed.
pub fn top_cut_rate(placements: &[usize]) -> Option<f64> {
    if placements.is_empty() {
        return None;
    }
    let top = placements.iter().filter(|&&p| p <= TOP_CUT_PLACING).count();
    Some(top as f64 / placements.len() as f64 * 100.0)
}

/// All five facets, rounded to one decimal like the rest of the profile
/// display.
pub fn compute(
    player: &Player,
    population_elos: &[f64],
    clutch_samples: &[ClutchSample],
    placements: &[usize],
) -> RadarAttributes {
    RadarAttributes {
        skill: round1(skill_percentile(player.elo, population_elos)),
        consistency: round1(consistency(player)),
        experience: round1(experience(player.games_played)),
        clutch: clutch(clutch_samples).map(round1),
        top_cut: top_cut_rate(placements).map(round1),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
