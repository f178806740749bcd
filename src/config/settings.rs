pub struct EloSettings {
    pub starting_elo: f64,
    pub k_factor_new: i32,
    pub k_factor_established: i32,
    pub k_factor_veteran: i32,
    /// Games played at which a player leaves the "new" tier (inclusive).
    pub established_games: i32,
    /// Games played at which a player enters the "veteran" tier (inclusive).
    pub veteran_games: i32,
    pub double_loss_penalty: f64,
    /// Decks use a single fixed K-factor regardless of experience.
    pub deck_k_factor: f64,
}

impl Default for EloSettings {
    fn default() -> Self {
        Self {
            starting_elo: 1500.0,
            k_factor_new: 40,
            k_factor_established: 24,
            k_factor_veteran: 16,
            established_games: 15,
            veteran_games: 30,
            double_loss_penalty: 8.0,
            deck_k_factor: 24.0,
        }
    }
}

pub struct TiebreakSettings {
    /// Floor applied to each opponent's match-win rate in OMW/OOWP.
    pub match_win_floor: f64,
    /// Floor applied to game-win rates in GWP/OGWP (best-of-three mode).
    pub game_win_floor: f64,
}

impl Default for TiebreakSettings {
    fn default() -> Self {
        Self {
            match_win_floor: 0.25,
            game_win_floor: 0.33,
        }
    }
}

pub struct EngineConfig {
    pub elo: EloSettings,
    pub tiebreak: TiebreakSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            elo: EloSettings::default(),
            tiebreak: TiebreakSettings::default(),
        }
    }
}

// Passed explicitly (dependency injection) rather than held in globals, so
// two tournaments processed in parallel can never share mutable state.
