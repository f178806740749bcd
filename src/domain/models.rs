use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub type PlayerId = i64;
pub type DeckId = i64;
pub type TournamentId = i64;
pub type ParticipantId = i64;
pub type MatchId = i64;

/// A competitor's global record. Ratings here are cross-tournament; the
/// per-tournament state lives on `TournamentPlayer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub elo: f64,
    /// Running maximum of `elo`; never drops when the rating does.
    pub peak_elo: f64,
    pub games_played: i32,
    pub wins: i32,
    pub losses: i32,
    pub ties: i32,
    pub radar: RadarAttributes,
    pub created_at: Option<NaiveDateTime>,
}

impl Player {
    pub fn new(id: PlayerId, name: &str, starting_elo: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            elo: starting_elo,
            peak_elo: starting_elo,
            games_played: 0,
            wins: 0,
            losses: 0,
            ties: 0,
            radar: RadarAttributes::default(),
            created_at: None,
        }
    }

    pub fn win_rate(&self) -> f64 {
        if self.games_played == 0 {
            return 0.0;
        }
        f64::from(self.wins) / f64::from(self.games_played)
    }

    /// Bayesian-adjusted win rate; the +3/+6 smoothing keeps tiny samples
    /// away from 0% and 100%.
    pub fn adjusted_win_rate(&self) -> f64 {
        f64::from(self.wins + 3) / f64::from(self.games_played + 6)
    }
}

/// Display-only skill facets on a 0-100 scale. `clutch` and `top_cut` stay
/// `None` until enough match/placement history exists to compute them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RadarAttributes {
    pub skill: f64,
    pub consistency: f64,
    pub experience: f64,
    pub clutch: Option<f64>,
    pub top_cut: Option<f64>,
}

impl Default for RadarAttributes {
    fn default() -> Self {
        Self {
            skill: 50.0,
            consistency: 50.0,
            experience: 0.0,
            clutch: None,
            top_cut: None,
        }
    }
}

/// A deck archetype. `parent_id` links a variant to the deck it derives
/// from; the chain is a tree, never a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deck {
    pub id: DeckId,
    pub name: String,
    pub parent_id: Option<DeckId>,
    pub elo: f64,
    pub games_played: i32,
    pub wins: i32,
    pub created_at: Option<NaiveDateTime>,
}

impl Deck {
    pub fn new(id: DeckId, name: &str, parent_id: Option<DeckId>, starting_elo: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            parent_id,
            elo: starting_elo,
            games_played: 0,
            wins: 0,
            created_at: None,
        }
    }

    pub fn win_rate(&self) -> f64 {
        if self.games_played == 0 {
            return 0.0;
        }
        f64::from(self.wins) / f64::from(self.games_played)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentMode {
    Normal,
    BestOfThree,
}

/// One-directional: Upcoming -> Live -> Completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    Upcoming,
    Live,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub mode: TournamentMode,
    /// Points awarded for a draw: 0 or 1.
    pub draw_points: i32,
    pub status: TournamentStatus,
    pub current_round: i32,
    pub created_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
}

impl Tournament {
    pub fn new(id: TournamentId, name: &str, mode: TournamentMode, draw_points: i32) -> Self {
        Self {
            id,
            name: name.to_string(),
            mode,
            draw_points,
            status: TournamentStatus::Upcoming,
            current_round: 0,
            created_at: None,
            completed_at: None,
        }
    }
}

/// One player's participation in one tournament. The pairing engine and
/// standings operate on these, not on the global `Player`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentPlayer {
    pub id: ParticipantId,
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub deck_id: Option<DeckId>,
    pub points: i32,
    pub wins: i32,
    pub losses: i32,
    pub ties: i32,
    pub byes: i32,
    pub game_wins: i32,
    pub game_losses: i32,
    pub is_tardy: bool,
    pub dropped: bool,
    pub dropped_round: Option<i32>,
}

impl TournamentPlayer {
    pub fn new(
        id: ParticipantId,
        tournament_id: TournamentId,
        player_id: PlayerId,
        deck_id: Option<DeckId>,
    ) -> Self {
        Self {
            id,
            tournament_id,
            player_id,
            deck_id,
            points: 0,
            wins: 0,
            losses: 0,
            ties: 0,
            byes: 0,
            game_wins: 0,
            game_losses: 0,
            is_tardy: false,
            dropped: false,
            dropped_round: None,
        }
    }

    /// Tiebreaker denominator: decided matches only, ties excluded.
    pub fn matches_played(&self) -> i32 {
        self.wins + self.losses
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    Player1,
    Player2,
    Draw,
    /// Both sides are recorded as having lost (e.g. simultaneous game loss).
    DoubleLoss,
    Bye,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub round_number: i32,
    pub player1_id: ParticipantId,
    /// `None` marks a bye row.
    pub player2_id: Option<ParticipantId>,
    /// `None` while the match is pending; immutable once set.
    pub result: Option<MatchResult>,
    pub p1_game_wins: i32,
    pub p2_game_wins: i32,
    pub created_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
}

impl Match {
    pub fn is_bye(&self) -> bool {
        self.player2_id.is_none()
    }

    pub fn is_completed(&self) -> bool {
        self.result.is_some()
    }

    pub fn involves(&self, participant: ParticipantId) -> bool {
        self.player1_id == participant || self.player2_id == Some(participant)
    }

    /// The other participant of a completed pairing, if any.
    pub fn opponent_of(&self, participant: ParticipantId) -> Option<ParticipantId> {
        if self.player1_id == participant {
            self.player2_id
        } else if self.player2_id == Some(participant) {
            Some(self.player1_id)
        } else {
            None
        }
    }
}

/// Append-only audit record of one rating change for one player in one match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EloHistory {
    pub id: i64,
    pub player_id: PlayerId,
    pub match_id: MatchId,
    pub tournament_id: TournamentId,
    pub elo_before: f64,
    pub elo_after: f64,
    pub elo_change: f64,
    pub recorded_at: Option<NaiveDateTime>,
}
