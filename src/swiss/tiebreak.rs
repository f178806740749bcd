use std::collections::HashMap;

use crate::config::settings::TiebreakSettings;
use crate::domain::models::{Match, ParticipantId, TournamentPlayer};

/// Read-only snapshot of one tournament used to compute standings
/// tiebreakers. All percentages are pure functions of completed match
/// history; results are indexed per instantiation, never cached across
/// calls.
pub struct TiebreakContext<'a> {
    by_id: HashMap<ParticipantId, &'a TournamentPlayer>,
    matches: &'a [Match],
    current_round: i32,
    settings: &'a TiebreakSettings,
}

impl<'a> TiebreakContext<'a> {
    pub fn new(
        participants: &'a [TournamentPlayer],
        matches: &'a [Match],
        current_round: i32,
        settings: &'a TiebreakSettings,
    ) -> Self {
        let by_id = participants.iter().map(|p| (p.id, p)).collect();
        Self {
            by_id,
            matches,
            current_round,
            settings,
        }
    }

    /// Opponents faced in completed matches. A rematch contributes the
    /// opponent once per match; byes contribute nothing.
    fn opponents_of(&self, participant: ParticipantId) -> Vec<&'a TournamentPlayer> {
        self.matches
            .iter()
            .filter(|m| m.is_completed())
            .filter_map(|m| m.opponent_of(participant))
            .filter_map(|opponent_id| self.by_id.get(&opponent_id).copied())
            .collect()
    }

    fn floored_match_win_rate(&self, opponent: &TournamentPlayer) -> f64 {
        let played = opponent.matches_played();
        if played == 0 {
            return self.settings.match_win_floor;
        }
        (f64::from(opponent.wins) / f64::from(played)).max(self.settings.match_win_floor)
    }

    fn floored_game_win_rate(&self, opponent: &TournamentPlayer) -> f64 {
        let games = opponent.game_wins + opponent.game_losses;
        if games == 0 {
            return self.settings.game_win_floor;
        }
        (f64::from(opponent.game_wins) / f64::from(games)).max(self.settings.game_win_floor)
    }

    /// Opponent match-win percentage. 0.0 before any round has finished or
    /// while the participant has no opponents; otherwise the average of each
    /// opponent's floored match-win rate.
    pub fn omw(&self, participant: ParticipantId) -> f64 {
        if self.current_round == 0 {
            return 0.0;
        }
        let opponents = self.opponents_of(participant);
        if opponents.is_empty() {
            return 0.0;
        }
        let total: f64 = opponents
            .iter()
            .map(|o| self.floored_match_win_rate(o))
            .sum();
        total / opponents.len() as f64
    }

    /// Opponents'-opponents' win percentage: one level of recursion over the
    /// same opponent set, not iterated to a fixed point.
    pub fn oowp(&self, participant: ParticipantId) -> f64 {
        if self.current_round == 0 {
            return 0.0;
        }
        let opponents = self.opponents_of(participant);
        if opponents.is_empty() {
            return 0.0;
        }
        let total: f64 = opponents.iter().map(|o| self.omw(o.id)).sum();
        total / opponents.len() as f64
    }

    /// Own game-win percentage (best-of-three mode), floored.
    pub fn gwp(&self, participant: ParticipantId) -> f64 {
        match self.by_id.get(&participant) {
            Some(p) => self.floored_game_win_rate(p),
            None => self.settings.game_win_floor,
        }
    }

    /// Opponents' game-win percentage: the best-of-three analogue of OMW.
    pub fn ogwp(&self, participant: ParticipantId) -> f64 {
        if self.current_round == 0 {
            return 0.0;
        }
        let opponents = self.opponents_of(participant);
        if opponents.is_empty() {
            return 0.0;
        }
        let total: f64 = opponents
            .iter()
            .map(|o| self.floored_game_win_rate(o))
            .sum();
        total / opponents.len() as f64
    }
}
