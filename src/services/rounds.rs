use anyhow::{Context, Result, bail};
use chrono::Utc;
use log::info;
use rand::Rng;

use super::{require_participant, require_tournament};
use crate::config::settings::EngineConfig;
use crate::domain::models::{
    Match, MatchId, MatchResult, ParticipantId, TournamentId, TournamentStatus,
};
use crate::error::EngineError;
use crate::store::TournamentStore;
use crate::swiss::pairing::{self, RoundPairing};
use crate::swiss::standings::{StandingRow, compute_standings};

/// Match points for a win. Byes count as wins; draws are worth the
/// tournament's configured `draw_points`.
pub const WIN_POINTS: i32 = 3;

/// Round lifecycle orchestration: pairing over the store, persisting the
/// resulting match rows, and result entry.
pub struct RoundService<'a> {
    config: &'a EngineConfig,
}

impl<'a> RoundService<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Pairs `round_number` from current store state. Reads only; the rows
    /// come into being via [`RoundService::record_round`].
    pub fn pair_round(
        &self,
        store: &impl TournamentStore,
        tournament_id: TournamentId,
        round_number: i32,
    ) -> Result<RoundPairing> {
        self.pair_round_with(store, tournament_id, round_number, &mut rand::thread_rng())
    }

    /// Seedable variant used by tests and the simulation.
    pub fn pair_round_with(
        &self,
        store: &impl TournamentStore,
        tournament_id: TournamentId,
        round_number: i32,
        rng: &mut impl Rng,
    ) -> Result<RoundPairing> {
        require_tournament(store, tournament_id)?;
        let matches = store.matches(tournament_id)?;
        ensure_previous_rounds_complete(&matches, round_number)?;
        let participants = store.participants(tournament_id)?;
        let pairing = pairing::pair_round(
            &participants,
            &matches,
            round_number,
            &self.config.tiebreak,
            rng,
        )?;
        Ok(pairing)
    }

    /// Persists one round's pending match rows plus the bye row. The bye is
    /// terminal at creation and its recipient is credited a match win on the
    /// spot. Advances `current_round` and flips an upcoming tournament live.
    pub fn record_round(
        &self,
        store: &mut impl TournamentStore,
        tournament_id: TournamentId,
        round_number: i32,
        pairing: &RoundPairing,
    ) -> Result<Vec<Match>> {
        let mut tournament = require_tournament(store, tournament_id)?;
        let mut rows = Vec::with_capacity(pairing.pairs.len() + 1);

        for &(player1, player2) in &pairing.pairs {
            let row = store
                .insert_match(tournament_id, round_number, player1, Some(player2))
                .context("failed to persist pairing")?;
            rows.push(row);
        }
        if let Some(bye_participant) = pairing.bye {
            rows.push(self.record_bye(store, tournament_id, round_number, bye_participant)?);
        }

        if tournament.status == TournamentStatus::Upcoming {
            tournament.status = TournamentStatus::Live;
        }
        tournament.current_round = tournament.current_round.max(round_number);
        store.save_tournament(&tournament)?;

        info!(
            "tournament {tournament_id} round {round_number}: {} tables recorded, bye: {:?}",
            pairing.pairs.len(),
            pairing.bye
        );
        Ok(rows)
    }

    fn record_bye(
        &self,
        store: &mut impl TournamentStore,
        tournament_id: TournamentId,
        round_number: i32,
        bye_participant: ParticipantId,
    ) -> Result<Match> {
        let mut row = store.insert_match(tournament_id, round_number, bye_participant, None)?;
        row.result = Some(MatchResult::Bye);
        row.completed_at = Some(Utc::now().naive_utc());
        store.save_match(&row)?;

        let mut participant = require_participant(store, bye_participant)?;
        participant.points += WIN_POINTS;
        participant.wins += 1;
        participant.byes += 1;
        store.save_participant(&participant)?;
        Ok(row)
    }

    /// Records a terminal result on a pending match and updates both
    /// participants' tournament tallies. `game_score` is the best-of-three
    /// `(p1_games, p2_games)` split, ignored for byes and meaningless in
    /// normal mode.
    pub fn record_result(
        &self,
        store: &mut impl TournamentStore,
        match_id: MatchId,
        result: MatchResult,
        game_score: Option<(i32, i32)>,
    ) -> Result<()> {
        let mut row = store
            .match_record(match_id)?
            .with_context(|| format!("match {match_id} not found"))?;
        if row.result.is_some() {
            return Err(EngineError::MatchAlreadyDecided(match_id).into());
        }
        if result == MatchResult::Bye {
            bail!("byes are created when the round is recorded, not entered as results");
        }
        let player2_id = row.player2_id.ok_or_else(|| {
            EngineError::DataIntegrity(format!("match {match_id} has no second participant"))
        })?;

        let tournament = require_tournament(store, row.tournament_id)?;
        let mut p1 = require_participant(store, row.player1_id)?;
        let mut p2 = require_participant(store, player2_id)?;

        match result {
            MatchResult::Player1 => {
                p1.wins += 1;
                p1.points += WIN_POINTS;
                p2.losses += 1;
            }
            MatchResult::Player2 => {
                p2.wins += 1;
                p2.points += WIN_POINTS;
                p1.losses += 1;
            }
            MatchResult::Draw => {
                p1.ties += 1;
                p2.ties += 1;
                p1.points += tournament.draw_points;
                p2.points += tournament.draw_points;
            }
            MatchResult::DoubleLoss => {
                p1.losses += 1;
                p2.losses += 1;
            }
            MatchResult::Bye => unreachable!("rejected above"),
        }

        if let Some((p1_games, p2_games)) = game_score {
            row.p1_game_wins = p1_games;
            row.p2_game_wins = p2_games;
            p1.game_wins += p1_games;
            p1.game_losses += p2_games;
            p2.game_wins += p2_games;
            p2.game_losses += p1_games;
        }

        row.result = Some(result);
        row.completed_at = Some(Utc::now().naive_utc());
        store.save_match(&row)?;
        store.save_participant(&p1)?;
        store.save_participant(&p2)?;
        Ok(())
    }

    /// Marks a participant as withdrawn from `round` onward; they are
    /// excluded from pairing and standings but their history keeps feeding
    /// opponents' tiebreakers.
    pub fn drop_participant(
        &self,
        store: &mut impl TournamentStore,
        participant_id: ParticipantId,
        round: i32,
    ) -> Result<()> {
        let mut participant = require_participant(store, participant_id)?;
        participant.dropped = true;
        participant.dropped_round = Some(round);
        store.save_participant(&participant)?;
        info!("participant {participant_id} dropped in round {round}");
        Ok(())
    }

    /// Current standings with full tiebreakers.
    pub fn standings(
        &self,
        store: &impl TournamentStore,
        tournament_id: TournamentId,
    ) -> Result<Vec<StandingRow>> {
        let tournament = require_tournament(store, tournament_id)?;
        let participants = store.participants(tournament_id)?;
        let matches = store.matches(tournament_id)?;
        Ok(compute_standings(
            &tournament,
            &participants,
            &matches,
            &self.config.tiebreak,
        ))
    }
}

fn ensure_previous_rounds_complete(matches: &[Match], round_number: i32) -> Result<()> {
    let pending: Vec<&Match> = matches
        .iter()
        .filter(|m| m.round_number < round_number && m.result.is_none())
        .collect();
    if let Some(earliest) = pending.iter().map(|m| m.round_number).min() {
        return Err(EngineError::RoundNotComplete {
            round: round_number,
            pending_round: earliest,
            pending: pending.len(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TournamentMode;
    use crate::store::MemoryStore;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn seeded_store(
        player_count: usize,
        mode: TournamentMode,
        draw_points: i32,
    ) -> (MemoryStore, TournamentId, Vec<ParticipantId>) {
        let mut store = MemoryStore::new();
        let t = store.insert_tournament("Weekly", mode, draw_points).unwrap();
        let mut ids = Vec::new();
        for i in 1..=player_count {
            let p = store
                .insert_player(&format!("Player {i}"), 1500.0)
                .unwrap();
            ids.push(store.insert_participant(t.id, p.id, None).unwrap().id);
        }
        (store, t.id, ids)
    }

    #[test]
    fn recorded_round_goes_live_and_advances_current_round() {
        let (mut store, tid, _) = seeded_store(4, TournamentMode::Normal, 0);
        let config = EngineConfig::new();
        let service = RoundService::new(&config);
        let mut rng = StdRng::seed_from_u64(1);

        let pairing = service.pair_round_with(&store, tid, 1, &mut rng).unwrap();
        let rows = service.record_round(&mut store, tid, 1, &pairing).unwrap();

        assert_eq!(rows.len(), 2);
        let t = store.tournament(tid).unwrap().unwrap();
        assert_eq!(t.status, TournamentStatus::Live);
        assert_eq!(t.current_round, 1);
    }

    #[test]
    fn bye_row_is_terminal_and_credits_a_win() {
        let (mut store, tid, _) = seeded_store(5, TournamentMode::Normal, 0);
        let config = EngineConfig::new();
        let service = RoundService::new(&config);
        let mut rng = StdRng::seed_from_u64(2);

        let pairing = service.pair_round_with(&store, tid, 1, &mut rng).unwrap();
        let bye_id = pairing.bye.expect("odd field needs a bye");
        service.record_round(&mut store, tid, 1, &pairing).unwrap();

        let participant = store.participant(bye_id).unwrap().unwrap();
        assert_eq!(participant.points, WIN_POINTS);
        assert_eq!(participant.wins, 1);
        assert_eq!(participant.byes, 1);

        let bye_row = store
            .matches(tid)
            .unwrap()
            .into_iter()
            .find(|m| m.is_bye())
            .unwrap();
        assert_eq!(bye_row.result, Some(MatchResult::Bye));
    }

    #[test]
    fn pairing_next_round_requires_previous_results() {
        let (mut store, tid, _) = seeded_store(4, TournamentMode::Normal, 0);
        let config = EngineConfig::new();
        let service = RoundService::new(&config);
        let mut rng = StdRng::seed_from_u64(3);

        let pairing = service.pair_round_with(&store, tid, 1, &mut rng).unwrap();
        let rows = service.record_round(&mut store, tid, 1, &pairing).unwrap();

        let err = service
            .pair_round_with(&store, tid, 2, &mut rng)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::RoundNotComplete { pending: 2, .. })
        ));

        for row in &rows {
            service
                .record_result(&mut store, row.id, MatchResult::Player1, None)
                .unwrap();
        }
        assert!(service.pair_round_with(&store, tid, 2, &mut rng).is_ok());
    }

    #[test]
    fn draw_points_follow_tournament_configuration() {
        for draw_points in [0, 1] {
            let (mut store, tid, ids) = seeded_store(2, TournamentMode::Normal, draw_points);
            let config = EngineConfig::new();
            let service = RoundService::new(&config);
            let row = store.insert_match(tid, 1, ids[0], Some(ids[1])).unwrap();

            service
                .record_result(&mut store, row.id, MatchResult::Draw, None)
                .unwrap();

            for id in &ids {
                let p = store.participant(*id).unwrap().unwrap();
                assert_eq!(p.points, draw_points);
                assert_eq!(p.ties, 1);
            }
        }
    }

    #[test]
    fn double_loss_gives_no_points_and_two_losses() {
        let (mut store, tid, ids) = seeded_store(2, TournamentMode::Normal, 1);
        let config = EngineConfig::new();
        let service = RoundService::new(&config);
        let row = store.insert_match(tid, 1, ids[0], Some(ids[1])).unwrap();

        service
            .record_result(&mut store, row.id, MatchResult::DoubleLoss, None)
            .unwrap();

        for id in &ids {
            let p = store.participant(*id).unwrap().unwrap();
            assert_eq!(p.points, 0);
            assert_eq!(p.losses, 1);
        }
    }

    #[test]
    fn best_of_three_scores_accumulate_game_counts() {
        let (mut store, tid, ids) = seeded_store(2, TournamentMode::BestOfThree, 1);
        let config = EngineConfig::new();
        let service = RoundService::new(&config);
        let row = store.insert_match(tid, 1, ids[0], Some(ids[1])).unwrap();

        service
            .record_result(&mut store, row.id, MatchResult::Player1, Some((2, 1)))
            .unwrap();

        let p1 = store.participant(ids[0]).unwrap().unwrap();
        let p2 = store.participant(ids[1]).unwrap().unwrap();
        assert_eq!((p1.game_wins, p1.game_losses), (2, 1));
        assert_eq!((p2.game_wins, p2.game_losses), (1, 2));
        assert_eq!(p1.points, WIN_POINTS);
    }

    #[test]
    fn recording_twice_is_rejected() {
        let (mut store, tid, ids) = seeded_store(2, TournamentMode::Normal, 0);
        let config = EngineConfig::new();
        let service = RoundService::new(&config);
        let row = store.insert_match(tid, 1, ids[0], Some(ids[1])).unwrap();

        service
            .record_result(&mut store, row.id, MatchResult::Player1, None)
            .unwrap();
        let err = service
            .record_result(&mut store, row.id, MatchResult::Player2, None)
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<EngineError>(),
            Some(&EngineError::MatchAlreadyDecided(row.id))
        );
    }

    #[test]
    fn dropped_participants_leave_the_pairing_pool() {
        let (mut store, tid, ids) = seeded_store(4, TournamentMode::Normal, 0);
        let config = EngineConfig::new();
        let service = RoundService::new(&config);
        service.drop_participant(&mut store, ids[0], 1).unwrap();

        let mut rng = StdRng::seed_from_u64(4);
        let pairing = service.pair_round_with(&store, tid, 1, &mut rng).unwrap();
        assert_eq!(pairing.pairs.len(), 1);
        assert!(pairing.bye.is_some());
        assert_ne!(pairing.bye, Some(ids[0]));
    }
}
