use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use log::info;

use super::require_tournament;
use crate::config::settings::EngineConfig;
use crate::domain::models::{Deck, DeckId, Match, Player, PlayerId, TournamentId, TournamentStatus};
use crate::rating::engine::{replay_deck_ratings, replay_player_ratings};
use crate::store::TournamentStore;

/// Rating finalization for a finished tournament.
pub struct RatingService<'a> {
    config: &'a EngineConfig,
}

impl<'a> RatingService<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Replays the tournament's completed matches against stored ratings and
    /// commits final player values, deck values, and the history log in one
    /// terminal write, then marks the tournament completed.
    ///
    /// Not idempotent: replaying commits deltas on top of whatever the store
    /// holds, so a second invocation would double-apply them. The completed
    /// status doubles as the re-invocation guard: a rerun must first restore
    /// baseline ratings and reopen the tournament.
    pub fn finalize_tournament_ratings(
        &self,
        store: &mut impl TournamentStore,
        tournament_id: TournamentId,
    ) -> Result<()> {
        let mut tournament = require_tournament(store, tournament_id)?;
        if tournament.status == TournamentStatus::Completed {
            bail!("tournament {tournament_id} is already finalized");
        }

        let completed: Vec<Match> = store
            .matches(tournament_id)?
            .into_iter()
            .filter(Match::is_completed)
            .collect();

        if completed.is_empty() {
            info!("tournament {tournament_id}: no completed matches, nothing to replay");
        } else {
            self.replay_and_commit(store, tournament_id, &completed)?;
        }

        tournament.status = TournamentStatus::Completed;
        tournament.completed_at = Some(Utc::now().naive_utc());
        store.save_tournament(&tournament)?;
        info!("tournament {tournament_id} finalized");
        Ok(())
    }

    fn replay_and_commit(
        &self,
        store: &mut impl TournamentStore,
        tournament_id: TournamentId,
        completed: &[Match],
    ) -> Result<()> {
        let participant_rows = store.participants(tournament_id)?;
        let participants = participant_rows
            .iter()
            .map(|p| (p.id, p.clone()))
            .collect::<HashMap<_, _>>();

        // Resolve whatever exists; the replay turns a reference a match
        // actually needs into a fatal DataIntegrity error.
        let mut players: HashMap<PlayerId, Player> = HashMap::new();
        let mut decks: HashMap<DeckId, Deck> = HashMap::new();
        for row in &participant_rows {
            if let Some(player) = store.player(row.player_id)? {
                players.insert(player.id, player);
            }
            if let Some(deck_id) = row.deck_id {
                if let Some(deck) = store.deck(deck_id)? {
                    decks.insert(deck.id, deck);
                }
            }
        }

        let outcome = replay_player_ratings(
            tournament_id,
            completed,
            &participants,
            &players,
            &self.config.elo,
        )?;
        for player in &outcome.players {
            store
                .save_player(player)
                .with_context(|| format!("failed to commit rating for player {}", player.id))?;
        }
        for row in outcome.history {
            store.append_history(row)?;
        }

        let deck_outcome =
            replay_deck_ratings(completed, &participants, &decks, &self.config.elo)?;
        for deck in &deck_outcome.decks {
            store
                .save_deck(deck)
                .with_context(|| format!("failed to commit rating for deck {}", deck.id))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{MatchResult, TournamentMode};
    use crate::error::EngineError;
    use crate::services::rounds::RoundService;
    use crate::store::MemoryStore;

    fn two_player_tournament(deckless: bool) -> (MemoryStore, TournamentId, Vec<i64>) {
        let mut store = MemoryStore::new();
        let t = store
            .insert_tournament("Weekly", TournamentMode::Normal, 1)
            .unwrap();
        let mut participant_ids = Vec::new();
        for i in 1..=2 {
            let player = store
                .insert_player(&format!("Player {i}"), 1500.0)
                .unwrap();
            let deck = if deckless {
                None
            } else {
                Some(
                    store
                        .insert_deck(&format!("Deck {i}"), None, 1500.0)
                        .unwrap()
                        .id,
                )
            };
            participant_ids.push(
                store
                    .insert_participant(t.id, player.id, deck)
                    .unwrap()
                    .id,
            );
        }
        (store, t.id, participant_ids)
    }

    #[test]
    fn finalize_commits_ratings_history_and_status() {
        let (mut store, tid, ids) = two_player_tournament(false);
        let config = EngineConfig::new();
        let rounds = RoundService::new(&config);
        let row = store.insert_match(tid, 1, ids[0], Some(ids[1])).unwrap();
        rounds
            .record_result(&mut store, row.id, MatchResult::Player1, None)
            .unwrap();

        RatingService::new(&config)
            .finalize_tournament_ratings(&mut store, tid)
            .unwrap();

        let p1 = store.participant(ids[0]).unwrap().unwrap();
        let winner = store.player(p1.player_id).unwrap().unwrap();
        assert!((winner.elo - 1520.0).abs() < 1e-9);
        assert!((winner.peak_elo - 1520.0).abs() < 1e-9);

        let history = store.history_for_match(row.id).unwrap();
        assert_eq!(history.len(), 2);

        let deck = store.deck(p1.deck_id.unwrap()).unwrap().unwrap();
        assert!((deck.elo - 1512.0).abs() < 1e-9);

        let t = store.tournament(tid).unwrap().unwrap();
        assert_eq!(t.status, TournamentStatus::Completed);
        assert!(t.completed_at.is_some());
    }

    #[test]
    fn finalize_without_matches_is_a_no_op_commit() {
        let (mut store, tid, ids) = two_player_tournament(true);
        let config = EngineConfig::new();

        RatingService::new(&config)
            .finalize_tournament_ratings(&mut store, tid)
            .unwrap();

        let p1 = store.participant(ids[0]).unwrap().unwrap();
        let player = store.player(p1.player_id).unwrap().unwrap();
        assert!((player.elo - 1500.0).abs() < 1e-9);
        assert_eq!(player.games_played, 0);
        let t = store.tournament(tid).unwrap().unwrap();
        assert_eq!(t.status, TournamentStatus::Completed);
    }

    #[test]
    fn finalize_twice_is_refused() {
        let (mut store, tid, _) = two_player_tournament(true);
        let config = EngineConfig::new();
        let service = RatingService::new(&config);

        service.finalize_tournament_ratings(&mut store, tid).unwrap();
        assert!(service.finalize_tournament_ratings(&mut store, tid).is_err());
    }

    #[test]
    fn deckless_matches_leave_deck_ratings_alone() {
        let (mut store, tid, ids) = two_player_tournament(true);
        let config = EngineConfig::new();
        let rounds = RoundService::new(&config);
        let row = store.insert_match(tid, 1, ids[0], Some(ids[1])).unwrap();
        rounds
            .record_result(&mut store, row.id, MatchResult::Player2, None)
            .unwrap();

        RatingService::new(&config)
            .finalize_tournament_ratings(&mut store, tid)
            .unwrap();

        let p2 = store.participant(ids[1]).unwrap().unwrap();
        let winner = store.player(p2.player_id).unwrap().unwrap();
        assert!((winner.elo - 1520.0).abs() < 1e-9);
    }

    #[test]
    fn bye_only_tournament_produces_no_history() {
        let mut store = MemoryStore::new();
        let t = store
            .insert_tournament("Tiny", TournamentMode::Normal, 0)
            .unwrap();
        let player = store.insert_player("Solo", 1500.0).unwrap();
        let participant = store.insert_participant(t.id, player.id, None).unwrap();
        let mut bye = store.insert_match(t.id, 1, participant.id, None).unwrap();
        bye.result = Some(MatchResult::Bye);
        store.save_match(&bye).unwrap();

        let config = EngineConfig::new();
        RatingService::new(&config)
            .finalize_tournament_ratings(&mut store, t.id)
            .unwrap();

        assert!(store.history_for_player(player.id).unwrap().is_empty());
        let after = store.player(player.id).unwrap().unwrap();
        assert_eq!(after.games_played, 0);
    }

    #[test]
    fn vanished_player_aborts_the_whole_replay() {
        let (mut store, tid, ids) = two_player_tournament(true);
        let config = EngineConfig::new();
        let rounds = RoundService::new(&config);
        let row = store.insert_match(tid, 1, ids[0], Some(ids[1])).unwrap();
        rounds
            .record_result(&mut store, row.id, MatchResult::Player1, None)
            .unwrap();

        // Re-point a participant at a player id that was never created.
        let mut broken = store.participant(ids[1]).unwrap().unwrap();
        broken.player_id = 9999;
        store.save_participant(&broken).unwrap();

        let err = RatingService::new(&config)
            .finalize_tournament_ratings(&mut store, tid)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::DataIntegrity(_))
        ));
        // Nothing was committed: tournament still live-able, player intact.
        let t = store.tournament(tid).unwrap().unwrap();
        assert_ne!(t.status, TournamentStatus::Completed);
    }
}
