use std::collections::BTreeMap;

use anyhow::{Result, bail};
use chrono::Utc;

use super::TournamentStore;
use crate::domain::models::{
    Deck, DeckId, EloHistory, Match, MatchId, ParticipantId, Player, PlayerId, Tournament,
    TournamentId, TournamentMode, TournamentPlayer, TournamentStatus,
};
use crate::error::EngineError;

/// In-memory store used by the simulation and the test suite.
///
/// Ordered maps keep reads deterministic: entities come back in insertion-id
/// order, matches in `(round_number, id)` order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    players: BTreeMap<PlayerId, Player>,
    decks: BTreeMap<DeckId, Deck>,
    tournaments: BTreeMap<TournamentId, Tournament>,
    participants: BTreeMap<ParticipantId, TournamentPlayer>,
    matches: BTreeMap<MatchId, Match>,
    history: Vec<EloHistory>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Walks the parent chain of `deck`; a repeat visit means the variant
    /// tree degenerated into a cycle.
    fn check_parent_chain(&self, deck: &Deck) -> Result<()> {
        let mut seen = vec![deck.id];
        let mut cursor = deck.parent_id;
        while let Some(parent_id) = cursor {
            if seen.contains(&parent_id) {
                return Err(EngineError::DataIntegrity(format!(
                    "deck {} introduces a cycle in the variant tree",
                    deck.id
                ))
                .into());
            }
            let Some(parent) = self.decks.get(&parent_id) else {
                return Err(EngineError::DataIntegrity(format!(
                    "deck {} references missing parent deck {}",
                    deck.id, parent_id
                ))
                .into());
            };
            seen.push(parent_id);
            cursor = parent.parent_id;
        }
        Ok(())
    }
}

impl TournamentStore for MemoryStore {
    fn tournament(&self, id: TournamentId) -> Result<Option<Tournament>> {
        Ok(self.tournaments.get(&id).cloned())
    }

    fn completed_tournaments(&self) -> Result<Vec<Tournament>> {
        Ok(self
            .tournaments
            .values()
            .filter(|t| t.status == TournamentStatus::Completed)
            .cloned()
            .collect())
    }

    fn participants(&self, tournament_id: TournamentId) -> Result<Vec<TournamentPlayer>> {
        Ok(self
            .participants
            .values()
            .filter(|p| p.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    fn participant(&self, id: ParticipantId) -> Result<Option<TournamentPlayer>> {
        Ok(self.participants.get(&id).cloned())
    }

    fn matches(&self, tournament_id: TournamentId) -> Result<Vec<Match>> {
        let mut rows: Vec<Match> = self
            .matches
            .values()
            .filter(|m| m.tournament_id == tournament_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| (m.round_number, m.id));
        Ok(rows)
    }

    fn match_record(&self, id: MatchId) -> Result<Option<Match>> {
        Ok(self.matches.get(&id).cloned())
    }

    fn player(&self, id: PlayerId) -> Result<Option<Player>> {
        Ok(self.players.get(&id).cloned())
    }

    fn rated_players(&self) -> Result<Vec<Player>> {
        Ok(self
            .players
            .values()
            .filter(|p| p.games_played > 0)
            .cloned()
            .collect())
    }

    fn deck(&self, id: DeckId) -> Result<Option<Deck>> {
        Ok(self.decks.get(&id).cloned())
    }

    fn history_for_player(&self, player_id: PlayerId) -> Result<Vec<EloHistory>> {
        Ok(self
            .history
            .iter()
            .filter(|h| h.player_id == player_id)
            .cloned()
            .collect())
    }

    fn history_for_match(&self, match_id: MatchId) -> Result<Vec<EloHistory>> {
        Ok(self
            .history
            .iter()
            .filter(|h| h.match_id == match_id)
            .cloned()
            .collect())
    }

    fn insert_player(&mut self, name: &str, starting_elo: f64) -> Result<Player> {
        let id = self.allocate_id();
        let mut player = Player::new(id, name, starting_elo);
        player.created_at = Some(Utc::now().naive_utc());
        self.players.insert(id, player.clone());
        Ok(player)
    }

    fn insert_deck(
        &mut self,
        name: &str,
        parent_id: Option<DeckId>,
        starting_elo: f64,
    ) -> Result<Deck> {
        let id = self.allocate_id();
        let mut deck = Deck::new(id, name, parent_id, starting_elo);
        deck.created_at = Some(Utc::now().naive_utc());
        self.check_parent_chain(&deck)?;
        self.decks.insert(id, deck.clone());
        Ok(deck)
    }

    fn insert_tournament(
        &mut self,
        name: &str,
        mode: TournamentMode,
        draw_points: i32,
    ) -> Result<Tournament> {
        let id = self.allocate_id();
        let mut tournament = Tournament::new(id, name, mode, draw_points);
        tournament.created_at = Some(Utc::now().naive_utc());
        self.tournaments.insert(id, tournament.clone());
        Ok(tournament)
    }

    fn insert_participant(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        deck_id: Option<DeckId>,
    ) -> Result<TournamentPlayer> {
        if !self.tournaments.contains_key(&tournament_id) {
            bail!("cannot register into unknown tournament {tournament_id}");
        }
        if !self.players.contains_key(&player_id) {
            bail!("cannot register unknown player {player_id}");
        }
        let id = self.allocate_id();
        let participant = TournamentPlayer::new(id, tournament_id, player_id, deck_id);
        self.participants.insert(id, participant.clone());
        Ok(participant)
    }

    fn insert_match(
        &mut self,
        tournament_id: TournamentId,
        round_number: i32,
        player1: ParticipantId,
        player2: Option<ParticipantId>,
    ) -> Result<Match> {
        let id = self.allocate_id();
        let record = Match {
            id,
            tournament_id,
            round_number,
            player1_id: player1,
            player2_id: player2,
            result: None,
            p1_game_wins: 0,
            p2_game_wins: 0,
            created_at: Some(Utc::now().naive_utc()),
            completed_at: None,
        };
        self.matches.insert(id, record.clone());
        Ok(record)
    }

    fn save_player(&mut self, player: &Player) -> Result<()> {
        if !self.players.contains_key(&player.id) {
            bail!("cannot save unknown player {}", player.id);
        }
        self.players.insert(player.id, player.clone());
        Ok(())
    }

    fn save_deck(&mut self, deck: &Deck) -> Result<()> {
        if !self.decks.contains_key(&deck.id) {
            bail!("cannot save unknown deck {}", deck.id);
        }
        self.check_parent_chain(deck)?;
        self.decks.insert(deck.id, deck.clone());
        Ok(())
    }

    fn save_tournament(&mut self, tournament: &Tournament) -> Result<()> {
        if !self.tournaments.contains_key(&tournament.id) {
            bail!("cannot save unknown tournament {}", tournament.id);
        }
        self.tournaments.insert(tournament.id, tournament.clone());
        Ok(())
    }

    fn save_participant(&mut self, participant: &TournamentPlayer) -> Result<()> {
        if !self.participants.contains_key(&participant.id) {
            bail!("cannot save unknown participant {}", participant.id);
        }
        self.participants.insert(participant.id, participant.clone());
        Ok(())
    }

    fn save_match(&mut self, record: &Match) -> Result<()> {
        let Some(existing) = self.matches.get(&record.id) else {
            bail!("cannot save unknown match {}", record.id);
        };
        if existing.result.is_some() && existing.result != record.result {
            return Err(EngineError::MatchAlreadyDecided(record.id).into());
        }
        self.matches.insert(record.id, record.clone());
        Ok(())
    }

    fn append_history(&mut self, mut record: EloHistory) -> Result<EloHistory> {
        record.id = self.allocate_id();
        record.recorded_at = Some(Utc::now().naive_utc());
        self.history.push(record.clone());
        Ok(record)
    }
}
