pub mod memory;

pub use memory::MemoryStore;

use anyhow::Result;

use crate::domain::models::{
    Deck, DeckId, EloHistory, Match, MatchId, ParticipantId, Player, PlayerId, Tournament,
    TournamentId, TournamentMode, TournamentPlayer,
};

/// Data-access contract the engine operates against.
///
/// The engine never touches a database session directly; every operation
/// reads and writes through this interface, so the host application can back
/// it with whatever persistence it owns and tests can use [`MemoryStore`].
pub trait TournamentStore {
    // Reads

    fn tournament(&self, id: TournamentId) -> Result<Option<Tournament>>;

    /// All tournaments that have reached `Completed`, in id order.
    fn completed_tournaments(&self) -> Result<Vec<Tournament>>;

    /// Participation records of one tournament, in registration order.
    fn participants(&self, tournament_id: TournamentId) -> Result<Vec<TournamentPlayer>>;

    fn participant(&self, id: ParticipantId) -> Result<Option<TournamentPlayer>>;

    /// Match rows of one tournament, ordered by `(round_number, id)`: the
    /// replay order the rating engine depends on.
    fn matches(&self, tournament_id: TournamentId) -> Result<Vec<Match>>;

    fn match_record(&self, id: MatchId) -> Result<Option<Match>>;

    fn player(&self, id: PlayerId) -> Result<Option<Player>>;

    /// Every player with at least one recorded game (the radar population).
    fn rated_players(&self) -> Result<Vec<Player>>;

    fn deck(&self, id: DeckId) -> Result<Option<Deck>>;

    fn history_for_player(&self, player_id: PlayerId) -> Result<Vec<EloHistory>>;

    /// Both players' history rows for one match (empty until finalized).
    fn history_for_match(&self, match_id: MatchId) -> Result<Vec<EloHistory>>;

    // Writes

    fn insert_player(&mut self, name: &str, starting_elo: f64) -> Result<Player>;

    fn insert_deck(
        &mut self,
        name: &str,
        parent_id: Option<DeckId>,
        starting_elo: f64,
    ) -> Result<Deck>;

    fn insert_tournament(
        &mut self,
        name: &str,
        mode: TournamentMode,
        draw_points: i32,
    ) -> Result<Tournament>;

    fn insert_participant(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        deck_id: Option<DeckId>,
    ) -> Result<TournamentPlayer>;

    /// Creates a pending match row (no result yet). `player2` is `None` for
    /// a bye row.
    fn insert_match(
        &mut self,
        tournament_id: TournamentId,
        round_number: i32,
        player1: ParticipantId,
        player2: Option<ParticipantId>,
    ) -> Result<Match>;

    fn save_player(&mut self, player: &Player) -> Result<()>;

    fn save_deck(&mut self, deck: &Deck) -> Result<()>;

    fn save_tournament(&mut self, tournament: &Tournament) -> Result<()>;

    fn save_participant(&mut self, participant: &TournamentPlayer) -> Result<()>;

    /// Rejects any attempt to change a result that is already set.
    fn save_match(&mut self, record: &Match) -> Result<()>;

    /// Appends one rating-change record; the store assigns the id.
    fn append_history(&mut self, record: EloHistory) -> Result<EloHistory>;
}
