use std::collections::{BTreeMap, HashMap};

use log::{debug, info};

use super::model::{expected_score, k_factor};
use crate::config::settings::EloSettings;
use crate::domain::models::{
    Deck, DeckId, EloHistory, Match, MatchResult, ParticipantId, Player, PlayerId, TournamentId,
    TournamentPlayer,
};
use crate::error::EngineError;

/// Result of replaying one tournament's matches: updated player values and
/// the history rows to append. Committing both is the caller's terminal
/// write.
#[derive(Debug)]
pub struct PlayerReplayOutcome {
    pub players: Vec<Player>,
    pub history: Vec<EloHistory>,
}

#[derive(Debug)]
pub struct DeckReplayOutcome {
    pub decks: Vec<Deck>,
}

/// Per-replay working copy of a player's rating line. Seeded lazily from the
/// stored `Player` the first time a match touches them.
#[derive(Debug, Clone, Copy)]
struct WorkingPlayer {
    elo: f64,
    peak_elo: f64,
    games_played: i32,
    wins: i32,
    losses: i32,
}

impl WorkingPlayer {
    fn seed(player: &Player) -> Self {
        Self {
            elo: player.elo,
            peak_elo: player.peak_elo,
            games_played: player.games_played,
            wins: player.wins,
            losses: player.losses,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct WorkingDeck {
    elo: f64,
    games_played: i32,
    wins: i32,
}

impl WorkingDeck {
    fn seed(deck: &Deck) -> Self {
        Self {
            elo: deck.elo,
            games_played: deck.games_played,
            wins: deck.wins,
        }
    }
}

/// Replays `matches` (already in `(round, id)` order) against the players'
/// stored ratings and produces final values plus one history row per player
/// per non-bye match.
///
/// The working state lives and dies inside this call; nothing carries over
/// between tournaments. Replaying the same matches twice therefore requires
/// the caller to start again from the stored baseline; feeding a match
/// through two replays double-applies its deltas.
pub fn replay_player_ratings(
    tournament_id: TournamentId,
    matches: &[Match],
    participants: &HashMap<ParticipantId, TournamentPlayer>,
    players: &HashMap<PlayerId, Player>,
    settings: &EloSettings,
) -> Result<PlayerReplayOutcome, EngineError> {
    let mut working: BTreeMap<PlayerId, WorkingPlayer> = BTreeMap::new();
    let mut history = Vec::new();

    for m in matches {
        let Some(result) = m.result else { continue };
        if result == MatchResult::Bye || m.player2_id.is_none() {
            continue;
        }
        let (p1_id, p2_id) = resolve_player_pair(m, participants, players)?;

        let w1 = *working
            .entry(p1_id)
            .or_insert_with(|| WorkingPlayer::seed(&players[&p1_id]));
        let w2 = *working
            .entry(p2_id)
            .or_insert_with(|| WorkingPlayer::seed(&players[&p2_id]));
        let before = (w1.elo, w2.elo);

        let (next1, next2) = apply_match(result, w1, w2, settings);
        working.insert(p1_id, next1);
        working.insert(p2_id, next2);

        history.push(history_row(tournament_id, m.id, p1_id, before.0, next1.elo));
        history.push(history_row(tournament_id, m.id, p2_id, before.1, next2.elo));
        debug!(
            "match {}: {} {:+.1}, {} {:+.1}",
            m.id,
            p1_id,
            next1.elo - before.0,
            p2_id,
            next2.elo - before.1
        );
    }

    let players = working
        .iter()
        .map(|(player_id, state)| {
            let mut player = players[player_id].clone();
            player.elo = state.elo;
            player.peak_elo = state.peak_elo;
            player.games_played = state.games_played;
            player.wins = state.wins;
            player.losses = state.losses;
            player
        })
        .collect::<Vec<_>>();

    info!(
        "replayed tournament {tournament_id}: {} rating changes across {} players",
        history.len(),
        players.len()
    );
    Ok(PlayerReplayOutcome { players, history })
}

/// One match's effect on the two working lines. Double losses are a flat
/// penalty on both sides (not zero-sum); everything else goes through
/// per-side K-factors and expected scores, so deltas are independent and
/// need not cancel when experience tiers differ.
fn apply_match(
    result: MatchResult,
    mut w1: WorkingPlayer,
    mut w2: WorkingPlayer,
    settings: &EloSettings,
) -> (WorkingPlayer, WorkingPlayer) {
    if result == MatchResult::DoubleLoss {
        w1.elo -= settings.double_loss_penalty;
        w2.elo -= settings.double_loss_penalty;
        w1.losses += 1;
        w2.losses += 1;
        w1.games_played += 1;
        w2.games_played += 1;
        return (w1, w2);
    }

    // K-factors come from the games count before this match.
    let k1 = k_factor(w1.games_played, settings);
    let k2 = k_factor(w2.games_played, settings);
    let e1 = expected_score(w1.elo, w2.elo);
    let e2 = 1.0 - e1;

    let (a1, a2) = match result {
        MatchResult::Player1 => {
            w1.wins += 1;
            w2.losses += 1;
            (1.0, 0.0)
        }
        MatchResult::Player2 => {
            w2.wins += 1;
            w1.losses += 1;
            (0.0, 1.0)
        }
        MatchResult::Draw => (0.5, 0.5),
        MatchResult::DoubleLoss | MatchResult::Bye => unreachable!("handled above"),
    };

    w1.elo += f64::from(k1) * (a1 - e1);
    w2.elo += f64::from(k2) * (a2 - e2);
    w1.peak_elo = w1.peak_elo.max(w1.elo);
    w2.peak_elo = w2.peak_elo.max(w2.elo);
    w1.games_played += 1;
    w2.games_played += 1;

    (w1, w2)
}

fn resolve_player_pair(
    m: &Match,
    participants: &HashMap<ParticipantId, TournamentPlayer>,
    players: &HashMap<PlayerId, Player>,
) -> Result<(PlayerId, PlayerId), EngineError> {
    let p2_participant = m.player2_id.ok_or_else(|| {
        EngineError::DataIntegrity(format!("match {} lost its second participant", m.id))
    })?;
    let tp1 = lookup_participant(participants, m.player1_id, m.id)?;
    let tp2 = lookup_participant(participants, p2_participant, m.id)?;
    for player_id in [tp1.player_id, tp2.player_id] {
        if !players.contains_key(&player_id) {
            return Err(EngineError::DataIntegrity(format!(
                "match {} references missing player {player_id}",
                m.id
            )));
        }
    }
    Ok((tp1.player_id, tp2.player_id))
}

fn lookup_participant<'a>(
    participants: &'a HashMap<ParticipantId, TournamentPlayer>,
    id: ParticipantId,
    match_id: i64,
) -> Result<&'a TournamentPlayer, EngineError> {
    participants.get(&id).ok_or_else(|| {
        EngineError::DataIntegrity(format!(
            "match {match_id} references missing participant {id}"
        ))
    })
}

fn history_row(
    tournament_id: TournamentId,
    match_id: i64,
    player_id: PlayerId,
    before: f64,
    after: f64,
) -> EloHistory {
    EloHistory {
        id: 0,
        player_id,
        match_id,
        tournament_id,
        elo_before: before,
        elo_after: after,
        elo_change: after - before,
        recorded_at: None,
    }
}

/// Deck ratings are a separate pass: only matches where both sides
/// registered a deck count, byes and double losses are excluded entirely,
/// one fixed K-factor applies, and the exchange is exactly zero-sum.
pub fn replay_deck_ratings(
    matches: &[Match],
    participants: &HashMap<ParticipantId, TournamentPlayer>,
    decks: &HashMap<DeckId, Deck>,
    settings: &EloSettings,
) -> Result<DeckReplayOutcome, EngineError> {
    let mut working: BTreeMap<DeckId, WorkingDeck> = BTreeMap::new();

    for m in matches {
        let Some(result) = m.result else { continue };
        if matches!(result, MatchResult::Bye | MatchResult::DoubleLoss) {
            continue;
        }
        let Some(p2_participant) = m.player2_id else {
            continue;
        };
        let tp1 = lookup_participant(participants, m.player1_id, m.id)?;
        let tp2 = lookup_participant(participants, p2_participant, m.id)?;
        let (Some(deck1_id), Some(deck2_id)) = (tp1.deck_id, tp2.deck_id) else {
            continue;
        };
        for deck_id in [deck1_id, deck2_id] {
            if !decks.contains_key(&deck_id) {
                return Err(EngineError::DataIntegrity(format!(
                    "match {} references missing deck {deck_id}",
                    m.id
                )));
            }
        }

        let mut d1 = *working
            .entry(deck1_id)
            .or_insert_with(|| WorkingDeck::seed(&decks[&deck1_id]));
        let mut d2 = *working
            .entry(deck2_id)
            .or_insert_with(|| WorkingDeck::seed(&decks[&deck2_id]));

        let expected1 = expected_score(d1.elo, d2.elo);
        let actual1 = match result {
            MatchResult::Player1 => {
                d1.wins += 1;
                1.0
            }
            MatchResult::Player2 => {
                d2.wins += 1;
                0.0
            }
            MatchResult::Draw => 0.5,
            MatchResult::DoubleLoss | MatchResult::Bye => unreachable!("filtered above"),
        };

        let change = settings.deck_k_factor * (actual1 - expected1);
        d1.elo += change;
        d2.elo -= change;
        d1.games_played += 1;
        d2.games_played += 1;

        working.insert(deck1_id, d1);
        working.insert(deck2_id, d2);
    }

    let decks = working
        .iter()
        .map(|(deck_id, state)| {
            let mut deck = decks[deck_id].clone();
            deck.elo = state.elo;
            deck.games_played = state.games_played;
            deck.wins = state.wins;
            deck
        })
        .collect::<Vec<_>>();

    Ok(DeckReplayOutcome { decks })
}
