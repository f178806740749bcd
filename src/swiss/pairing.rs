use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use rand::Rng;
use rand::seq::SliceRandom;

use super::tiebreak::TiebreakContext;
use crate::config::settings::TiebreakSettings;
use crate::domain::models::{Match, MatchResult, ParticipantId, TournamentPlayer};
use crate::error::EngineError;

/// One round's pairings: ordered pairs plus at most one bye. Creating the
/// persisted match rows is the caller's job; this computation touches no
/// store state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundPairing {
    pub pairs: Vec<(ParticipantId, ParticipantId)>,
    pub bye: Option<ParticipantId>,
}

/// Swiss pairing for `round_number` given the full match history so far.
///
/// Round 1 is a uniform shuffle; later rounds sort descending by
/// `(points, OMW)`. With an odd field, the bye goes to the participant with
/// the fewest prior byes, then lowest points, then lowest OMW. The remaining
/// pool is paired rematch-free when any such complete pairing exists,
/// falling back to a greedy minimal-rematch pass otherwise.
pub fn pair_round(
    participants: &[TournamentPlayer],
    matches: &[Match],
    round_number: i32,
    settings: &TiebreakSettings,
    rng: &mut impl Rng,
) -> Result<RoundPairing, EngineError> {
    let active: Vec<&TournamentPlayer> = participants.iter().filter(|p| !p.dropped).collect();
    if active.len() < 2 {
        return Err(EngineError::InsufficientPlayers(active.len()));
    }

    let ctx = TiebreakContext::new(participants, matches, round_number - 1, settings);
    let points: HashMap<ParticipantId, i32> = active.iter().map(|p| (p.id, p.points)).collect();
    let omw: HashMap<ParticipantId, f64> = active.iter().map(|p| (p.id, ctx.omw(p.id))).collect();

    let mut pool: Vec<ParticipantId> = active.iter().map(|p| p.id).collect();
    if round_number == 1 {
        pool.shuffle(rng);
    } else {
        pool.sort_by(|a, b| {
            points[b]
                .cmp(&points[a])
                .then_with(|| omw[b].total_cmp(&omw[a]))
        });
    }

    let bye = if pool.len() % 2 == 1 {
        let chosen = select_bye(&pool, matches, &points, &omw);
        pool.retain(|&id| id != chosen);
        Some(chosen)
    } else {
        None
    };

    let played = played_pairs(matches);
    let pairs = match search_rematch_free(&pool, &played) {
        Some(pairs) => pairs,
        None => {
            warn!("round {round_number}: no rematch-free pairing exists, falling back");
            minimal_rematch_pairs(&pool, &played, &points)
        }
    };
    debug!(
        "round {round_number}: paired {} tables, bye: {bye:?}",
        pairs.len()
    );

    Ok(RoundPairing { pairs, bye })
}

/// Fewest prior byes first, then lowest points, then lowest OMW, so the bye
/// never lands on the leader while a weaker candidate exists. Prior byes are
/// counted from match history, so a recomputed round sees the same totals
/// the standings do.
fn select_bye(
    pool: &[ParticipantId],
    matches: &[Match],
    points: &HashMap<ParticipantId, i32>,
    omw: &HashMap<ParticipantId, f64>,
) -> ParticipantId {
    let byes = bye_counts(matches);
    let mut candidates = pool.to_vec();
    candidates.sort_by(|a, b| {
        let byes_a = byes.get(a).copied().unwrap_or(0);
        let byes_b = byes.get(b).copied().unwrap_or(0);
        byes_a
            .cmp(&byes_b)
            .then_with(|| points[a].cmp(&points[b]))
            .then_with(|| omw[a].total_cmp(&omw[b]))
    });
    candidates[0]
}

fn bye_counts(matches: &[Match]) -> HashMap<ParticipantId, i32> {
    let mut counts = HashMap::new();
    for m in matches {
        if m.result == Some(MatchResult::Bye) {
            *counts.entry(m.player1_id).or_insert(0) += 1;
        }
    }
    counts
}

fn ordered(a: ParticipantId, b: ParticipantId) -> (ParticipantId, ParticipantId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Pairs that already met in a completed match.
fn played_pairs(matches: &[Match]) -> HashSet<(ParticipantId, ParticipantId)> {
    matches
        .iter()
        .filter(|m| m.is_completed())
        .filter_map(|m| m.player2_id.map(|p2| ordered(m.player1_id, p2)))
        .collect()
}

/// Exhaustive backtracking over immutable snapshots: pair the first
/// remaining player with each candidate in order, recurse on the rest, and
/// unwind on dead ends. Returns a complete zero-rematch pairing or `None`.
fn search_rematch_free(
    remaining: &[ParticipantId],
    played: &HashSet<(ParticipantId, ParticipantId)>,
) -> Option<Vec<(ParticipantId, ParticipantId)>> {
    if remaining.is_empty() {
        return Some(Vec::new());
    }
    if remaining.len() == 1 {
        return None;
    }

    let first = remaining[0];
    for i in 1..remaining.len() {
        let candidate = remaining[i];
        if played.contains(&ordered(first, candidate)) {
            continue;
        }
        let rest: Vec<ParticipantId> = remaining[1..i]
            .iter()
            .chain(&remaining[i + 1..])
            .copied()
            .collect();
        if let Some(tail) = search_rematch_free(&rest, played) {
            let mut pairs = Vec::with_capacity(tail.len() + 1);
            pairs.push((first, candidate));
            pairs.extend(tail);
            return Some(pairs);
        }
    }
    None
}

/// Greedy fallback when no perfect pairing exists: first un-played opponent
/// in pool order, else the forced rematch whose points are numerically
/// closest (first such opponent wins ties). Locally greedy, not globally
/// minimal in rematch count.
fn minimal_rematch_pairs(
    pool: &[ParticipantId],
    played: &HashSet<(ParticipantId, ParticipantId)>,
    points: &HashMap<ParticipantId, i32>,
) -> Vec<(ParticipantId, ParticipantId)> {
    let mut remaining = pool.to_vec();
    let mut pairs = Vec::new();

    while remaining.len() >= 2 {
        let first = remaining[0];
        let fresh = remaining[1..]
            .iter()
            .copied()
            .find(|&c| !played.contains(&ordered(first, c)));

        let opponent = match fresh {
            Some(op) => op,
            None => {
                let first_points = points.get(&first).copied().unwrap_or(0);
                let Some(forced) = remaining[1..]
                    .iter()
                    .copied()
                    .min_by_key(|c| (points.get(c).copied().unwrap_or(0) - first_points).abs())
                else {
                    break;
                };
                warn!("forced rematch: participant {first} vs {forced}");
                forced
            }
        };

        pairs.push((first, opponent));
        remaining.retain(|&id| id != first && id != opponent);
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Match;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn participant(id: ParticipantId, points: i32) -> TournamentPlayer {
        let mut p = TournamentPlayer::new(id, 1, id + 100, None);
        p.points = points;
        p.wins = points / 3;
        p
    }

    fn completed(id: i64, round: i32, p1: ParticipantId, p2: ParticipantId) -> Match {
        Match {
            id,
            tournament_id: 1,
            round_number: round,
            player1_id: p1,
            player2_id: Some(p2),
            result: Some(MatchResult::Player1),
            p1_game_wins: 0,
            p2_game_wins: 0,
            created_at: None,
            completed_at: None,
        }
    }

    fn bye_row(id: i64, round: i32, p1: ParticipantId) -> Match {
        Match {
            id,
            tournament_id: 1,
            round_number: round,
            player1_id: p1,
            player2_id: None,
            result: Some(MatchResult::Bye),
            p1_game_wins: 0,
            p2_game_wins: 0,
            created_at: None,
            completed_at: None,
        }
    }

    fn settings() -> TiebreakSettings {
        TiebreakSettings::default()
    }

    #[test]
    fn four_players_round_one_yields_two_pairs_no_bye() {
        let players: Vec<_> = (1..=4).map(|i| participant(i, 0)).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let round = pair_round(&players, &[], 1, &settings(), &mut rng).unwrap();

        assert_eq!(round.pairs.len(), 2);
        assert_eq!(round.bye, None);
        let mut seen: Vec<ParticipantId> =
            round.pairs.iter().flat_map(|&(a, b)| [a, b]).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }

    #[test]
    fn fewer_than_two_players_is_an_error() {
        let players = vec![participant(1, 0)];
        let mut rng = StdRng::seed_from_u64(0);
        let err = pair_round(&players, &[], 1, &settings(), &mut rng).unwrap_err();
        assert_eq!(err, EngineError::InsufficientPlayers(1));
    }

    #[test]
    fn dropped_players_are_excluded() {
        let mut players: Vec<_> = (1..=4).map(|i| participant(i, 0)).collect();
        players[3].dropped = true;
        let mut rng = StdRng::seed_from_u64(3);
        let round = pair_round(&players, &[], 1, &settings(), &mut rng).unwrap();

        assert_eq!(round.pairs.len(), 1);
        assert!(round.bye.is_some());
        assert_ne!(round.bye, Some(4));
        let (a, b) = round.pairs[0];
        assert_ne!(a, 4);
        assert_ne!(b, 4);
    }

    #[test]
    fn rematch_is_avoided_when_an_alternative_exists() {
        // 4 players, everyone on 3 points; 1-2 and 3-4 already played.
        // The only rematch-free completion is {1-3, 2-4} or {1-4, 2-3}.
        let players: Vec<_> = (1..=4).map(|i| participant(i, 3)).collect();
        let history = vec![completed(10, 1, 1, 2), completed(11, 1, 3, 4)];
        let mut rng = StdRng::seed_from_u64(1);
        let round = pair_round(&players, &history, 2, &settings(), &mut rng).unwrap();

        for &(a, b) in &round.pairs {
            assert_ne!(ordered(a, b), (1, 2));
            assert_ne!(ordered(a, b), (3, 4));
        }
    }

    #[test]
    fn five_players_get_exactly_one_bye_to_fewest_byes() {
        // Player 5 already had a bye in round 1; everyone on equal points.
        // The bye must go to one of 1..=4, and the already-played pair (1,2)
        // must be avoided.
        let players: Vec<_> = (1..=5).map(|i| participant(i, 3)).collect();
        let history = vec![
            completed(10, 1, 1, 2),
            completed(11, 1, 3, 4),
            bye_row(12, 1, 5),
        ];
        let mut rng = StdRng::seed_from_u64(9);
        let round = pair_round(&players, &history, 2, &settings(), &mut rng).unwrap();

        let bye = round.bye.expect("odd field needs a bye");
        assert_ne!(bye, 5, "no second bye while zero-bye players remain");
        assert_eq!(round.pairs.len(), 2);
        for &(a, b) in &round.pairs {
            assert_ne!(ordered(a, b), (1, 2));
            assert_ne!(ordered(a, b), (3, 4));
        }
    }

    #[test]
    fn bye_goes_to_lowest_points_among_zero_bye_players() {
        let mut players: Vec<_> = (1..=5).map(|i| participant(i, 3)).collect();
        players[2].points = 0; // participant 3 trails the field
        let history = vec![completed(10, 1, 1, 2), completed(11, 1, 4, 5)];
        let mut rng = StdRng::seed_from_u64(2);
        let round = pair_round(&players, &history, 2, &settings(), &mut rng).unwrap();

        assert_eq!(round.bye, Some(3));
    }

    #[test]
    fn later_rounds_pair_by_standing_order() {
        // Distinct point totals, no shared history: the sort pairs 1st-2nd
        // and 3rd-4th.
        let players = vec![
            participant(1, 9),
            participant(2, 0),
            participant(3, 6),
            participant(4, 3),
        ];
        let mut rng = StdRng::seed_from_u64(4);
        let round = pair_round(&players, &[], 2, &settings(), &mut rng).unwrap();

        assert_eq!(round.pairs, vec![(1, 3), (4, 2)]);
    }

    #[test]
    fn exhaustive_search_finds_the_last_remaining_perfect_pairing() {
        // 6 players where greedy top-down pairing would dead-end: 1 has
        // played everyone but 2, and 2 has played everyone but 1, so the
        // only perfect pairing includes (1,2).
        let players: Vec<_> = (1..=6).map(|i| participant(i, 0)).collect();
        let mut history = Vec::new();
        let mut id = 100;
        for other in 3..=6 {
            history.push(completed(id, 1, 1, other));
            id += 1;
            history.push(completed(id, 1, 2, other));
            id += 1;
        }
        let mut rng = StdRng::seed_from_u64(5);
        let round = pair_round(&players, &history, 2, &settings(), &mut rng).unwrap();

        assert!(round.pairs.contains(&(1, 2)) || round.pairs.contains(&(2, 1)));
        for &(a, b) in &round.pairs {
            assert!(
                !played_pairs(&history).contains(&ordered(a, b)),
                "unexpected rematch {a}-{b}"
            );
        }
    }

    #[test]
    fn fallback_produces_complete_pairing_with_forced_rematch() {
        // Everyone has played everyone: no perfect pairing exists, but the
        // fallback must still seat the whole field.
        let players: Vec<_> = (1..=4).map(|i| participant(i, 3)).collect();
        let mut history = Vec::new();
        let mut id = 100;
        for a in 1..=4 {
            for b in (a + 1)..=4 {
                history.push(completed(id, 1, a, b));
                id += 1;
            }
        }
        let mut rng = StdRng::seed_from_u64(6);
        let round = pair_round(&players, &history, 4, &settings(), &mut rng).unwrap();

        assert_eq!(round.pairs.len(), 2);
        let mut seen: Vec<ParticipantId> =
            round.pairs.iter().flat_map(|&(a, b)| [a, b]).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }

    #[test]
    fn fallback_forced_rematch_prefers_closest_points() {
        let mut players: Vec<_> = (1..=4).map(|i| participant(i, 0)).collect();
        players[0].points = 9;
        players[1].points = 0;
        players[2].points = 8;
        players[3].points = 1;
        let mut history = Vec::new();
        let mut id = 100;
        for a in 1..=4 {
            for b in (a + 1)..=4 {
                history.push(completed(id, 1, a, b));
                id += 1;
            }
        }
        let played = played_pairs(&history);
        let points: HashMap<ParticipantId, i32> =
            players.iter().map(|p| (p.id, p.points)).collect();
        let pool = vec![1, 3, 4, 2];

        let pairs = minimal_rematch_pairs(&pool, &played, &points);
        // 1 (9 pts) is forced into a rematch and takes 3 (8 pts), the
        // numerically closest opponent.
        assert_eq!(pairs[0], (1, 3));
        assert_eq!(pairs[1], (4, 2));
    }

    #[test]
    fn no_rematch_over_multiple_synthetic_rounds() {
        // Brute-force property check: with 8 players and 3 rounds of
        // history, every produced pairing avoids completed pairs whenever a
        // zero-rematch completion exists (verified by the search itself).
        let players: Vec<_> = (1..=8).map(|i| participant(i, 0)).collect();
        let mut history: Vec<Match> = Vec::new();
        let mut id = 1000;
        for round in 1..=3 {
            let mut rng = StdRng::seed_from_u64(round as u64);
            let pairing =
                pair_round(&players, &history, round, &settings(), &mut rng).unwrap();
            let played_before = played_pairs(&history);
            for &(a, b) in &pairing.pairs {
                assert!(
                    !played_before.contains(&ordered(a, b)),
                    "round {round} repeated pairing {a}-{b}"
                );
                history.push(completed(id, round, a, b));
                id += 1;
            }
        }
    }
}
