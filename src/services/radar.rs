use anyhow::{Context, Result};
use log::{debug, info};

use crate::config::settings::EngineConfig;
use crate::domain::models::{MatchResult, Player, PlayerId, RadarAttributes};
use crate::rating::radar::{self, ClutchSample};
use crate::store::TournamentStore;
use crate::swiss::standings::compute_standings;

/// Recomputes the five radar facets for one player from the full rated
/// population and the player's match/placement history.
pub fn compute_radar_attributes(
    store: &impl TournamentStore,
    config: &EngineConfig,
    player_id: PlayerId,
) -> Result<RadarAttributes> {
    let player = store
        .player(player_id)?
        .with_context(|| format!("player {player_id} not found"))?;
    let population: Vec<f64> = store.rated_players()?.iter().map(|p| p.elo).collect();
    let clutch_samples = clutch_samples(store, &player)?;
    let placements = placements(store, config, player_id)?;
    Ok(radar::compute(
        &player,
        &population,
        &clutch_samples,
        &placements,
    ))
}

/// Recomputes and stores radar attributes for every rated player. Returns
/// how many profiles were refreshed.
pub fn update_all_radar_attributes(
    store: &mut impl TournamentStore,
    config: &EngineConfig,
) -> Result<usize> {
    let players = store.rated_players()?;
    for player in &players {
        let attributes = compute_radar_attributes(store, config, player.id)?;
        let mut updated = player.clone();
        updated.radar = attributes;
        store.save_player(&updated)?;
    }
    info!("refreshed radar attributes for {} players", players.len());
    Ok(players.len())
}

/// One sample per completed non-bye match in the player's rating history.
/// The opponent's strength at the time comes from the paired history row of
/// the same match, so later rating swings don't rewrite the past.
fn clutch_samples(store: &impl TournamentStore, player: &Player) -> Result<Vec<ClutchSample>> {
    let mut samples = Vec::new();
    for entry in store.history_for_player(player.id)? {
        let Some(row) = store.match_record(entry.match_id)? else {
            debug!("history row {} references a pruned match, skipping", entry.id);
            continue;
        };
        let Some(result) = row.result else { continue };

        let won = match result {
            MatchResult::Player1 => side_player(store, Some(row.player1_id))? == Some(player.id),
            MatchResult::Player2 => side_player(store, row.player2_id)? == Some(player.id),
            MatchResult::Draw | MatchResult::DoubleLoss | MatchResult::Bye => false,
        };
        let Some(opponent_entry) = store
            .history_for_match(entry.match_id)?
            .into_iter()
            .find(|h| h.player_id != player.id)
        else {
            continue;
        };
        samples.push(ClutchSample {
            opponent_was_higher: opponent_entry.elo_before > entry.elo_before,
            won,
        });
    }
    Ok(samples)
}

fn side_player(
    store: &impl TournamentStore,
    participant_id: Option<i64>,
) -> Result<Option<PlayerId>> {
    let Some(id) = participant_id else {
        return Ok(None);
    };
    Ok(store.participant(id)?.map(|p| p.player_id))
}

/// Final standings position in every completed tournament the player
/// finished (dropped runs record no placement).
fn placements(
    store: &impl TournamentStore,
    config: &EngineConfig,
    player_id: PlayerId,
) -> Result<Vec<usize>> {
    let mut placements = Vec::new();
    for tournament in store.completed_tournaments()? {
        let participants = store.participants(tournament.id)?;
        if !participants.iter().any(|p| p.player_id == player_id) {
            continue;
        }
        let matches = store.matches(tournament.id)?;
        let rows = compute_standings(&tournament, &participants, &matches, &config.tiebreak);
        if let Some(position) = rows
            .iter()
            .position(|r| r.participant.player_id == player_id)
        {
            placements.push(position + 1);
        }
    }
    Ok(placements)
}
