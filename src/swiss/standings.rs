use serde::Serialize;

use super::tiebreak::TiebreakContext;
use crate::config::settings::TiebreakSettings;
use crate::domain::models::{Match, Tournament, TournamentMode, TournamentPlayer};

/// One standings line. `gwp`/`ogwp` are populated in best-of-three mode
/// only.
#[derive(Debug, Clone, Serialize)]
pub struct StandingRow {
    pub participant: TournamentPlayer,
    pub points: i32,
    pub wins: i32,
    pub losses: i32,
    pub ties: i32,
    pub omw: f64,
    pub oowp: f64,
    pub gwp: Option<f64>,
    pub ogwp: Option<f64>,
    pub tardy: bool,
}

/// Current standings, dropped players excluded, sorted descending by the
/// mode's tiebreaker tuple: normal `(points, OMW, OOWP)`; best-of-three
/// `(points, not-tardy, OMW, OOWP, GWP, OGWP)`. At equal points a tardy
/// player sorts behind every punctual one.
pub fn compute_standings(
    tournament: &Tournament,
    participants: &[TournamentPlayer],
    matches: &[Match],
    settings: &TiebreakSettings,
) -> Vec<StandingRow> {
    let ctx = TiebreakContext::new(participants, matches, tournament.current_round, settings);
    let best_of_three = tournament.mode == TournamentMode::BestOfThree;

    let mut rows: Vec<StandingRow> = participants
        .iter()
        .filter(|p| !p.dropped)
        .map(|p| StandingRow {
            points: p.points,
            wins: p.wins,
            losses: p.losses,
            ties: p.ties,
            omw: ctx.omw(p.id),
            oowp: ctx.oowp(p.id),
            gwp: best_of_three.then(|| ctx.gwp(p.id)),
            ogwp: best_of_three.then(|| ctx.ogwp(p.id)),
            tardy: p.is_tardy,
            participant: p.clone(),
        })
        .collect();

    if best_of_three {
        rows.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then_with(|| (!b.tardy).cmp(&!a.tardy))
                .then_with(|| b.omw.total_cmp(&a.omw))
                .then_with(|| b.oowp.total_cmp(&a.oowp))
                .then_with(|| b.gwp.unwrap_or(0.0).total_cmp(&a.gwp.unwrap_or(0.0)))
                .then_with(|| b.ogwp.unwrap_or(0.0).total_cmp(&a.ogwp.unwrap_or(0.0)))
        });
    } else {
        rows.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then_with(|| b.omw.total_cmp(&a.omw))
                .then_with(|| b.oowp.total_cmp(&a.oowp))
        });
    }

    rows
}
