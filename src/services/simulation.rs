use std::collections::HashMap;

use anyhow::{Context, Result};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::radar::update_all_radar_attributes;
use super::ratings::RatingService;
use super::rounds::RoundService;
use crate::config::settings::EngineConfig;
use crate::domain::models::{Deck, Match, MatchResult, Player, PlayerId, Tournament, TournamentMode};
use crate::store::{MemoryStore, TournamentStore};
use crate::swiss::standings::StandingRow;

const DECK_ARCHETYPES: [&str; 4] = [
    "Charizard ex",
    "Gardevoir ex",
    "Lost Zone Box",
    "Miraidon ex",
];

pub struct SimulationSettings {
    pub players: usize,
    pub rounds: i32,
    pub mode: TournamentMode,
    pub draw_points: i32,
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub seed: u64,
    pub tournament: Tournament,
    pub standings: Vec<StandingRow>,
    pub players: Vec<Player>,
    pub decks: Vec<Deck>,
}

/// Drives a full tournament life cycle against the in-memory store:
/// registration, round-by-round pairing and result entry, rating
/// finalization, and radar refresh. Exists to exercise the whole engine
/// from the command line.
pub struct SimulationService<'a> {
    config: &'a EngineConfig,
}

impl<'a> SimulationService<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, settings: &SimulationSettings) -> Result<SimulationReport> {
        let seed = settings.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        info!(
            "simulating {} players over {} rounds (seed {seed})",
            settings.players, settings.rounds
        );

        let mut store = MemoryStore::new();
        let decks = self.register_decks(&mut store)?;
        let tournament =
            store.insert_tournament("Simulated League", settings.mode, settings.draw_points)?;
        for i in 1..=settings.players {
            let player = store.insert_player(&format!("Player {i}"), self.config.elo.starting_elo)?;
            let deck_id = decks[rng.gen_range(0..decks.len())].id;
            store.insert_participant(tournament.id, player.id, Some(deck_id))?;
        }

        let rounds = RoundService::new(self.config);
        for round in 1..=settings.rounds {
            let pairing = rounds.pair_round_with(&store, tournament.id, round, &mut rng)?;
            let rows = rounds.record_round(&mut store, tournament.id, round, &pairing)?;
            for row in rows.iter().filter(|r| !r.is_completed()) {
                let (result, game_score) = self.roll_result(settings.mode, &mut rng);
                rounds.record_result(&mut store, row.id, result, game_score)?;
            }
        }

        RatingService::new(self.config).finalize_tournament_ratings(&mut store, tournament.id)?;
        update_all_radar_attributes(&mut store, self.config)?;

        self.collect_report(&store, tournament.id, seed)
    }

    fn register_decks(&self, store: &mut MemoryStore) -> Result<Vec<Deck>> {
        let mut decks = Vec::new();
        for name in DECK_ARCHETYPES {
            let base = store.insert_deck(name, None, self.config.elo.starting_elo)?;
            decks.push(base);
        }
        // One variant to keep the deck tree non-trivial.
        let variant = store.insert_deck(
            "Charizard ex Pidgeot",
            Some(decks[0].id),
            self.config.elo.starting_elo,
        )?;
        decks.push(variant);
        Ok(decks)
    }

    /// Weighted outcome roll: mostly decisive results, the occasional draw,
    /// rarely a double loss.
    fn roll_result(
        &self,
        mode: TournamentMode,
        rng: &mut impl Rng,
    ) -> (MatchResult, Option<(i32, i32)>) {
        let roll: u32 = rng.gen_range(0..100);
        let result = if roll < 46 {
            MatchResult::Player1
        } else if roll < 92 {
            MatchResult::Player2
        } else if roll < 97 {
            MatchResult::Draw
        } else {
            MatchResult::DoubleLoss
        };

        if mode != TournamentMode::BestOfThree {
            return (result, None);
        }
        let game_score = match result {
            MatchResult::Player1 => (2, rng.gen_range(0..2)),
            MatchResult::Player2 => (rng.gen_range(0..2), 2),
            MatchResult::Draw => (1, 1),
            MatchResult::DoubleLoss => (0, 0),
            MatchResult::Bye => (0, 0),
        };
        (result, Some(game_score))
    }

    fn collect_report(
        &self,
        store: &MemoryStore,
        tournament_id: i64,
        seed: u64,
    ) -> Result<SimulationReport> {
        let tournament = store
            .tournament(tournament_id)?
            .context("simulated tournament vanished from its own store")?;
        let participants = store.participants(tournament_id)?;
        let matches: Vec<Match> = store.matches(tournament_id)?;
        let standings = crate::swiss::standings::compute_standings(
            &tournament,
            &participants,
            &matches,
            &self.config.tiebreak,
        );

        let mut players = store.rated_players()?;
        players.sort_by(|a, b| b.elo.total_cmp(&a.elo));

        let mut decks: Vec<Deck> = participants
            .iter()
            .filter_map(|p| p.deck_id)
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .filter_map(|id| store.deck(id).transpose())
            .collect::<Result<_>>()?;
        decks.sort_by(|a, b| b.elo.total_cmp(&a.elo));

        Ok(SimulationReport {
            seed,
            tournament,
            standings,
            players,
            decks,
        })
    }
}

/// Plain-text report for the CLI; `--json` serializes the report instead.
pub fn print_report(report: &SimulationReport) {
    let names: HashMap<PlayerId, &str> = report
        .players
        .iter()
        .map(|p| (p.id, p.name.as_str()))
        .collect();

    println!("\n=== Final Standings (seed {}) ===", report.seed);
    println!(
        "{:<4} {:<12} {:>4} {:>7} {:>7} {:>7}",
        "#", "Player", "Pts", "W-L-T", "OMW", "OOWP"
    );
    for (i, row) in report.standings.iter().enumerate() {
        let name = names
            .get(&row.participant.player_id)
            .copied()
            .unwrap_or("?");
        println!(
            "{:<4} {:<12} {:>4} {:>7} {:>7.3} {:>7.3}",
            i + 1,
            name,
            row.points,
            format!("{}-{}-{}", row.wins, row.losses, row.ties),
            row.omw,
            row.oowp
        );
    }

    println!("\n=== Ratings ===");
    println!(
        "{:<12} {:>8} {:>8} {:>6}",
        "Player", "Elo", "Peak", "Games"
    );
    for player in &report.players {
        println!(
            "{:<12} {:>8.1} {:>8.1} {:>6}",
            player.name, player.elo, player.peak_elo, player.games_played
        );
    }

    println!("\n=== Decks ===");
    for deck in &report.decks {
        println!(
            "{:<24} {:>8.1} {:>3} games, {:.0}% wins",
            deck.name,
            deck.elo,
            deck.games_played,
            deck.win_rate() * 100.0
        );
    }

    println!("\n=== Radar (top finishers) ===");
    for row in report.standings.iter().take(4) {
        let Some(player) = report
            .players
            .iter()
            .find(|p| p.id == row.participant.player_id)
        else {
            continue;
        };
        let radar = player.radar;
        println!(
            "{:<12} skill {:>5.1}  consistency {:>5.1}  experience {:>5.1}  clutch {:>5}  top-cut {:>5}",
            player.name,
            radar.skill,
            radar.consistency,
            radar.experience,
            optional(radar.clutch),
            optional(radar.top_cut),
        );
    }
    println!();
}

fn optional(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.1}"),
        None => "n/a".to_string(),
    }
}
