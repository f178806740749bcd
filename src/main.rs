use anyhow::Result;

use tcg_league_engine::cli::Command;
use tcg_league_engine::domain::models::TournamentMode;
use tcg_league_engine::services::simulation::SimulationSettings;
use tcg_league_engine::{handle_simulate, interpret};

fn main() {
    setup_logging();
    parse_and_execute().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });
}

fn setup_logging() {
    sensible_env_logger::init!();
}

fn parse_and_execute() -> Result<()> {
    let command = interpret();
    execute_command(&command)
}

fn execute_command(command: &Command) -> Result<()> {
    match command {
        Command::Simulate {
            players,
            rounds,
            bo3,
            draw_points,
            seed,
            json,
        } => {
            let settings = SimulationSettings {
                players: *players,
                rounds: *rounds,
                mode: if *bo3 {
                    TournamentMode::BestOfThree
                } else {
                    TournamentMode::Normal
                },
                draw_points: *draw_points,
                seed: *seed,
            };
            handle_simulate(&settings, *json)
        }
    }
}
