pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod rating;
pub mod services;
pub mod store;
pub mod swiss;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

use crate::cli::Command;
use crate::config::settings::EngineConfig;
use crate::services::simulation::{SimulationService, SimulationSettings, print_report};

pub fn interpret() -> Command {
    let cli = Cli::parse();
    cli.command
}

pub fn handle_simulate(settings: &SimulationSettings, json: bool) -> Result<()> {
    let config = EngineConfig::new();
    let service = SimulationService::new(&config);
    let report = service.run(settings)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}
