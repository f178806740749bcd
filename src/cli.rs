use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "swiss tournament pairing and rating engine")]
pub struct Cli {
    /// Command
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "lower_case")]
pub enum Command {
    /// Run a full simulated tournament in memory and print the final report
    Simulate {
        /// Number of registered players
        #[arg(short, long, default_value_t = 9)]
        players: usize,

        /// Number of swiss rounds to play
        #[arg(short, long, default_value_t = 4)]
        rounds: i32,

        /// Score matches as best-of-three (game counts feed the tiebreakers)
        #[arg(long)]
        bo3: bool,

        /// Points awarded for a draw (0 or 1)
        #[arg(long, default_value_t = 1)]
        draw_points: i32,

        /// RNG seed for a reproducible run
        #[arg(short, long)]
        seed: Option<u64>,

        /// Emit the report as JSON instead of tables
        #[arg(long)]
        json: bool,
    },
}
