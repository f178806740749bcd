pub mod settings;

pub use settings::{EloSettings, EngineConfig, TiebreakSettings};
