pub mod radar;
pub mod ratings;
pub mod rounds;
pub mod simulation;

use anyhow::Result;

use crate::domain::models::{ParticipantId, Tournament, TournamentId, TournamentPlayer};
use crate::error::EngineError;
use crate::store::TournamentStore;

pub(crate) fn require_tournament(
    store: &impl TournamentStore,
    id: TournamentId,
) -> Result<Tournament> {
    store
        .tournament(id)?
        .ok_or_else(|| EngineError::TournamentNotFound(id).into())
}

pub(crate) fn require_participant(
    store: &impl TournamentStore,
    id: ParticipantId,
) -> Result<TournamentPlayer> {
    store.participant(id)?.ok_or_else(|| {
        EngineError::DataIntegrity(format!("participant {id} not found")).into()
    })
}
