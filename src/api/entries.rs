use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::dto::EntryCreate;
use crate::engine::propagator::ManualEntry;
use crate::engine::resim;
use crate::error::{EngineError, EngineResult};
use crate::manager::SimulationManager;
use crate::models::BalanceEntry;

pub async fn list(
    State(manager): State<SimulationManager>,
    Path((sim, account_id)): Path<(String, i64)>,
) -> EngineResult<Json<Vec<BalanceEntry>>> {
    let store = manager.open(&sim).await?;
    if store.get_account(account_id).await?.is_none() {
        return Err(EngineError::NotFound(format!("account {account_id}")));
    }
    Ok(Json(store.list_entries_for_account(account_id).await?))
}

/// Injects a manual entry and triggers C5 (spec §6): the entry is seeded
/// into the scheduler as a `ManualEntry` propagator rather than inserted
/// directly, so rules reacting to it fire in the same run.
pub async fn create(
    State(manager): State<SimulationManager>,
    Path((sim, account_id)): Path<(String, i64)>,
    Json(body): Json<EntryCreate>,
) -> EngineResult<(StatusCode, Json<Vec<BalanceEntry>>)> {
    let store = manager.open(&sim).await?;
    if store.get_account(account_id).await?.is_none() {
        return Err(EngineError::NotFound(format!("account {account_id}")));
    }

    let manual = ManualEntry {
        account_id,
        amount: body.amount,
        currency: body.currency,
        timestamp: body.timestamp,
        description: body.description.unwrap_or_else(|| "Manual entry".to_string()),
    };
    resim::resimulate(&store, None, vec![manual]).await?;
    tracing::info!(simulation = %sim, account_id, "injected manual entry, resimulated");

    Ok((StatusCode::CREATED, Json(store.list_entries_for_account(account_id).await?)))
}
