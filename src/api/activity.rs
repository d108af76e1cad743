use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::EngineResult;
use crate::manager::SimulationManager;
use crate::store::queries::ActivityRow;

pub async fn list(
    State(manager): State<SimulationManager>,
    Path(sim): Path<String>,
) -> EngineResult<Json<Vec<ActivityRow>>> {
    let store = manager.open(&sim).await?;
    Ok(Json(store.list_activity().await?))
}
