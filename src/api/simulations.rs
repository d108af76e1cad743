use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::api::dto::{MetadataUpdate, SimulationCreate, SimulationList};
use crate::error::EngineResult;
use crate::manager::SimulationManager;
use crate::models::SimulationMetadata;

pub async fn list(State(manager): State<SimulationManager>) -> EngineResult<Json<SimulationList>> {
    Ok(Json(SimulationList {
        simulations: manager.list_simulations()?,
    }))
}

pub async fn create(
    State(manager): State<SimulationManager>,
    Json(body): Json<SimulationCreate>,
) -> EngineResult<(StatusCode, Json<serde_json::Value>)> {
    let now = Utc::now();
    let start = body.start_date.unwrap_or(now);
    let end = body.end_date.unwrap_or(now);
    manager.create_simulation(&body.name, start, end).await?;
    tracing::info!(simulation = %body.name, "created simulation");
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "name": body.name, "message": "created" })),
    ))
}

pub async fn delete(
    State(manager): State<SimulationManager>,
    Path(sim): Path<String>,
) -> EngineResult<Json<serde_json::Value>> {
    manager.delete_simulation(&sim).await?;
    tracing::info!(simulation = %sim, "deleted simulation");
    Ok(Json(serde_json::json!({ "name": sim, "message": "deleted" })))
}

pub async fn get_metadata(
    State(manager): State<SimulationManager>,
    Path(sim): Path<String>,
) -> EngineResult<Json<SimulationMetadata>> {
    let store = manager.open(&sim).await?;
    Ok(Json(store.get_metadata().await?))
}

pub async fn update_metadata(
    State(manager): State<SimulationManager>,
    Path(sim): Path<String>,
    Json(body): Json<MetadataUpdate>,
) -> EngineResult<Json<SimulationMetadata>> {
    let store = manager.open(&sim).await?;
    let current = store.get_metadata().await?;
    let start = body.start_date.unwrap_or(current.start_datetime);
    let end = body.end_date.unwrap_or(current.end_datetime);
    store.put_metadata(start, end).await?;

    // Window changes affect which rule firings fall inside it (spec §4.5).
    crate::engine::resim::resimulate(&store, None, vec![]).await?;
    tracing::info!(simulation = %sim, "resimulated after metadata update");

    Ok(Json(store.get_metadata().await?))
}
