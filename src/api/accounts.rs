use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::dto::{AccountCreate, AccountUpdate};
use crate::error::{EngineError, EngineResult};
use crate::manager::SimulationManager;
use crate::models::Account;

pub async fn list(
    State(manager): State<SimulationManager>,
    Path(sim): Path<String>,
) -> EngineResult<Json<Vec<Account>>> {
    let store = manager.open(&sim).await?;
    Ok(Json(store.list_accounts().await?))
}

pub async fn create(
    State(manager): State<SimulationManager>,
    Path(sim): Path<String>,
    Json(body): Json<AccountCreate>,
) -> EngineResult<(StatusCode, Json<Account>)> {
    let store = manager.open(&sim).await?;
    let account = store.create_account(&body.name).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn get(
    State(manager): State<SimulationManager>,
    Path((sim, account_id)): Path<(String, i64)>,
) -> EngineResult<Json<Account>> {
    let store = manager.open(&sim).await?;
    let account = store
        .get_account(account_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("account {account_id}")))?;
    Ok(Json(account))
}

pub async fn update(
    State(manager): State<SimulationManager>,
    Path((sim, account_id)): Path<(String, i64)>,
    Json(body): Json<AccountUpdate>,
) -> EngineResult<Json<Account>> {
    let store = manager.open(&sim).await?;
    let account = match body.name {
        Some(name) => store.update_account_name(account_id, &name).await?,
        None => store
            .get_account(account_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("account {account_id}")))?,
    };
    Ok(Json(account))
}

pub async fn delete(
    State(manager): State<SimulationManager>,
    Path((sim, account_id)): Path<(String, i64)>,
) -> EngineResult<Json<serde_json::Value>> {
    let store = manager.open(&sim).await?;
    store.delete_account(account_id).await?;
    Ok(Json(serde_json::json!({ "message": "deleted" })))
}
