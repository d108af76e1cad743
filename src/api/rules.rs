use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::dto::{parse_rule_type, parse_time_of_day, RuleCreate};
use crate::engine::resim;
use crate::error::{EngineError, EngineResult};
use crate::manager::SimulationManager;
use crate::models::FundingRule;

pub async fn list(
    State(manager): State<SimulationManager>,
    Path(sim): Path<String>,
) -> EngineResult<Json<Vec<FundingRule>>> {
    let store = manager.open(&sim).await?;
    Ok(Json(store.list_rules().await?))
}

pub async fn create(
    State(manager): State<SimulationManager>,
    Path(sim): Path<String>,
    Json(body): Json<RuleCreate>,
) -> EngineResult<(StatusCode, Json<FundingRule>)> {
    let store = manager.open(&sim).await?;

    let rule_type = parse_rule_type(&body.rule_type)?;
    let time_of_day = parse_time_of_day(&body.time_of_day)?;

    let (threshold, target_amount) = FundingRule::coerce_and_validate(
        rule_type,
        body.source_account_id,
        body.target_account_id,
        body.threshold,
        body.target_amount,
    )
    .map_err(|f| EngineError::validation_field(f.field, f.message))?;

    for account_id in [body.source_account_id, body.target_account_id] {
        if store.get_account(account_id).await?.is_none() {
            return Err(EngineError::NotFound(format!("account {account_id}")));
        }
    }

    let rule = resim::create_rule_and_resimulate(
        &store,
        rule_type,
        body.target_account_id,
        body.source_account_id,
        time_of_day,
        body.currency,
        threshold,
        target_amount,
    )
    .await?;

    tracing::info!(simulation = %sim, rule_id = rule.id, rule_type = ?rule_type, "created funding rule, resimulated");
    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn delete(
    State(manager): State<SimulationManager>,
    Path((sim, rule_id)): Path<(String, i64)>,
) -> EngineResult<Json<serde_json::Value>> {
    let store = manager.open(&sim).await?;
    resim::delete_rule_and_resimulate(&store, rule_id).await?;
    tracing::info!(simulation = %sim, rule_id, "deleted funding rule, resimulated");
    Ok(Json(serde_json::json!({ "message": "deleted" })))
}
