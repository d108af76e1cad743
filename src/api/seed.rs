//! Canned demo dataset (spec §6, §8 scenario E "Idempotent seed").
//!
//! Reproduces scenario A from spec §8: two accounts, a manual wire out of
//! one of them, and a `BACKUP_FUNDING` rule between them. Calling this
//! twice replaces the first run's data; the final ledger is identical up
//! to auto-assigned ids.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveTime, Utc};

use crate::engine::resim;
use crate::error::EngineResult;
use crate::manager::SimulationManager;
use crate::models::RuleType;

fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).expect("literal seed timestamp").with_timezone(&Utc)
}

pub async fn seed(
    State(manager): State<SimulationManager>,
    Path(sim): Path<String>,
) -> EngineResult<(StatusCode, Json<serde_json::Value>)> {
    let store = manager.open(&sim).await?;

    let window_start = ts("2025-01-06T00:00:00Z");
    let window_end = ts("2025-01-10T23:59:59Z");

    store
        .transaction(|tx| {
            crate::store::queries::reset_all(tx)?;
            crate::store::queries::put_metadata(tx, window_start, window_end)
        })
        .await?;

    let ramp = store.create_account("RAMP").await?;
    let citi = store.create_account("CITI").await?;

    let seed_manual = vec![
        crate::engine::propagator::ManualEntry {
            account_id: ramp.id,
            amount: 500_000.0,
            currency: "USD".into(),
            timestamp: ts("2025-01-06T00:00:00Z"),
            description: "Initial balance".into(),
        },
        crate::engine::propagator::ManualEntry {
            account_id: citi.id,
            amount: 50_000.0,
            currency: "USD".into(),
            timestamp: ts("2025-01-06T00:00:00Z"),
            description: "Initial balance".into(),
        },
        crate::engine::propagator::ManualEntry {
            account_id: citi.id,
            amount: -60_000.0,
            currency: "USD".into(),
            timestamp: ts("2025-01-07T08:00:00Z"),
            description: "wire".into(),
        },
    ];

    resim::resimulate(&store, None, seed_manual).await?;

    let rule = resim::create_rule_and_resimulate(
        &store,
        RuleType::BackupFunding,
        citi.id,
        ramp.id,
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        "USD".to_string(),
        0.0,
        0.0,
    )
    .await?;

    tracing::info!(simulation = %sim, "seeded canned demo dataset");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "accounts": [ramp, citi],
            "rule_id": rule.id,
        })),
    ))
}
