//! Request/response bodies for the HTTP surface (spec §6). Kept separate
//! from the domain types in `models` the way the original Flask app keeps
//! its pydantic `schemas.py` separate from its SQLAlchemy `database.py`.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::RuleType;

#[derive(Debug, Deserialize)]
pub struct SimulationCreate {
    pub name: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct SimulationList {
    pub simulations: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct MetadataUpdate {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct AccountCreate {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AccountUpdate {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EntryCreate {
    pub amount: f64,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RuleCreate {
    pub rule_type: String,
    pub target_account_id: i64,
    pub source_account_id: i64,
    pub time_of_day: String,
    pub currency: String,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub target_amount: f64,
}

pub fn parse_rule_type(raw: &str) -> EngineResult<RuleType> {
    RuleType::from_str_loose(raw).ok_or_else(|| {
        EngineError::validation_field(
            "rule_type",
            format!("rule_type must be one of BACKUP_FUNDING, TOPUP, SWEEP_OUT, got {raw:?}"),
        )
    })
}

pub fn parse_time_of_day(raw: &str) -> EngineResult<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S").map_err(|_| {
        EngineError::validation_field(
            "time_of_day",
            format!("time_of_day must match HH:MM:SS, got {raw:?}"),
        )
    })
}
