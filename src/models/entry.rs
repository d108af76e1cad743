use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One ledger row.
///
/// An entry with `rule_id = None` is manual and is never deleted by the
/// engine. An entry with `rule_id = Some(r)` is derived and may be purged
/// and regenerated by rule `r` at will.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BalanceEntry {
    pub id: i64,
    pub account_id: i64,
    pub amount: f64,
    pub currency: String,
    pub description: Option<String>,
    pub effective_time: DateTime<Utc>,
    pub rule_id: Option<i64>,
}

/// Fields needed to insert a new ledger row; `id` is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewBalanceEntry {
    pub account_id: i64,
    pub amount: f64,
    pub currency: String,
    pub description: Option<String>,
    pub effective_time: DateTime<Utc>,
    pub rule_id: Option<i64>,
}
