//! Propagators (C2): tagged variants that advertise listening points and
//! write zero or more ledger rows when run. Re-architected from the
//! source's `Propagator` abstract base + three subclasses
//! (`app/simulation.py`) into a sum type per spec §9 ("Polymorphic
//! propagators"), so the scheduler dispatches on the tag instead of paying
//! for virtual calls, and the propagator list stays plain data.

use chrono::{DateTime, Utc};

use crate::error::EngineResult;
use crate::models::{approx_zero, NewBalanceEntry};
use crate::store::queries;

/// `(account_id, timestamp)` a propagator watches: it re-enqueues whenever
/// an entry lands on that account at or before that timestamp.
#[derive(Debug, Clone, Copy)]
pub struct ListeningPoint {
    pub account_id: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum Propagator {
    ManualEntry(ManualEntry),
    Topup(RuleLeg),
    SweepOut(RuleLeg),
}

#[derive(Debug, Clone)]
pub struct ManualEntry {
    pub account_id: i64,
    pub amount: f64,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

/// Shared fields for `Topup` and `SweepOut`; `BACKUP_FUNDING` rules are
/// expanded as a `Topup` with `threshold = target_amount = 0` (spec §4.2.2).
#[derive(Debug, Clone)]
pub struct RuleLeg {
    pub rule_id: i64,
    pub target_account_id: i64,
    pub source_account_id: i64,
    pub timestamp: DateTime<Utc>,
    pub currency: String,
    pub threshold: f64,
    pub target_amount: f64,
}

impl RuleLeg {
    fn funding_timestamp(&self) -> DateTime<Utc> {
        self.timestamp + crate::models::funding_lag()
    }
}

impl Propagator {
    pub fn listening_points(&self) -> Vec<ListeningPoint> {
        match self {
            Propagator::ManualEntry(_) => vec![],
            Propagator::Topup(leg) => vec![ListeningPoint {
                account_id: leg.target_account_id,
                timestamp: leg.timestamp,
            }],
            Propagator::SweepOut(leg) => vec![ListeningPoint {
                account_id: leg.source_account_id,
                timestamp: leg.timestamp,
            }],
        }
    }

    pub fn propagate(&self, tx: &rusqlite::Transaction<'_>) -> EngineResult<Vec<NewBalanceEntry>> {
        match self {
            Propagator::ManualEntry(m) => Ok(vec![NewBalanceEntry {
                account_id: m.account_id,
                amount: m.amount,
                currency: m.currency.clone(),
                description: Some(m.description.clone()),
                effective_time: m.timestamp,
                rule_id: None,
            }]),
            Propagator::Topup(leg) => propagate_topup(tx, leg),
            Propagator::SweepOut(leg) => propagate_sweep_out(tx, leg),
        }
    }
}

/// §4.2.2. Target balance below threshold gets topped up to
/// `target_amount`, net of what this rule already contributed; target
/// balance above threshold unwinds some or all of a prior top-up.
fn propagate_topup(tx: &rusqlite::Transaction<'_>, leg: &RuleLeg) -> EngineResult<Vec<NewBalanceEntry>> {
    let target_balance = queries::get_balance(tx, leg.target_account_id, leg.timestamp, &leg.currency, None)?;
    let prior = queries::get_balance_at_timestamp(
        tx,
        leg.target_account_id,
        leg.funding_timestamp(),
        &leg.currency,
        Some(leg.rule_id),
    )?;

    let delta = if target_balance > leg.threshold {
        -prior.min(target_balance - leg.threshold)
    } else if target_balance < leg.threshold {
        leg.target_amount - target_balance - prior
    } else {
        0.0
    };

    if delta == 0.0 {
        return Ok(vec![]);
    }

    tracing::debug!(
        rule_id = leg.rule_id,
        target_balance,
        prior,
        delta,
        "topup rule fired"
    );

    let description = format!("{} -> {} Topup", leg.source_account_id, leg.target_account_id);
    Ok(vec![
        NewBalanceEntry {
            account_id: leg.source_account_id,
            amount: -delta,
            currency: leg.currency.clone(),
            description: Some(description.clone()),
            effective_time: leg.timestamp,
            rule_id: Some(leg.rule_id),
        },
        NewBalanceEntry {
            account_id: leg.target_account_id,
            amount: delta,
            currency: leg.currency.clone(),
            description: Some(description),
            effective_time: leg.funding_timestamp(),
            rule_id: Some(leg.rule_id),
        },
    ])
}

/// §4.2.3. Source balance above threshold is swept down to
/// `target_amount`; once it drops back below threshold, up to the
/// previously-swept amount is reversed.
fn propagate_sweep_out(tx: &rusqlite::Transaction<'_>, leg: &RuleLeg) -> EngineResult<Vec<NewBalanceEntry>> {
    let source_balance = queries::get_balance(tx, leg.source_account_id, leg.timestamp, &leg.currency, None)?;
    let prior = queries::get_balance_at_timestamp(
        tx,
        leg.source_account_id,
        leg.funding_timestamp(),
        &leg.currency,
        Some(leg.rule_id),
    )?;
    // `prior` is <= 0 by convention: sweeps debit the source.

    let delta = if source_balance > leg.threshold {
        -(source_balance - leg.target_amount + prior)
    } else if source_balance < leg.threshold && prior < 0.0 {
        (-prior).min(leg.threshold - source_balance)
    } else {
        0.0
    };

    if approx_zero(delta) {
        return Ok(vec![]);
    }

    tracing::debug!(
        rule_id = leg.rule_id,
        source_balance,
        prior,
        delta,
        "sweep-out rule fired"
    );

    let description = format!("{} -> {} Sweep Out", leg.source_account_id, leg.target_account_id);
    let funding_timestamp = leg.funding_timestamp();
    Ok(vec![
        NewBalanceEntry {
            account_id: leg.source_account_id,
            amount: delta,
            currency: leg.currency.clone(),
            description: Some(description.clone()),
            effective_time: funding_timestamp,
            rule_id: Some(leg.rule_id),
        },
        NewBalanceEntry {
            account_id: leg.target_account_id,
            amount: -delta,
            currency: leg.currency.clone(),
            description: Some(description),
            effective_time: funding_timestamp,
            rule_id: Some(leg.rule_id),
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::schema;
    use rusqlite::Connection;

    fn open_mem() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::ensure_tables(&conn).unwrap();
        conn.execute("INSERT INTO accounts (id, name, created_at) VALUES (1, 'A', '2025-01-01T00:00:00Z')", []).unwrap();
        conn.execute("INSERT INTO accounts (id, name, created_at) VALUES (2, 'B', '2025-01-01T00:00:00Z')", []).unwrap();
        conn
    }

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn topup_is_idempotent_at_fixed_point() {
        let mut conn = open_mem();
        let tx = conn.transaction().unwrap();
        // Seed CITI below threshold.
        queries::insert_entry(
            &tx,
            &NewBalanceEntry {
                account_id: 2,
                amount: -60_000.0,
                currency: "USD".into(),
                description: None,
                effective_time: ts("2025-01-07T08:00:00Z"),
                rule_id: None,
            },
        )
        .unwrap();

        let leg = RuleLeg {
            rule_id: 1,
            target_account_id: 2,
            source_account_id: 1,
            timestamp: ts("2025-01-07T09:00:00Z"),
            currency: "USD".into(),
            threshold: 0.0,
            target_amount: 0.0,
        };

        let first = propagate_topup(&tx, &leg).unwrap();
        assert_eq!(first.len(), 2);
        for e in &first {
            queries::insert_entry(&tx, e).unwrap();
        }

        let second = propagate_topup(&tx, &leg).unwrap();
        assert!(second.is_empty(), "re-running at fixed point must write nothing");
    }

    #[test]
    fn sweep_out_conserves_money() {
        let mut conn = open_mem();
        let tx = conn.transaction().unwrap();
        queries::insert_entry(
            &tx,
            &NewBalanceEntry {
                account_id: 1,
                amount: 110_000.0,
                currency: "USD".into(),
                description: None,
                effective_time: ts("2025-01-08T06:00:00Z"),
                rule_id: None,
            },
        )
        .unwrap();

        let leg = RuleLeg {
            rule_id: 9,
            target_account_id: 2,
            source_account_id: 1,
            timestamp: ts("2025-01-08T11:00:00Z"),
            currency: "USD".into(),
            threshold: 80_000.0,
            target_amount: 50_000.0,
        };
        let entries = propagate_sweep_out(&tx, &leg).unwrap();
        assert_eq!(entries.len(), 2);
        let total: f64 = entries.iter().map(|e| e.amount).sum();
        assert!(total.abs() < 1e-9, "source/target legs must net to zero");
        assert_eq!(entries[0].amount, -60_000.0);
    }
}
