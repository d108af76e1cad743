//! Plain, connection-level query functions.
//!
//! Every function here takes `&Connection` (a `rusqlite::Transaction`
//! derefs to one) so the same code path runs either autocommitted from a
//! single HTTP handler, or inside the single transaction a resimulation
//! run wraps around purge + expand + schedule (spec §4.5).

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::error::{EngineError, EngineResult};
use crate::models::{Account, BalanceEntry, FundingRule, NewBalanceEntry, RuleType, SimulationMetadata};

fn fmt_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_time(s: &str) -> EngineResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| EngineError::Internal(anyhow::anyhow!("bad stored timestamp {s:?}: {e}")))
}

// ---------------------------------------------------------------- metadata

pub fn get_metadata(conn: &rusqlite::Connection) -> EngineResult<SimulationMetadata> {
    conn.query_row(
        "SELECT start_datetime, end_datetime FROM simulation_metadata WHERE id = 1",
        [],
        |row| {
            let start: String = row.get(0)?;
            let end: String = row.get(1)?;
            Ok((start, end))
        },
    )
    .optional()?
    .map(|(start, end)| -> EngineResult<SimulationMetadata> {
        Ok(SimulationMetadata {
            start_datetime: parse_time(&start)?,
            end_datetime: parse_time(&end)?,
        })
    })
    .unwrap_or_else(|| Err(EngineError::NotFound("simulation metadata".into())))
}

pub fn put_metadata(
    conn: &rusqlite::Connection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> EngineResult<()> {
    conn.execute(
        "INSERT INTO simulation_metadata (id, start_datetime, end_datetime) VALUES (1, ?1, ?2)
         ON CONFLICT(id) DO UPDATE SET start_datetime = excluded.start_datetime, end_datetime = excluded.end_datetime",
        params![fmt_time(&start), fmt_time(&end)],
    )?;
    Ok(())
}

// ---------------------------------------------------------------- accounts

fn row_to_account(row: &Row) -> rusqlite::Result<(i64, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

pub fn create_account(conn: &rusqlite::Connection, name: &str) -> EngineResult<Account> {
    let now = fmt_time(&Utc::now());
    conn.execute(
        "INSERT INTO accounts (name, created_at) VALUES (?1, ?2)",
        params![name, now],
    )?;
    let id = conn.last_insert_rowid();
    get_account(conn, id)?.ok_or_else(|| EngineError::Internal(anyhow::anyhow!("insert vanished")))
}

pub fn list_accounts(conn: &rusqlite::Connection) -> EngineResult<Vec<Account>> {
    let mut stmt = conn.prepare("SELECT id, name, created_at FROM accounts ORDER BY id")?;
    let rows = stmt
        .query_map([], row_to_account)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter()
        .map(|(id, name, created_at)| {
            Ok(Account {
                id,
                name,
                created_at: parse_time(&created_at)?,
            })
        })
        .collect()
}

pub fn get_account(conn: &rusqlite::Connection, account_id: i64) -> EngineResult<Option<Account>> {
    let found = conn
        .query_row(
            "SELECT id, name, created_at FROM accounts WHERE id = ?1",
            params![account_id],
            row_to_account,
        )
        .optional()?;
    found
        .map(|(id, name, created_at)| {
            Ok(Account {
                id,
                name,
                created_at: parse_time(&created_at)?,
            })
        })
        .transpose()
}

pub fn update_account_name(
    conn: &rusqlite::Connection,
    account_id: i64,
    name: &str,
) -> EngineResult<Account> {
    let n = conn.execute(
        "UPDATE accounts SET name = ?1 WHERE id = ?2",
        params![name, account_id],
    )?;
    if n == 0 {
        return Err(EngineError::NotFound(format!("account {account_id}")));
    }
    get_account(conn, account_id)?.ok_or_else(|| EngineError::NotFound(format!("account {account_id}")))
}

pub fn delete_account(conn: &rusqlite::Connection, account_id: i64) -> EngineResult<()> {
    let n = conn.execute("DELETE FROM accounts WHERE id = ?1", params![account_id])?;
    if n == 0 {
        return Err(EngineError::NotFound(format!("account {account_id}")));
    }
    Ok(())
}

// ------------------------------------------------------------------ rules

fn row_to_rule(row: &Row) -> rusqlite::Result<(i64, String, i64, i64, String, String, f64, f64)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn build_rule(
    id: i64,
    rule_type: String,
    target_account_id: i64,
    source_account_id: i64,
    time_of_day: String,
    currency: String,
    threshold: f64,
    target_amount: f64,
) -> EngineResult<FundingRule> {
    let rule_type = RuleType::from_str_loose(&rule_type)
        .ok_or_else(|| EngineError::Internal(anyhow::anyhow!("bad stored rule_type {rule_type:?}")))?;
    let time_of_day = chrono::NaiveTime::parse_from_str(&time_of_day, "%H:%M:%S")
        .map_err(|e| EngineError::Internal(anyhow::anyhow!("bad stored time_of_day: {e}")))?;
    Ok(FundingRule {
        id,
        rule_type,
        target_account_id,
        source_account_id,
        time_of_day,
        currency,
        threshold,
        target_amount,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn create_rule(
    conn: &rusqlite::Connection,
    rule_type: RuleType,
    target_account_id: i64,
    source_account_id: i64,
    time_of_day: chrono::NaiveTime,
    currency: &str,
    threshold: f64,
    target_amount: f64,
) -> EngineResult<FundingRule> {
    conn.execute(
        "INSERT INTO funding_rules
            (rule_type, target_account_id, source_account_id, time_of_day, currency, threshold, target_amount)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            rule_type.as_str(),
            target_account_id,
            source_account_id,
            time_of_day.format("%H:%M:%S").to_string(),
            currency,
            threshold,
            target_amount,
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_rule(conn, id)?.ok_or_else(|| EngineError::Internal(anyhow::anyhow!("insert vanished")))
}

pub fn get_rule(conn: &rusqlite::Connection, rule_id: i64) -> EngineResult<Option<FundingRule>> {
    conn.query_row(
        "SELECT id, rule_type, target_account_id, source_account_id, time_of_day, currency, threshold, target_amount
         FROM funding_rules WHERE id = ?1",
        params![rule_id],
        row_to_rule,
    )
    .optional()?
    .map(|(id, rt, tgt, src, tod, cur, thr, amt)| build_rule(id, rt, tgt, src, tod, cur, thr, amt))
    .transpose()
}

/// Ordered by `id` — spec §4.3 notes rule expansion relies on insertion
/// order, which `id` preserves.
pub fn list_rules(conn: &rusqlite::Connection) -> EngineResult<Vec<FundingRule>> {
    let mut stmt = conn.prepare(
        "SELECT id, rule_type, target_account_id, source_account_id, time_of_day, currency, threshold, target_amount
         FROM funding_rules ORDER BY id",
    )?;
    let rows = stmt
        .query_map([], row_to_rule)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter()
        .map(|(id, rt, tgt, src, tod, cur, thr, amt)| build_rule(id, rt, tgt, src, tod, cur, thr, amt))
        .collect()
}

pub fn delete_rule(conn: &rusqlite::Connection, rule_id: i64) -> EngineResult<()> {
    let n = conn.execute("DELETE FROM funding_rules WHERE id = ?1", params![rule_id])?;
    if n == 0 {
        return Err(EngineError::NotFound(format!("funding rule {rule_id}")));
    }
    Ok(())
}

/// Wipes every account, rule and entry, keeping only the schema — used by
/// the `/seed` endpoint to make re-seeding idempotent (spec §8 scenario E).
pub fn reset_all(conn: &rusqlite::Connection) -> EngineResult<()> {
    conn.execute("DELETE FROM balance_entries", [])?;
    conn.execute("DELETE FROM funding_rules", [])?;
    conn.execute("DELETE FROM accounts", [])?;
    Ok(())
}

// ------------------------------------------------------------ ledger rows

fn row_to_entry(row: &Row) -> rusqlite::Result<(i64, i64, f64, String, Option<String>, String, Option<i64>)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn build_entry(
    id: i64,
    account_id: i64,
    amount: f64,
    currency: String,
    description: Option<String>,
    effective_time: String,
    rule_id: Option<i64>,
) -> EngineResult<BalanceEntry> {
    Ok(BalanceEntry {
        id,
        account_id,
        amount,
        currency,
        description,
        effective_time: parse_time(&effective_time)?,
        rule_id,
    })
}

/// `Σ amount` over entries matching `(account_id, currency, effective_time <= as_of)`,
/// and `rule_id == rule_id` when supplied. `0.0` when nothing matches (spec §4.1).
pub fn get_balance(
    conn: &rusqlite::Connection,
    account_id: i64,
    as_of: DateTime<Utc>,
    currency: &str,
    rule_id: Option<i64>,
) -> EngineResult<f64> {
    let sum: f64 = match rule_id {
        Some(r) => conn.query_row(
            "SELECT COALESCE(SUM(amount), 0.0) FROM balance_entries
             WHERE account_id = ?1 AND currency = ?2 AND effective_time <= ?3 AND rule_id = ?4",
            params![account_id, currency, fmt_time(&as_of), r],
            |row| row.get(0),
        )?,
        None => conn.query_row(
            "SELECT COALESCE(SUM(amount), 0.0) FROM balance_entries
             WHERE account_id = ?1 AND currency = ?2 AND effective_time <= ?3",
            params![account_id, currency, fmt_time(&as_of)],
            |row| row.get(0),
        )?,
    };
    Ok(sum)
}

/// Same as [`get_balance`] but filters on `effective_time == exact_time`
/// (spec §4.1) — used by propagators to see what they've already posted at
/// their own settlement moment.
pub fn get_balance_at_timestamp(
    conn: &rusqlite::Connection,
    account_id: i64,
    exact_time: DateTime<Utc>,
    currency: &str,
    rule_id: Option<i64>,
) -> EngineResult<f64> {
    let sum: f64 = match rule_id {
        Some(r) => conn.query_row(
            "SELECT COALESCE(SUM(amount), 0.0) FROM balance_entries
             WHERE account_id = ?1 AND currency = ?2 AND effective_time = ?3 AND rule_id = ?4",
            params![account_id, currency, fmt_time(&exact_time), r],
            |row| row.get(0),
        )?,
        None => conn.query_row(
            "SELECT COALESCE(SUM(amount), 0.0) FROM balance_entries
             WHERE account_id = ?1 AND currency = ?2 AND effective_time = ?3",
            params![account_id, currency, fmt_time(&exact_time)],
            |row| row.get(0),
        )?,
    };
    Ok(sum)
}

/// Removes entries where `rule_id` matches (or, if absent, every entry with
/// `rule_id IS NOT NULL`). Returns the number of rows removed.
pub fn purge_derived(conn: &rusqlite::Connection, rule_id: Option<i64>) -> EngineResult<usize> {
    let n = match rule_id {
        Some(r) => conn.execute("DELETE FROM balance_entries WHERE rule_id = ?1", params![r])?,
        None => conn.execute("DELETE FROM balance_entries WHERE rule_id IS NOT NULL", [])?,
    };
    Ok(n)
}

pub fn insert_entry(conn: &rusqlite::Connection, entry: &NewBalanceEntry) -> EngineResult<BalanceEntry> {
    conn.execute(
        "INSERT INTO balance_entries (account_id, amount, currency, description, effective_time, rule_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.account_id,
            entry.amount,
            entry.currency,
            entry.description,
            fmt_time(&entry.effective_time),
            entry.rule_id,
        ],
    )?;
    let id = conn.last_insert_rowid();
    build_entry(
        id,
        entry.account_id,
        entry.amount,
        entry.currency.clone(),
        entry.description.clone(),
        fmt_time(&entry.effective_time),
        entry.rule_id,
    )
}

/// Ordered by `(effective_time, id)` (spec §6).
pub fn list_entries_for_account(
    conn: &rusqlite::Connection,
    account_id: i64,
) -> EngineResult<Vec<BalanceEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, account_id, amount, currency, description, effective_time, rule_id
         FROM balance_entries WHERE account_id = ?1 ORDER BY effective_time, id",
    )?;
    let rows = stmt
        .query_map(params![account_id], row_to_entry)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter()
        .map(|(id, aid, amt, cur, desc, time, rid)| build_entry(id, aid, amt, cur, desc, time, rid))
        .collect()
}

/// One row of `/activity`: a ledger entry joined with its account's name,
/// ordered by `(effective_time, account_id, id)` (spec §6).
#[derive(Debug, Clone, serde::Serialize)]
pub struct ActivityRow {
    #[serde(flatten)]
    pub entry: BalanceEntry,
    pub account_name: String,
}

pub fn list_activity(conn: &rusqlite::Connection) -> EngineResult<Vec<ActivityRow>> {
    let mut stmt = conn.prepare(
        "SELECT be.id, be.account_id, be.amount, be.currency, be.description, be.effective_time, be.rule_id, a.name
         FROM balance_entries be JOIN accounts a ON a.id = be.account_id
         ORDER BY be.effective_time, be.account_id, be.id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<i64>>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter()
        .map(|(id, aid, amt, cur, desc, time, rid, name)| {
            Ok(ActivityRow {
                entry: build_entry(id, aid, amt, cur, desc, time, rid)?,
                account_name: name,
            })
        })
        .collect()
}
