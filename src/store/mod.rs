//! Ledger store (C1): one SQLite connection per open simulation, guarded
//! the way the teacher's `VaultDb` guards its connection — an
//! `Arc<tokio::sync::Mutex<Connection>>` — so every API call takes the
//! lock for the duration of its (possibly multi-statement) transaction.

pub mod queries;
pub mod schema;

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::error::{EngineError, EngineResult};
use crate::models::{Account, BalanceEntry, FundingRule, NewBalanceEntry, RuleType, SimulationMetadata};
use queries::ActivityRow;

pub struct SimStore {
    conn: Mutex<Connection>,
}

impl SimStore {
    pub fn open(path: &Path) -> EngineResult<Self> {
        let conn = Connection::open(path).map_err(|e| EngineError::Internal(e.into()))?;
        schema::ensure_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub async fn get_metadata(&self) -> EngineResult<SimulationMetadata> {
        let conn = self.conn.lock().await;
        queries::get_metadata(&conn)
    }

    pub async fn put_metadata(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> EngineResult<()> {
        let conn = self.conn.lock().await;
        queries::put_metadata(&conn, start, end)
    }

    pub async fn create_account(&self, name: &str) -> EngineResult<Account> {
        let conn = self.conn.lock().await;
        queries::create_account(&conn, name)
    }

    pub async fn list_accounts(&self) -> EngineResult<Vec<Account>> {
        let conn = self.conn.lock().await;
        queries::list_accounts(&conn)
    }

    pub async fn get_account(&self, account_id: i64) -> EngineResult<Option<Account>> {
        let conn = self.conn.lock().await;
        queries::get_account(&conn, account_id)
    }

    pub async fn update_account_name(&self, account_id: i64, name: &str) -> EngineResult<Account> {
        let conn = self.conn.lock().await;
        queries::update_account_name(&conn, account_id, name)
    }

    pub async fn delete_account(&self, account_id: i64) -> EngineResult<()> {
        let conn = self.conn.lock().await;
        queries::delete_account(&conn, account_id)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_rule(
        &self,
        rule_type: RuleType,
        target_account_id: i64,
        source_account_id: i64,
        time_of_day: chrono::NaiveTime,
        currency: &str,
        threshold: f64,
        target_amount: f64,
    ) -> EngineResult<FundingRule> {
        let conn = self.conn.lock().await;
        queries::create_rule(
            &conn,
            rule_type,
            target_account_id,
            source_account_id,
            time_of_day,
            currency,
            threshold,
            target_amount,
        )
    }

    pub async fn list_rules(&self) -> EngineResult<Vec<FundingRule>> {
        let conn = self.conn.lock().await;
        queries::list_rules(&conn)
    }

    pub async fn delete_rule(&self, rule_id: i64) -> EngineResult<()> {
        let conn = self.conn.lock().await;
        queries::delete_rule(&conn, rule_id)
    }

    pub async fn list_entries_for_account(&self, account_id: i64) -> EngineResult<Vec<BalanceEntry>> {
        let conn = self.conn.lock().await;
        queries::list_entries_for_account(&conn, account_id)
    }

    pub async fn list_activity(&self) -> EngineResult<Vec<ActivityRow>> {
        let conn = self.conn.lock().await;
        queries::list_activity(&conn)
    }

    /// Inserts a single manual entry outside of a resimulation transaction
    /// (used when an endpoint wants the row back before deciding whether to
    /// trigger C5 at all).
    pub async fn insert_entry(&self, entry: &NewBalanceEntry) -> EngineResult<BalanceEntry> {
        let conn = self.conn.lock().await;
        queries::insert_entry(&conn, entry)
    }

    /// Runs `f` inside one SQLite transaction over this simulation's
    /// connection, committing on `Ok` and rolling back on `Err` (spec §4.1,
    /// §4.5: "operations are transactional per API call").
    pub async fn transaction<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction<'_>) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction()
            .map_err(|e| EngineError::Internal(e.into()))?;
        match f(&tx) {
            Ok(value) => {
                tx.commit().map_err(|e| EngineError::Internal(e.into()))?;
                Ok(value)
            }
            Err(e) => {
                // Rolling back is implicit on drop, but be explicit so the
                // failure path doesn't depend on destructor ordering.
                let _ = tx.rollback();
                Err(e)
            }
        }
    }
}
