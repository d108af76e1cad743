//! Scheduler (C4): a FIFO worklist of propagators plus a listener index,
//! run to a fixed point. Ported from `SimulationRunner.simulate` in
//! `app/simulation.py`.
//!
//! Per spec §9 ("Dynamic listener map"), the listener index holds indices
//! into a stable propagator arena rather than a dict of
//! `account -> [(timestamp, propagator_ref)]`, which in the source creates
//! an ownership cycle between the runner and the propagators it schedules.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::engine::propagator::Propagator;
use crate::error::{EngineError, EngineResult};
use crate::models::BalanceEntry;
use crate::store::queries;

/// Multiplier on `|propagators|` used as the fixed-point iteration bound
/// (spec §5): a non-idempotent propagator bug shows up as a loud failure
/// instead of a silent hang.
const ITERATION_BOUND_FACTOR: usize = 10;

pub struct Scheduler {
    arena: Vec<Propagator>,
    listeners: HashMap<i64, Vec<(DateTime<Utc>, usize)>>,
    queue: VecDeque<usize>,
}

impl Scheduler {
    pub fn new(initial: Vec<Propagator>) -> Self {
        let mut scheduler = Scheduler {
            arena: Vec::new(),
            listeners: HashMap::new(),
            queue: VecDeque::new(),
        };
        for p in initial {
            scheduler.add_propagator(p);
        }
        scheduler
    }

    pub fn add_propagator(&mut self, propagator: Propagator) -> usize {
        let index = self.arena.len();
        for point in propagator.listening_points() {
            self.listeners
                .entry(point.account_id)
                .or_default()
                .push((point.timestamp, index));
        }
        self.arena.push(propagator);
        self.queue.push_back(index);
        index
    }

    /// Runs every pending propagator to quiescence, returning every entry
    /// written along the way (spec §4.4).
    pub fn run(&mut self, tx: &rusqlite::Transaction<'_>) -> EngineResult<Vec<BalanceEntry>> {
        let mut written = Vec::new();
        let bound = ITERATION_BOUND_FACTOR * self.arena.len().max(1);
        let mut iterations = 0usize;

        while let Some(index) = self.queue.pop_front() {
            iterations += 1;
            if iterations > bound {
                return Err(EngineError::Internal(anyhow::anyhow!(
                    "scheduler exceeded fixed-point iteration bound ({bound}); \
                     a propagator is likely non-idempotent"
                )));
            }

            let new_rows = self.arena[index].propagate(tx)?;
            if new_rows.is_empty() {
                continue;
            }

            let mut to_enqueue = Vec::new();
            for row in &new_rows {
                let stored = queries::insert_entry(tx, row)?;
                if let Some(account_listeners) = self.listeners.get(&stored.account_id) {
                    for (listen_ts, listener_index) in account_listeners {
                        if stored.effective_time <= *listen_ts {
                            to_enqueue.push(*listener_index);
                        }
                    }
                }
                written.push(stored);
            }
            for listener_index in to_enqueue {
                self.queue.push_back(listener_index);
            }
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::propagator::ManualEntry;
    use crate::store::schema;
    use rusqlite::Connection;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn manual_entry_has_no_listeners_and_runs_once() {
        let mut conn = Connection::open_in_memory().unwrap();
        schema::ensure_tables(&conn).unwrap();
        conn.execute(
            "INSERT INTO accounts (id, name, created_at) VALUES (1, 'A', '2025-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        let tx = conn.transaction().unwrap();

        let mut scheduler = Scheduler::new(vec![Propagator::ManualEntry(ManualEntry {
            account_id: 1,
            amount: 100.0,
            currency: "USD".into(),
            timestamp: ts("2025-01-01T00:00:00Z"),
            description: "seed".into(),
        })]);
        let written = scheduler.run(&tx).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].amount, 100.0);
    }
}
