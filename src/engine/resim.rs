//! Resimulation policy (C5): any rule/manual-entry mutation purges derived
//! postings and reruns rule expansion + the scheduler inside one
//! transaction, so a crash mid-run rolls the ledger back to its prior
//! consistent state (spec §4.5).

use chrono::NaiveTime;

use crate::engine::expansion::expand_rules;
use crate::engine::propagator::{ManualEntry, Propagator};
use crate::engine::scheduler::Scheduler;
use crate::error::EngineResult;
use crate::models::{BalanceEntry, FundingRule, RuleType};
use crate::store::{queries, SimStore};

/// Purges derived entries (all of them, unless `purge_rule_id` scopes the
/// purge to one rule being deleted), re-expands the current rule set, and
/// runs the scheduler to quiescence. `extra_manuals` seeds ad-hoc manual
/// entries alongside the expanded rule propagators, the way the entries
/// endpoint injects one (spec §4.4 "Seeding").
pub async fn resimulate(
    store: &SimStore,
    purge_rule_id: Option<i64>,
    extra_manuals: Vec<ManualEntry>,
) -> EngineResult<Vec<BalanceEntry>> {
    store
        .transaction(move |tx| {
            queries::purge_derived(tx, purge_rule_id)?;

            let metadata = queries::get_metadata(tx)?;
            let rules = queries::list_rules(tx)?;
            let mut propagators = expand_rules(&metadata, &rules);
            propagators.extend(extra_manuals.into_iter().map(Propagator::ManualEntry));

            let mut scheduler = Scheduler::new(propagators);
            scheduler.run(tx)
        })
        .await
}

/// Creates a funding rule and resimulates in one transaction: spec §4.5
/// treats rule creation as an "other event", so it purges *all* derived
/// entries (not just this rule's, which doesn't have any yet) before
/// re-expanding.
#[allow(clippy::too_many_arguments)]
pub async fn create_rule_and_resimulate(
    store: &SimStore,
    rule_type: RuleType,
    target_account_id: i64,
    source_account_id: i64,
    time_of_day: NaiveTime,
    currency: String,
    threshold: f64,
    target_amount: f64,
) -> EngineResult<FundingRule> {
    store
        .transaction(move |tx| {
            let rule = queries::create_rule(
                tx,
                rule_type,
                target_account_id,
                source_account_id,
                time_of_day,
                &currency,
                threshold,
                target_amount,
            )?;

            queries::purge_derived(tx, None)?;
            let metadata = queries::get_metadata(tx)?;
            let rules = queries::list_rules(tx)?;
            let propagators = expand_rules(&metadata, &rules);
            let mut scheduler = Scheduler::new(propagators);
            scheduler.run(tx)?;

            Ok(rule)
        })
        .await
}

/// Deletes a rule, purges exactly its derived entries, and re-expands the
/// remaining rule set — all inside one transaction (spec §4.5, §8
/// scenario D).
pub async fn delete_rule_and_resimulate(store: &SimStore, rule_id: i64) -> EngineResult<Vec<BalanceEntry>> {
    store
        .transaction(move |tx| {
            queries::purge_derived(tx, Some(rule_id))?;
            queries::delete_rule(tx, rule_id)?;

            let metadata = queries::get_metadata(tx)?;
            let rules = queries::list_rules(tx)?;
            let propagators = expand_rules(&metadata, &rules);
            let mut scheduler = Scheduler::new(propagators);
            scheduler.run(tx)
        })
        .await
}
