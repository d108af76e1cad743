//! End-to-end scenario tests (spec §8) driven straight through
//! `SimulationManager` and the engine, the way the teacher's own
//! integration tests exercise a runner without going through HTTP.

use chrono::{DateTime, NaiveTime, Utc};
use tempfile::tempdir;

use cash_sim_backend::engine::propagator::ManualEntry;
use cash_sim_backend::engine::resim;
use cash_sim_backend::manager::SimulationManager;
use cash_sim_backend::models::RuleType;

fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn manual(account_id: i64, amount: f64, timestamp: &str) -> ManualEntry {
    ManualEntry {
        account_id,
        amount,
        currency: "USD".into(),
        timestamp: ts(timestamp),
        description: "seed".into(),
    }
}

async fn new_manager() -> (tempfile::TempDir, SimulationManager) {
    let dir = tempdir().unwrap();
    let manager = SimulationManager::new(dir.path().to_path_buf()).unwrap();
    (dir, manager)
}

/// Scenario A (spec §8): BACKUP_FUNDING brings a negative balance back to
/// exactly zero and debits the source by the same amount.
#[tokio::test]
async fn scenario_a_backup_funding_zeros_out_a_negative_balance() {
    let (_dir, manager) = new_manager().await;
    manager
        .create_simulation("scenario-a", ts("2025-01-06T00:00:00Z"), ts("2025-01-10T23:59:59Z"))
        .await
        .unwrap();
    let store = manager.open("scenario-a").await.unwrap();

    let ramp = store.create_account("RAMP").await.unwrap();
    let citi = store.create_account("CITI").await.unwrap();

    resim::resimulate(
        &store,
        None,
        vec![
            manual(ramp.id, 500_000.0, "2025-01-06T00:00:00Z"),
            manual(citi.id, 50_000.0, "2025-01-06T00:00:00Z"),
            manual(citi.id, -60_000.0, "2025-01-07T08:00:00Z"),
        ],
    )
    .await
    .unwrap();

    resim::create_rule_and_resimulate(
        &store,
        RuleType::BackupFunding,
        citi.id,
        ramp.id,
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        "USD".into(),
        0.0,
        0.0,
    )
    .await
    .unwrap();

    let end = ts("2025-01-10T23:59:59Z");
    let citi_balance = store.list_entries_for_account(citi.id).await.unwrap();
    let citi_total: f64 = citi_balance
        .iter()
        .filter(|e| e.effective_time <= end)
        .map(|e| e.amount)
        .sum();
    assert!(citi_total.abs() < 1e-9, "CITI should settle at zero, got {citi_total}");

    let ramp_total: f64 = store
        .list_entries_for_account(ramp.id)
        .await
        .unwrap()
        .iter()
        .map(|e| e.amount)
        .sum();
    assert!((ramp_total - (500_000.0 - 10_000.0)).abs() < 1e-9);
}

/// Scenario B (spec §8): TOPUP tops a below-threshold balance up to
/// `target_amount`, no more and no less.
#[tokio::test]
async fn scenario_b_topup_brings_balance_to_target() {
    let (_dir, manager) = new_manager().await;
    manager
        .create_simulation("scenario-b", ts("2025-02-01T00:00:00Z"), ts("2025-02-03T23:59:59Z"))
        .await
        .unwrap();
    let store = manager.open("scenario-b").await.unwrap();

    let hub = store.create_account("HUB").await.unwrap();
    let branch = store.create_account("BRANCH").await.unwrap();

    resim::resimulate(
        &store,
        None,
        vec![
            manual(hub.id, 1_000_000.0, "2025-02-01T00:00:00Z"),
            manual(branch.id, 20_000.0, "2025-02-01T00:00:00Z"),
        ],
    )
    .await
    .unwrap();

    resim::create_rule_and_resimulate(
        &store,
        RuleType::Topup,
        branch.id,
        hub.id,
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        "USD".into(),
        50_000.0,
        100_000.0,
    )
    .await
    .unwrap();

    let as_of = ts("2025-02-01T09:30:01Z");
    let branch_total: f64 = store
        .list_entries_for_account(branch.id)
        .await
        .unwrap()
        .iter()
        .filter(|e| e.effective_time <= as_of)
        .map(|e| e.amount)
        .sum();
    assert!((branch_total - 100_000.0).abs() < 1e-9, "got {branch_total}");
}

/// Scenario C (spec §8): SWEEP_OUT sweeps a source balance above threshold
/// down to `target_amount`, then reverses once the balance drops back
/// below threshold on its own.
#[tokio::test]
async fn scenario_c_sweep_out_reverses_when_balance_drops() {
    let (_dir, manager) = new_manager().await;
    manager
        .create_simulation("scenario-c", ts("2025-03-01T00:00:00Z"), ts("2025-03-05T23:59:59Z"))
        .await
        .unwrap();
    let store = manager.open("scenario-c").await.unwrap();

    let ops = store.create_account("OPS").await.unwrap();
    let sweep = store.create_account("SWEEP").await.unwrap();

    resim::resimulate(&store, None, vec![manual(ops.id, 200_000.0, "2025-03-01T00:00:00Z")])
        .await
        .unwrap();

    resim::create_rule_and_resimulate(
        &store,
        RuleType::SweepOut,
        sweep.id,
        ops.id,
        NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        "USD".into(),
        80_000.0,
        50_000.0,
    )
    .await
    .unwrap();

    let after_day_one = ts("2025-03-01T18:30:01Z");
    let ops_total: f64 = store
        .list_entries_for_account(ops.id)
        .await
        .unwrap()
        .iter()
        .filter(|e| e.effective_time <= after_day_one)
        .map(|e| e.amount)
        .sum();
    assert!((ops_total - 50_000.0).abs() < 1e-9, "got {ops_total}");

    // A big wire out drops OPS well below the threshold; the next day's
    // firing should reverse (some of) the prior sweep.
    resim::resimulate(
        &store,
        None,
        vec![manual(ops.id, -40_000.0, "2025-03-02T06:00:00Z")],
    )
    .await
    .unwrap();

    let after_day_two = ts("2025-03-02T18:30:01Z");
    let ops_total_2: f64 = store
        .list_entries_for_account(ops.id)
        .await
        .unwrap()
        .iter()
        .filter(|e| e.effective_time <= after_day_two)
        .map(|e| e.amount)
        .sum();
    assert!(ops_total_2 > ops_total, "sweep should partially reverse: {ops_total_2} vs {ops_total}");
}

/// Scenario D (spec §8): deleting a rule purges exactly its derived
/// entries and leaves manual entries untouched.
#[tokio::test]
async fn scenario_d_deleting_a_rule_purges_its_entries_only() {
    let (_dir, manager) = new_manager().await;
    manager
        .create_simulation("scenario-d", ts("2025-04-01T00:00:00Z"), ts("2025-04-03T23:59:59Z"))
        .await
        .unwrap();
    let store = manager.open("scenario-d").await.unwrap();

    let a = store.create_account("A").await.unwrap();
    let b = store.create_account("B").await.unwrap();

    resim::resimulate(
        &store,
        None,
        vec![manual(a.id, 100_000.0, "2025-04-01T00:00:00Z"), manual(b.id, -10_000.0, "2025-04-01T00:00:00Z")],
    )
    .await
    .unwrap();

    let rule = resim::create_rule_and_resimulate(
        &store,
        RuleType::BackupFunding,
        b.id,
        a.id,
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        "USD".into(),
        0.0,
        0.0,
    )
    .await
    .unwrap();

    let before_delete = store.list_entries_for_account(b.id).await.unwrap();
    assert!(before_delete.iter().any(|e| e.rule_id == Some(rule.id)));

    resim::delete_rule_and_resimulate(&store, rule.id).await.unwrap();

    let after_delete = store.list_entries_for_account(b.id).await.unwrap();
    assert!(after_delete.iter().all(|e| e.rule_id.is_none()));
    assert!(after_delete.iter().any(|e| e.amount == -10_000.0), "manual entry must survive");
}

/// Scenario E (spec §8): resimulating twice with no input change produces
/// the exact same ledger, up to auto-assigned ids — the scheduler is
/// idempotent at its fixed point and the overall pipeline is deterministic.
#[tokio::test]
async fn scenario_e_resimulation_is_idempotent() {
    let (_dir, manager) = new_manager().await;
    manager
        .create_simulation("scenario-e", ts("2025-05-01T00:00:00Z"), ts("2025-05-04T23:59:59Z"))
        .await
        .unwrap();
    let store = manager.open("scenario-e").await.unwrap();

    let hub = store.create_account("HUB").await.unwrap();
    let branch = store.create_account("BRANCH").await.unwrap();

    resim::resimulate(
        &store,
        None,
        vec![manual(hub.id, 500_000.0, "2025-05-01T00:00:00Z"), manual(branch.id, -5_000.0, "2025-05-01T00:00:00Z")],
    )
    .await
    .unwrap();

    resim::create_rule_and_resimulate(
        &store,
        RuleType::BackupFunding,
        branch.id,
        hub.id,
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        "USD".into(),
        0.0,
        0.0,
    )
    .await
    .unwrap();

    let first = store.list_entries_for_account(branch.id).await.unwrap();

    // Re-running the resimulation pipeline from scratch (no new inputs)
    // must purge and regenerate the same derived rows.
    resim::resimulate(&store, None, vec![]).await.unwrap();
    let second = store.list_entries_for_account(branch.id).await.unwrap();

    let first_amounts: Vec<f64> = first.iter().map(|e| e.amount).collect();
    let second_amounts: Vec<f64> = second.iter().map(|e| e.amount).collect();
    assert_eq!(first_amounts, second_amounts);
}

/// Scenario F (spec §8): per-type rule constraints reject malformed rule
/// definitions before they ever reach the scheduler.
#[test]
fn scenario_f_rule_constraints_reject_bad_input() {
    use cash_sim_backend::models::FundingRule;

    assert!(FundingRule::coerce_and_validate(RuleType::Topup, 1, 1, 0.0, 0.0).is_err(), "same source/target must fail");

    assert!(
        FundingRule::coerce_and_validate(RuleType::Topup, 1, 2, 100_000.0, 50_000.0).is_err(),
        "TOPUP target_amount < threshold must fail"
    );

    assert!(
        FundingRule::coerce_and_validate(RuleType::SweepOut, 1, 2, 50_000.0, 100_000.0).is_err(),
        "SWEEP_OUT target_amount > threshold must fail"
    );

    let (threshold, target) = FundingRule::coerce_and_validate(RuleType::BackupFunding, 1, 2, 999.0, 999.0).unwrap();
    assert_eq!((threshold, target), (0.0, 0.0), "BACKUP_FUNDING coerces both to zero");
}

/// Universal invariant (spec §8): every rule posting is a net-zero transfer
/// between its two legs, so total money in the system never changes except
/// through manual entries.
#[tokio::test]
async fn conservation_holds_across_a_full_resimulation() {
    let (_dir, manager) = new_manager().await;
    manager
        .create_simulation("conservation", ts("2025-06-01T00:00:00Z"), ts("2025-06-05T23:59:59Z"))
        .await
        .unwrap();
    let store = manager.open("conservation").await.unwrap();

    let a = store.create_account("A").await.unwrap();
    let b = store.create_account("B").await.unwrap();

    let manuals = vec![manual(a.id, 300_000.0, "2025-06-01T00:00:00Z"), manual(b.id, -20_000.0, "2025-06-01T00:00:00Z")];
    let manual_total: f64 = manuals.iter().map(|m| m.amount).sum();

    resim::resimulate(&store, None, manuals).await.unwrap();
    resim::create_rule_and_resimulate(
        &store,
        RuleType::Topup,
        b.id,
        a.id,
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        "USD".into(),
        0.0,
        10_000.0,
    )
    .await
    .unwrap();

    let activity = store.list_activity().await.unwrap();
    let grand_total: f64 = activity.iter().map(|row| row.entry.amount).sum();
    assert!((grand_total - manual_total).abs() < 1e-9, "rule legs must net to zero: total {grand_total}");
}
