//! Rule expansion (C3): for each date in the simulation window and each
//! rule, form the rule's firing timestamp on that date and, if it falls
//! inside the window, emit the matching propagator. Ported from
//! `SimulationRunner.__init__` in `app/simulation.py`.

use chrono::{DateTime, Duration, Utc};

use crate::engine::propagator::{Propagator, RuleLeg};
use crate::models::{FundingRule, RuleType, SimulationMetadata};

/// Insertion order is day-major, then rule-minor, matching the source's
/// nested `for current_date: for rule:` loop — tests observe this order
/// even though the scheduler itself doesn't depend on it (spec §4.3).
pub fn expand_rules(metadata: &SimulationMetadata, rules: &[FundingRule]) -> Vec<Propagator> {
    let mut out = Vec::new();
    let mut current_date = metadata.start_datetime.date_naive();
    let end_date = metadata.end_datetime.date_naive();

    while current_date <= end_date {
        for rule in rules {
            let naive = current_date.and_time(rule.time_of_day);
            let timestamp: DateTime<Utc> = DateTime::from_naive_utc_and_offset(naive, Utc);
            if timestamp < metadata.start_datetime || timestamp > metadata.end_datetime {
                continue;
            }

            let leg = RuleLeg {
                rule_id: rule.id,
                target_account_id: rule.target_account_id,
                source_account_id: rule.source_account_id,
                timestamp,
                currency: rule.currency.clone(),
                threshold: rule.threshold,
                target_amount: rule.target_amount,
            };

            let propagator = match rule.rule_type {
                RuleType::Topup | RuleType::BackupFunding => Propagator::Topup(leg),
                RuleType::SweepOut => Propagator::SweepOut(leg),
            };
            out.push(propagator);
        }
        current_date += Duration::days(1);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn expands_one_propagator_per_day_in_window() {
        let metadata = SimulationMetadata {
            start_datetime: ts("2025-01-06T00:00:00Z"),
            end_datetime: ts("2025-01-10T23:59:59Z"),
        };
        let rule = FundingRule {
            id: 1,
            rule_type: RuleType::BackupFunding,
            target_account_id: 2,
            source_account_id: 1,
            time_of_day: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            currency: "USD".into(),
            threshold: 0.0,
            target_amount: 0.0,
        };
        let propagators = expand_rules(&metadata, std::slice::from_ref(&rule));
        assert_eq!(propagators.len(), 5);
    }
}
