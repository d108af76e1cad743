use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// `rule_type` literal, see spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleType {
    #[serde(rename = "BACKUP_FUNDING")]
    BackupFunding,
    #[serde(rename = "TOPUP")]
    Topup,
    #[serde(rename = "SWEEP_OUT")]
    SweepOut,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::BackupFunding => "BACKUP_FUNDING",
            RuleType::Topup => "TOPUP",
            RuleType::SweepOut => "SWEEP_OUT",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s {
            "BACKUP_FUNDING" => Some(RuleType::BackupFunding),
            "TOPUP" => Some(RuleType::Topup),
            "SWEEP_OUT" => Some(RuleType::SweepOut),
            _ => None,
        }
    }
}

fn serialize_time<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&t.format("%H:%M:%S").to_string())
}

fn deserialize_time<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
    let raw = String::deserialize(d)?;
    NaiveTime::parse_from_str(&raw, "%H:%M:%S").map_err(serde::de::Error::custom)
}

/// A funding rule that moves money between two accounts at a fixed local
/// time of day. Per-type constraints (spec §3) are enforced by
/// [`FundingRule::validate`] at creation time, not re-checked here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingRule {
    pub id: i64,
    pub rule_type: RuleType,
    pub target_account_id: i64,
    pub source_account_id: i64,
    #[serde(serialize_with = "serialize_time", deserialize_with = "deserialize_time")]
    pub time_of_day: NaiveTime,
    pub currency: String,
    pub threshold: f64,
    pub target_amount: f64,
}

/// Field names a failed validation complains about, for the 422 response.
#[derive(Debug, Clone)]
pub struct ValidationFailure {
    pub field: &'static str,
    pub message: String,
}

impl FundingRule {
    /// Applies the per-type coercions and constraints from spec §3.
    /// `BACKUP_FUNDING` rules have `threshold`/`target_amount` coerced to
    /// zero; returns the (possibly coerced) pair, or the first constraint
    /// violation found.
    pub fn coerce_and_validate(
        rule_type: RuleType,
        source_account_id: i64,
        target_account_id: i64,
        threshold: f64,
        target_amount: f64,
    ) -> Result<(f64, f64), ValidationFailure> {
        if source_account_id == target_account_id {
            return Err(ValidationFailure {
                field: "source_account_id",
                message: "source_account_id must differ from target_account_id".into(),
            });
        }

        match rule_type {
            RuleType::BackupFunding => Ok((0.0, 0.0)),
            RuleType::Topup => {
                if target_amount < threshold {
                    return Err(ValidationFailure {
                        field: "target_amount",
                        message: "target_amount must be >= threshold for TOPUP".into(),
                    });
                }
                Ok((threshold, target_amount))
            }
            RuleType::SweepOut => {
                if target_amount > threshold {
                    return Err(ValidationFailure {
                        field: "target_amount",
                        message: "target_amount must be <= threshold for SWEEP_OUT".into(),
                    });
                }
                Ok((threshold, target_amount))
            }
        }
    }
}
