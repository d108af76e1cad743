use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Singleton per simulation: the closed time window `[start, end]` over
/// which rules are expanded (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationMetadata {
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
}
