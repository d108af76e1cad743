use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bank account within a simulation.
///
/// Deletion cascades to its balance entries (enforced at the store layer
/// with `ON DELETE CASCADE`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
