use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation/update instants shared by every mutable entity.
///
/// Embedded with `#[serde(flatten)]` (and `#[sqlx(flatten)]` on row types) so the
/// columns stay top-level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
