use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::request::DemandBase;
use super::sync::SyncStatus;
use crate::timestamps::Timestamps;

/// Read shape: the create fields plus server-assigned id, audit fields and sync sub-state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandResponse {
    pub id: i64,
    pub cabinet_id: Uuid,
    #[serde(flatten)]
    pub fields: DemandBase,
    pub created_by: Option<Uuid>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    pub external_id: Option<String>,
    pub sync_status: SyncStatus,
    pub last_sync_error: Option<String>,
}
