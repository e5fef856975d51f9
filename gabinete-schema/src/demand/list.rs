use serde::{Deserialize, Serialize};

use super::response::DemandResponse;
use super::sync::SyncStatus;
use crate::validation::ValidationError;

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

/// Page selection and optional filters for a tenant's demand list.
///
/// The tenant itself is never part of this struct: list operations take `cabinet_id` as a
/// separate, mandatory argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandQuery {
    /// 1-based.
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub sync_status: Option<SyncStatus>,
}

impl Default for DemandQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
            status: None,
            priority: None,
            sync_status: None,
        }
    }
}

impl DemandQuery {
    pub fn page(page: u32, per_page: u32) -> Self {
        Self {
            page,
            per_page,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.page == 0 {
            return Err(ValidationError::new("page", "must be at least 1"));
        }
        if self.per_page == 0 || self.per_page > MAX_PER_PAGE {
            return Err(ValidationError::new(
                "per_page",
                format!("must be between 1 and {MAX_PER_PAGE}"),
            ));
        }
        Ok(())
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

/// One page of demands. `total` counts every row matching the filters, not just this page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandListResponse {
    pub items: Vec<DemandResponse>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

impl DemandListResponse {
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.per_page.max(1)))
    }
}
