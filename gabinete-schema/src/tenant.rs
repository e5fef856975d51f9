use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::ValidationError;

/// Authorization context resolved by the API layer for the current caller.
///
/// Every write that carries a `cabinet_id` is checked against it before it reaches storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub cabinet_id: Uuid,
    /// Authenticated user, recorded as `created_by` on new demands.
    pub user_id: Option<Uuid>,
}

impl TenantContext {
    pub fn new(cabinet_id: Uuid) -> Self {
        Self {
            cabinet_id,
            user_id: None,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn authorize(&self, cabinet_id: Uuid) -> Result<(), ValidationError> {
        if self.cabinet_id == cabinet_id {
            Ok(())
        } else {
            Err(ValidationError::new(
                "cabinet_id",
                "does not match the authorized cabinet",
            ))
        }
    }
}
