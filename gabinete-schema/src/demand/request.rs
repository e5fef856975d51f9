use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::field::FieldUpdate;
use crate::tenant::TenantContext;
use crate::validation::{ValidationError, check_char_len};

pub const TITLE_MAX_CHARS: usize = 500;
pub const DEFAULT_STATUS: &str = "Pendente";
pub const DEFAULT_PRIORITY: &str = "Média";

fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}

fn default_priority() -> String {
    DEFAULT_PRIORITY.to_string()
}

/// Fields shared by the create payload and the response.
///
/// `status`/`priority` defaults are applied here, at the boundary, so they are visible before
/// the first read; the `demands` table carries the same literals as column defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandBase {
    pub title: String,
    pub description: Option<String>,
    pub beneficiary: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    pub obs: Option<String>,
    pub assigned_to: Option<String>,
}

impl DemandBase {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            beneficiary: None,
            author: None,
            category: None,
            status: default_status(),
            priority: default_priority(),
            obs: None,
            assigned_to: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_char_len("title", &self.title, 1, TITLE_MAX_CHARS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandCreate {
    #[serde(flatten)]
    pub fields: DemandBase,
    pub cabinet_id: Uuid,
}

impl DemandCreate {
    pub fn new(cabinet_id: Uuid, title: impl Into<String>) -> Self {
        Self {
            fields: DemandBase::new(title),
            cabinet_id,
        }
    }

    /// Field checks plus the tenant boundary: the payload must target the caller's cabinet.
    pub fn validate_for(&self, ctx: &TenantContext) -> Result<(), ValidationError> {
        ctx.authorize(self.cabinet_id)?;
        self.fields.validate()
    }
}

/// Partial update. Absent => unchanged; `null` clears optional text fields.
///
/// `title`, `status` and `priority` are never null on a stored demand, so an explicit `null` for
/// them is rejected rather than silently ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandUpdate {
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub title: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub description: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub beneficiary: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub author: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub category: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub status: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub priority: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub obs: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub assigned_to: FieldUpdate<String>,
}

impl DemandUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("title", &self.title),
            ("status", &self.status),
            ("priority", &self.priority),
        ] {
            if matches!(value, FieldUpdate::Clear) {
                return Err(ValidationError::new(field, "cannot be null"));
            }
        }
        if let FieldUpdate::Set(title) = &self.title {
            check_char_len("title", title, 1, TITLE_MAX_CHARS)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        [
            &self.title,
            &self.description,
            &self.beneficiary,
            &self.author,
            &self.category,
            &self.status,
            &self.priority,
            &self.obs,
            &self.assigned_to,
        ]
        .iter()
        .all(|f| f.is_unchanged())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_applies_boundary_defaults() {
        let cabinet_id = Uuid::new_v4();
        let raw = serde_json::json!({
            "title": "Buraco na Rua 7",
            "cabinet_id": cabinet_id,
        });
        let create: DemandCreate = serde_json::from_value(raw).expect("parse create");
        assert_eq!(create.fields.status, "Pendente");
        assert_eq!(create.fields.priority, "Média");
        assert_eq!(create.fields.description, None);
        assert_eq!(create.cabinet_id, cabinet_id);
    }

    #[test]
    fn create_rejects_empty_and_oversized_titles() {
        let ctx = TenantContext::new(Uuid::new_v4());

        let err = DemandCreate::new(ctx.cabinet_id, "")
            .validate_for(&ctx)
            .unwrap_err();
        assert_eq!(err.field, "title");

        let long = DemandCreate::new(ctx.cabinet_id, "x".repeat(TITLE_MAX_CHARS + 1));
        assert_eq!(long.validate_for(&ctx).unwrap_err().field, "title");

        let max = DemandCreate::new(ctx.cabinet_id, "x".repeat(TITLE_MAX_CHARS));
        assert!(max.validate_for(&ctx).is_ok());
    }

    #[test]
    fn create_for_other_cabinet_is_rejected_before_field_checks() {
        let ctx = TenantContext::new(Uuid::new_v4());
        let err = DemandCreate::new(Uuid::new_v4(), "")
            .validate_for(&ctx)
            .unwrap_err();
        assert_eq!(err.field, "cabinet_id");
    }

    #[test]
    fn update_distinguishes_absent_from_null() {
        let update: DemandUpdate =
            serde_json::from_str(r#"{"status":"Resolvido","obs":null}"#).unwrap();
        assert_eq!(update.status, FieldUpdate::Set("Resolvido".to_string()));
        assert_eq!(update.obs, FieldUpdate::Clear);
        assert!(update.title.is_unchanged());
        assert!(update.validate().is_ok());
        assert!(!update.is_empty());
    }

    #[test]
    fn update_rejects_null_on_required_columns() {
        for field in ["title", "status", "priority"] {
            let raw = format!(r#"{{"{field}":null}}"#);
            let update: DemandUpdate = serde_json::from_str(&raw).unwrap();
            let err = update.validate().unwrap_err();
            assert_eq!(err.field, field);
        }
    }

    #[test]
    fn update_checks_title_bounds() {
        let update = DemandUpdate {
            title: FieldUpdate::Set(String::new()),
            ..Default::default()
        };
        assert_eq!(update.validate().unwrap_err().field, "title");
        assert!(DemandUpdate::default().is_empty());
    }
}
