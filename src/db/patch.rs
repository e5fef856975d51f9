use chrono::NaiveDate;
use gabinete_schema::{
    CabinetStatus, DemandUpdate, FieldUpdate, Plan, TenantContext, ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use super::vector::{GeminiEmbedding, OpenAiEmbedding, SourceType};

fn empty_object() -> Value {
    json!({})
}

/// Tenant signup payload. Omitted `plan`/`status` take the table defaults (`free`/`active`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CabinetCreate {
    pub name: String,
    pub plan: Option<Plan>,
    pub status: Option<CabinetStatus>,
    pub owner_id: Option<Uuid>,
    pub parliamentary_name: Option<String>,
    pub parliamentary_party: Option<String>,
    pub official_name: Option<String>,
    pub official_title: Option<String>,
    pub agent_access_token: Option<String>,
}

impl CabinetCreate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "must not be blank"));
        }
        Ok(())
    }
}

/// Settings and billing update.
///
/// Non-null columns are `Option` (`None` => keep). Nullable columns are `FieldUpdate`, so an
/// explicit `null` clears them. Lifecycle (`status`) and calendar credentials have their own
/// write paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CabinetPatch {
    pub name: Option<String>,
    pub plan: Option<Plan>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub parliamentary_name: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub parliamentary_party: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub parliamentary_photo: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub official_name: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub official_title: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub header_url: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub footer_url: FieldUpdate<String>,
    pub use_letterhead: Option<bool>,
    pub plan_tier: Option<String>,
    pub mrr_value: Option<f64>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub payment_method: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub next_payment: FieldUpdate<NaiveDate>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub gemini_api_key: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub openai_api_key: FieldUpdate<String>,
    /// Clearing it revokes gateway access.
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub agent_access_token: FieldUpdate<String>,
}

impl CabinetPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("name", self.name.as_deref()),
            ("plan_tier", self.plan_tier.as_deref()),
            ("agent_access_token", self.agent_access_token.as_value().map(String::as_str)),
            ("gemini_api_key", self.gemini_api_key.as_value().map(String::as_str)),
            ("openai_api_key", self.openai_api_key.as_value().map(String::as_str)),
        ] {
            if value.is_some_and(|v| v.trim().is_empty()) {
                return Err(ValidationError::new(field, "must not be blank"));
            }
        }
        if self.mrr_value.is_some_and(|mrr| !(mrr.is_finite() && mrr >= 0.0)) {
            return Err(ValidationError::new("mrr_value", "must be a non-negative number"));
        }
        Ok(())
    }
}

/// Result of a Google OAuth exchange or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarTokens {
    pub access_token: String,
    /// Google omits it on refresh; `None` keeps the stored one.
    pub refresh_token: Option<String>,
    /// Epoch milliseconds.
    pub expires_at: i64,
    pub calendar_id: Option<String>,
    pub email: Option<String>,
}

/// Create-or-update of a cabinet's single agent configuration. Absent => keep current value
/// (or the table default on first write); `null` clears the two optional texts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfigurationUpsert {
    pub agent_name: Option<String>,
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub welcome_message: FieldUpdate<String>,
    pub is_active: Option<bool>,
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_unchanged")]
    pub copilot_system_prompt: FieldUpdate<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLogCreate {
    pub cabinet_id: Option<Uuid>,
    pub agent_name: String,
    pub action: String,
    pub status: String,
    #[serde(default = "empty_object")]
    pub payload: Value,
    #[serde(default = "empty_object")]
    pub response_summary: Value,
}

impl AgentLogCreate {
    pub fn new(
        cabinet_id: Option<Uuid>,
        agent_name: impl Into<String>,
        action: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            cabinet_id,
            agent_name: agent_name.into(),
            action: action.into(),
            status: status.into(),
            payload: empty_object(),
            response_summary: empty_object(),
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_response_summary(mut self, summary: Value) -> Self {
        self.response_summary = summary;
        self
    }

    /// A cabinet-bound entry needs the matching tenant context. Detached entries (gateway
    /// auth failures and the like) are written without one.
    pub fn validate_for(&self, ctx: Option<&TenantContext>) -> Result<(), ValidationError> {
        match (ctx, self.cabinet_id) {
            (Some(ctx), Some(cabinet_id)) => ctx.authorize(cabinet_id)?,
            (None, Some(_)) => {
                return Err(ValidationError::new(
                    "cabinet_id",
                    "requires an authorized cabinet context",
                ));
            }
            (_, None) => {}
        }
        for (field, value) in [
            ("agent_name", &self.agent_name),
            ("action", &self.action),
            ("status", &self.status),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::new(field, "must not be blank"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunkCreate {
    pub cabinet_id: Uuid,
    pub document_id: Option<Uuid>,
    pub content: String,
    pub embedding: Option<GeminiEmbedding>,
    pub embedding_openai: Option<OpenAiEmbedding>,
    #[serde(default = "empty_object")]
    pub metadata: Value,
    #[serde(default)]
    pub source_type: SourceType,
}

impl DocumentChunkCreate {
    pub fn new(cabinet_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            cabinet_id,
            document_id: None,
            content: content.into(),
            embedding: None,
            embedding_openai: None,
            metadata: empty_object(),
            source_type: SourceType::default(),
        }
    }

    pub fn validate_for(&self, ctx: &TenantContext) -> Result<(), ValidationError> {
        ctx.authorize(self.cabinet_id)?;
        if self.content.trim().is_empty() {
            return Err(ValidationError::new("content", "must not be blank"));
        }
        if !self.metadata.is_object() {
            return Err(ValidationError::new("metadata", "must be a JSON object"));
        }
        Ok(())
    }
}

/// Field-level update envelope applied through `DbPatchable`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum RecordPatch {
    Cabinet {
        id: Uuid,
        patch: CabinetPatch,
    },
    CalendarTokens {
        id: Uuid,
        tokens: CalendarTokens,
    },
    /// Drops the stored Google credentials (user disconnect or revoked refresh token).
    DisconnectCalendar {
        id: Uuid,
    },
    Demand {
        cabinet_id: Uuid,
        id: i64,
        patch: DemandUpdate,
    },
}
