use chrono::{DateTime, NaiveDate, Utc};
use gabinete_schema::{CabinetStatus, DemandBase, DemandResponse, Plan, SyncStatus, Timestamps};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use sqlx::types::Json;
use std::fmt;
use uuid::Uuid;

use super::vector::{GeminiEmbedding, OpenAiEmbedding, SourceType};
use crate::utils::logging::redact_opt;

/// Tenant root. Credentials are never serialized and are masked in `Debug`.
#[derive(Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Cabinet {
    pub id: Uuid,
    pub name: String,
    pub plan: Plan,
    pub status: CabinetStatus,
    pub owner_id: Option<Uuid>,

    pub parliamentary_name: Option<String>,
    pub parliamentary_party: Option<String>,
    pub parliamentary_photo: Option<String>,
    pub official_name: Option<String>,
    pub official_title: Option<String>,

    pub header_url: Option<String>,
    pub footer_url: Option<String>,
    pub use_letterhead: bool,

    pub plan_tier: String,
    pub mrr_value: f64,
    pub payment_method: Option<String>,
    pub next_payment: Option<NaiveDate>,

    #[serde(skip_serializing, default)]
    pub gemini_api_key: Option<String>,
    #[serde(skip_serializing, default)]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing, default)]
    pub agent_access_token: Option<String>,

    #[serde(skip_serializing, default)]
    pub google_access_token: Option<String>,
    #[serde(skip_serializing, default)]
    pub google_refresh_token: Option<String>,
    /// Epoch milliseconds.
    pub google_token_expires_at: Option<i64>,
    pub google_calendar_id: String,
    pub google_email: Option<String>,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Cabinet {
    pub fn is_archived(&self) -> bool {
        self.status == CabinetStatus::Archived
    }

    pub fn has_calendar_link(&self) -> bool {
        self.google_refresh_token.is_some()
    }

    /// A missing expiry counts as expired, so the refresh job always runs once after linking.
    pub fn calendar_token_expired(&self, now: DateTime<Utc>) -> bool {
        self.google_token_expires_at
            .is_none_or(|expires_at| now.timestamp_millis() >= expires_at)
    }
}

impl fmt::Debug for Cabinet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cabinet")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("plan", &self.plan)
            .field("status", &self.status)
            .field("owner_id", &self.owner_id)
            .field("official_name", &self.official_name)
            .field("plan_tier", &self.plan_tier)
            .field("gemini_api_key", &redact_opt(self.gemini_api_key.as_deref()))
            .field("openai_api_key", &redact_opt(self.openai_api_key.as_deref()))
            .field(
                "agent_access_token",
                &redact_opt(self.agent_access_token.as_deref()),
            )
            .field(
                "google_refresh_token",
                &redact_opt(self.google_refresh_token.as_deref()),
            )
            .field("google_calendar_id", &self.google_calendar_id)
            .field("timestamps", &self.timestamps)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AgentConfiguration {
    pub id: Uuid,
    pub cabinet_id: Uuid,
    pub agent_name: String,
    pub tone: String,
    pub welcome_message: Option<String>,
    pub is_active: bool,
    /// End-user prompt template; placeholders are resolved by `render_system_prompt`.
    pub system_prompt: String,
    pub copilot_system_prompt: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

/// Append-only event record. There is no update or delete path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AgentLog {
    pub id: Uuid,
    /// Null when the event happened before a tenant could be resolved.
    pub cabinet_id: Option<Uuid>,
    pub agent_name: String,
    pub action: String,
    pub status: String,
    pub payload: Json<Value>,
    pub response_summary: Json<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DbDemand {
    pub id: i64,
    pub cabinet_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub beneficiary: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub status: String,
    pub priority: String,
    pub obs: Option<String>,
    pub assigned_to: Option<String>,
    pub external_id: Option<String>,
    pub sync_status: SyncStatus,
    pub last_sync_error: Option<String>,
    pub created_by: Option<Uuid>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl From<DbDemand> for DemandResponse {
    fn from(row: DbDemand) -> Self {
        DemandResponse {
            id: row.id,
            cabinet_id: row.cabinet_id,
            fields: DemandBase {
                title: row.title,
                description: row.description,
                beneficiary: row.beneficiary,
                author: row.author,
                category: row.category,
                status: row.status,
                priority: row.priority,
                obs: row.obs,
                assigned_to: row.assigned_to,
            },
            created_by: row.created_by,
            timestamps: row.timestamps,
            external_id: row.external_id,
            sync_status: row.sync_status,
            last_sync_error: row.last_sync_error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DocumentChunk {
    pub id: Uuid,
    pub cabinet_id: Uuid,
    pub document_id: Option<Uuid>,
    pub content: String,
    pub embedding: Option<GeminiEmbedding>,
    pub embedding_openai: Option<OpenAiEmbedding>,
    /// Shape depends on `source_type` (scrape URL, upload filename, legacy vector id, ...).
    #[sqlx(rename = "metadata")]
    #[serde(rename = "metadata")]
    pub chunk_metadata: Json<Value>,
    pub source_type: SourceType,
    pub created_at: DateTime<Utc>,
}
