//! SQL for each table, as free functions over a single connection.
//!
//! The actor owns the pool and decides transaction boundaries; every function here takes
//! `&mut SqliteConnection` so it can run on a pooled connection or inside a transaction.

// Column lists shared by SELECT and RETURNING clauses. Kept as macros so they can be
// spliced into `concat!` and stay `&'static str`.
macro_rules! cabinet_columns {
    () => {
        "id, name, plan, status, owner_id, \
         parliamentary_name, parliamentary_party, parliamentary_photo, official_name, official_title, \
         header_url, footer_url, use_letterhead, \
         plan_tier, mrr_value, payment_method, next_payment, \
         gemini_api_key, openai_api_key, agent_access_token, \
         google_access_token, google_refresh_token, google_token_expires_at, google_calendar_id, google_email, \
         created_at, updated_at"
    };
}

macro_rules! agent_configuration_columns {
    () => {
        "id, cabinet_id, agent_name, tone, welcome_message, is_active, \
         system_prompt, copilot_system_prompt, created_at, updated_at"
    };
}

macro_rules! agent_log_columns {
    () => {
        "id, cabinet_id, agent_name, action, status, payload, response_summary, created_at"
    };
}

macro_rules! demand_columns {
    () => {
        "id, cabinet_id, title, description, beneficiary, author, category, status, priority, \
         obs, assigned_to, external_id, sync_status, last_sync_error, created_by, created_at, updated_at"
    };
}

macro_rules! chunk_columns {
    () => {
        "id, cabinet_id, document_id, content, embedding, embedding_openai, metadata, source_type, created_at"
    };
}

pub(crate) mod agents;
pub(crate) mod cabinets;
pub(crate) mod chunks;
pub(crate) mod demands;

use sqlx::SqliteConnection;

use crate::error::GabineteError;

const COUNT_QUERIES: [(&str, &str); 5] = [
    ("cabinets", "SELECT COUNT(*) FROM cabinets"),
    ("agent_configurations", "SELECT COUNT(*) FROM agent_configurations"),
    ("agent_logs", "SELECT COUNT(*) FROM agent_logs"),
    ("demands", "SELECT COUNT(*) FROM demands"),
    ("document_chunks", "SELECT COUNT(*) FROM document_chunks"),
];

/// Row count per table, in schema order.
pub(crate) async fn table_counts(
    conn: &mut SqliteConnection,
) -> Result<Vec<(&'static str, i64)>, GabineteError> {
    let mut counts = Vec::with_capacity(COUNT_QUERIES.len());
    for (table, sql) in COUNT_QUERIES {
        let n: i64 = sqlx::query_scalar(sql).fetch_one(&mut *conn).await?;
        counts.push((table, n));
    }
    Ok(counts)
}
