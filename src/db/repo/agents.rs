use chrono::Utc;
use sqlx::SqliteConnection;
use sqlx::types::Json;
use tracing::debug;
use uuid::Uuid;

use crate::db::models::{AgentConfiguration, AgentLog};
use crate::db::patch::{AgentConfigurationUpsert, AgentLogCreate};
use crate::error::GabineteError;
use gabinete_schema::TenantContext;

/// Creates the cabinet's configuration from column defaults on first call, then applies
/// the provided fields. Run inside a transaction.
pub(crate) async fn upsert_configuration(
    conn: &mut SqliteConnection,
    cabinet_id: Uuid,
    upsert: AgentConfigurationUpsert,
) -> Result<AgentConfiguration, GabineteError> {
    let now = Utc::now();

    let inserted = sqlx::query(
        r#"
        INSERT INTO agent_configurations (id, cabinet_id, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(cabinet_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(cabinet_id)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    let AgentConfigurationUpsert {
        agent_name,
        tone,
        welcome_message,
        is_active,
        system_prompt,
        copilot_system_prompt,
    } = upsert;

    let agent_name_set = agent_name.is_some();
    let tone_set = tone.is_some();
    let is_active_set = is_active.is_some();
    let welcome_message_set = welcome_message.is_touched();
    let system_prompt_set = system_prompt.is_some();
    let copilot_system_prompt_set = copilot_system_prompt.is_touched();

    sqlx::query(
        r#"
        UPDATE agent_configurations
        SET
            agent_name = COALESCE(?, agent_name),
            tone = COALESCE(?, tone),
            welcome_message = CASE WHEN ? THEN ? ELSE welcome_message END,
            is_active = COALESCE(?, is_active),
            system_prompt = COALESCE(?, system_prompt),
            copilot_system_prompt = CASE WHEN ? THEN ? ELSE copilot_system_prompt END,
            updated_at = ?
        WHERE cabinet_id = ?
        "#,
    )
    .bind(agent_name)
    .bind(tone)
    .bind(welcome_message_set)
    .bind(welcome_message.as_value().map(String::as_str))
    .bind(is_active)
    .bind(system_prompt)
    .bind(copilot_system_prompt_set)
    .bind(copilot_system_prompt.as_value().map(String::as_str))
    .bind(now)
    .bind(cabinet_id)
    .execute(&mut *conn)
    .await?;

    debug!(
        %cabinet_id,
        created = inserted == 1,
        agent_name_set,
        tone_set,
        welcome_message_set,
        is_active_set,
        system_prompt_set,
        copilot_system_prompt_set,
        "agent configuration upserted"
    );

    get_configuration(conn, cabinet_id).await
}

pub(crate) async fn get_configuration(
    conn: &mut SqliteConnection,
    cabinet_id: Uuid,
) -> Result<AgentConfiguration, GabineteError> {
    sqlx::query_as::<_, AgentConfiguration>(concat!(
        "SELECT ",
        agent_configuration_columns!(),
        " FROM agent_configurations WHERE cabinet_id = ?"
    ))
    .bind(cabinet_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| GabineteError::not_found("agent_configuration", cabinet_id))
}

pub(crate) async fn append_log(
    conn: &mut SqliteConnection,
    ctx: Option<&TenantContext>,
    create: AgentLogCreate,
) -> Result<AgentLog, GabineteError> {
    create.validate_for(ctx)?;

    let log = sqlx::query_as::<_, AgentLog>(concat!(
        r#"
        INSERT INTO agent_logs (id, cabinet_id, agent_name, action, status, payload, response_summary, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING "#,
        agent_log_columns!()
    ))
    .bind(Uuid::new_v4())
    .bind(create.cabinet_id)
    .bind(create.agent_name)
    .bind(create.action)
    .bind(create.status)
    .bind(Json(create.payload))
    .bind(Json(create.response_summary))
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    debug!(
        log_id = %log.id,
        cabinet_id = ?log.cabinet_id,
        agent = %log.agent_name,
        action = %log.action,
        status = %log.status,
        "agent log appended"
    );
    Ok(log)
}

/// Newest first.
pub(crate) async fn list_logs(
    conn: &mut SqliteConnection,
    cabinet_id: Uuid,
    limit: u32,
) -> Result<Vec<AgentLog>, GabineteError> {
    let rows = sqlx::query_as::<_, AgentLog>(concat!(
        "SELECT ",
        agent_log_columns!(),
        " FROM agent_logs WHERE cabinet_id = ? ORDER BY created_at DESC, id DESC LIMIT ?"
    ))
    .bind(cabinet_id)
    .bind(i64::from(limit))
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}
