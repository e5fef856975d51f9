use chrono::Utc;
use gabinete_schema::CabinetStatus;
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use crate::db::models::Cabinet;
use crate::db::patch::CabinetCreate;
use crate::error::GabineteError;
use crate::utils::logging::redact;

/// Inserts a cabinet. Run inside a transaction: the row is written first and the optional
/// `plan`/`status` are applied over the column defaults afterwards.
pub(crate) async fn create(
    conn: &mut SqliteConnection,
    create: CabinetCreate,
) -> Result<Cabinet, GabineteError> {
    create.validate()?;

    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO cabinets (
            id, name, owner_id,
            parliamentary_name, parliamentary_party, official_name, official_title,
            agent_access_token, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(&create.name)
    .bind(create.owner_id)
    .bind(&create.parliamentary_name)
    .bind(&create.parliamentary_party)
    .bind(&create.official_name)
    .bind(&create.official_title)
    .bind(&create.agent_access_token)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if create.plan.is_some() || create.status.is_some() {
        sqlx::query(
            r#"
            UPDATE cabinets
            SET
                plan = COALESCE(?, plan),
                status = COALESCE(?, status)
            WHERE id = ?
            "#,
        )
        .bind(create.plan)
        .bind(create.status)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    }

    let cabinet = get(conn, id).await?;
    info!(
        cabinet_id = %cabinet.id,
        plan = %cabinet.plan,
        status = %cabinet.status,
        "cabinet created"
    );
    Ok(cabinet)
}

pub(crate) async fn get(conn: &mut SqliteConnection, id: Uuid) -> Result<Cabinet, GabineteError> {
    sqlx::query_as::<_, Cabinet>(concat!(
        "SELECT ",
        cabinet_columns!(),
        " FROM cabinets WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| GabineteError::not_found("cabinet", id))
}

/// Resolves the tenant behind an agent gateway token. Archived cabinets do not authenticate.
pub(crate) async fn find_by_agent_token(
    conn: &mut SqliteConnection,
    token: &str,
) -> Result<Cabinet, GabineteError> {
    sqlx::query_as::<_, Cabinet>(concat!(
        "SELECT ",
        cabinet_columns!(),
        " FROM cabinets WHERE agent_access_token = ? AND status <> 'archived'"
    ))
    .bind(token)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| GabineteError::not_found("cabinet", format!("agent token {}", redact(token))))
}

pub(crate) async fn set_status(
    conn: &mut SqliteConnection,
    id: Uuid,
    status: CabinetStatus,
) -> Result<Cabinet, GabineteError> {
    let res = sqlx::query("UPDATE cabinets SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if res.rows_affected() == 0 {
        return Err(GabineteError::not_found("cabinet", id));
    }

    info!(cabinet_id = %id, %status, "cabinet status changed");
    get(conn, id).await
}
