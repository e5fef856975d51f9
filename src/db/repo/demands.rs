use chrono::Utc;
use gabinete_schema::{
    DemandCityHallSync, DemandCreate, DemandListResponse, DemandQuery, DemandResponse,
    DemandUpdate, SyncStatus, TenantContext,
};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::models::DbDemand;
use crate::db::patch::RecordPatch;
use crate::db::traits::DbPatchable;
use crate::error::GabineteError;

pub(crate) async fn create(
    conn: &mut SqliteConnection,
    ctx: &TenantContext,
    create: DemandCreate,
) -> Result<DemandResponse, GabineteError> {
    create.validate_for(ctx)?;

    let now = Utc::now();
    let f = create.fields;

    let row = sqlx::query_as::<_, DbDemand>(concat!(
        r#"
        INSERT INTO demands (
            cabinet_id, title, description, beneficiary, author, category,
            status, priority, obs, assigned_to, created_by, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING "#,
        demand_columns!()
    ))
    .bind(create.cabinet_id)
    .bind(f.title)
    .bind(f.description)
    .bind(f.beneficiary)
    .bind(f.author)
    .bind(f.category)
    .bind(f.status)
    .bind(f.priority)
    .bind(f.obs)
    .bind(f.assigned_to)
    .bind(ctx.user_id)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    info!(demand_id = row.id, cabinet_id = %row.cabinet_id, "demand created");
    Ok(row.into())
}

pub(crate) async fn get(
    conn: &mut SqliteConnection,
    cabinet_id: Uuid,
    id: i64,
) -> Result<DemandResponse, GabineteError> {
    fetch(conn, cabinet_id, id)
        .await?
        .map(DemandResponse::from)
        .ok_or_else(|| GabineteError::not_found("demand", id))
}

async fn fetch(
    conn: &mut SqliteConnection,
    cabinet_id: Uuid,
    id: i64,
) -> Result<Option<DbDemand>, GabineteError> {
    let row = sqlx::query_as::<_, DbDemand>(concat!(
        "SELECT ",
        demand_columns!(),
        " FROM demands WHERE id = ? AND cabinet_id = ?"
    ))
    .bind(id)
    .bind(cabinet_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, cabinet_id: Uuid, query: &'a DemandQuery) {
    qb.push(" WHERE cabinet_id = ").push_bind(cabinet_id);
    if let Some(status) = &query.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(priority) = &query.priority {
        qb.push(" AND priority = ").push_bind(priority.as_str());
    }
    if let Some(sync_status) = query.sync_status {
        qb.push(" AND sync_status = ").push_bind(sync_status);
    }
}

/// One page of a tenant's demands, newest first. Count and page are read in the same
/// transaction so `total` matches the rows paged over.
pub(crate) async fn list(
    conn: &mut SqliteConnection,
    cabinet_id: Uuid,
    query: &DemandQuery,
) -> Result<DemandListResponse, GabineteError> {
    query.validate()?;

    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM demands");
    push_filters(&mut count_qb, cabinet_id, query);
    let total: i64 = count_qb
        .build_query_scalar::<i64>()
        .fetch_one(&mut *conn)
        .await?;

    let mut page_qb =
        QueryBuilder::<Sqlite>::new(concat!("SELECT ", demand_columns!(), " FROM demands"));
    push_filters(&mut page_qb, cabinet_id, query);
    page_qb
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(i64::from(query.per_page))
        .push(" OFFSET ")
        .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));
    let rows: Vec<DbDemand> = page_qb.build_query_as::<DbDemand>().fetch_all(&mut *conn).await?;

    Ok(DemandListResponse {
        items: rows.into_iter().map(DemandResponse::from).collect(),
        total: u64::try_from(total).unwrap_or_default(),
        page: query.page,
        per_page: query.per_page,
    })
}

/// Field-level update; fields the caller did not send are left as stored.
pub(crate) async fn update(
    conn: &mut SqliteConnection,
    cabinet_id: Uuid,
    id: i64,
    patch: DemandUpdate,
) -> Result<DemandResponse, GabineteError> {
    if patch.is_empty() {
        return get(conn, cabinet_id, id).await;
    }

    RecordPatch::Demand {
        cabinet_id,
        id,
        patch,
    }
    .apply_patch(&mut *conn)
    .await?;

    get(conn, cabinet_id, id).await
}

/// Moves the sync sub-state from `expected` to `sync.sync_status`. The write only lands if
/// the stored state still equals `expected`; a concurrent writer turns this into `Conflict`.
pub(crate) async fn apply_sync(
    conn: &mut SqliteConnection,
    cabinet_id: Uuid,
    id: i64,
    expected: SyncStatus,
    sync: DemandCityHallSync,
) -> Result<DemandResponse, GabineteError> {
    sync.validate()?;

    let next = sync.sync_status;
    if !expected.can_transition_to(next) {
        warn!(demand_id = id, %cabinet_id, from = %expected, to = %next, "sync transition rejected");
        return Err(GabineteError::Conflict(format!(
            "illegal sync transition {expected} -> {next}"
        )));
    }

    let res = sqlx::query(
        r#"
        UPDATE demands
        SET
            sync_status = ?,
            external_id = COALESCE(?, external_id),
            last_sync_error = ?,
            updated_at = ?
        WHERE id = ? AND cabinet_id = ? AND sync_status = ?
        "#,
    )
    .bind(next)
    .bind(sync.external_id)
    .bind(sync.last_sync_error)
    .bind(Utc::now())
    .bind(id)
    .bind(cabinet_id)
    .bind(expected)
    .execute(&mut *conn)
    .await?;

    if res.rows_affected() == 0 {
        return match fetch(conn, cabinet_id, id).await? {
            None => Err(GabineteError::not_found("demand", id)),
            Some(current) => {
                warn!(
                    demand_id = id,
                    %cabinet_id,
                    expected = %expected,
                    actual = %current.sync_status,
                    "stale sync write"
                );
                Err(GabineteError::Conflict(format!(
                    "demand {id} sync_status is {}, expected {expected}",
                    current.sync_status
                )))
            }
        };
    }

    info!(demand_id = id, %cabinet_id, from = %expected, to = %next, "sync transition applied");
    get(conn, cabinet_id, id).await
}

/// Oldest first, so the sync worker drains in arrival order.
pub(crate) async fn list_for_sync(
    conn: &mut SqliteConnection,
    cabinet_id: Uuid,
    status: SyncStatus,
    limit: u32,
) -> Result<Vec<DemandResponse>, GabineteError> {
    let rows = sqlx::query_as::<_, DbDemand>(concat!(
        "SELECT ",
        demand_columns!(),
        " FROM demands WHERE cabinet_id = ? AND sync_status = ? ORDER BY created_at ASC, id ASC LIMIT ?"
    ))
    .bind(cabinet_id)
    .bind(status)
    .bind(i64::from(limit))
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(DemandResponse::from).collect())
}
