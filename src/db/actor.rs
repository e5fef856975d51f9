use crate::config::StorageConfig;
use crate::db::models::{AgentConfiguration, AgentLog, Cabinet, DocumentChunk};
use crate::db::patch::{
    AgentConfigurationUpsert, AgentLogCreate, CabinetCreate, CabinetPatch, CalendarTokens,
    DocumentChunkCreate, RecordPatch,
};
use crate::db::repo;
use crate::db::schema::SQLITE_INIT;
use crate::db::traits::DbPatchable;
use crate::db::vector::{ChunkEmbedding, ChunkMatch, ChunkSearch};
use crate::error::GabineteError;
use gabinete_schema::{
    CabinetStatus, DemandCityHallSync, DemandCreate, DemandListResponse, DemandQuery,
    DemandResponse, DemandUpdate, SyncStatus, TenantContext,
};
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

type Reply<T> = RpcReplyPort<Result<T, GabineteError>>;

#[derive(Debug)]
pub enum DbActorMessage {
    /// Insert a cabinet and return the stored row.
    CreateCabinet(CabinetCreate, Reply<Cabinet>),
    GetCabinet(Uuid, Reply<Cabinet>),
    /// Resolve the tenant that owns an agent gateway token.
    FindCabinetByAgentToken(String, Reply<Cabinet>),
    /// Apply a field-level update envelope.
    Patch(RecordPatch, Reply<()>),
    SetCabinetStatus(Uuid, CabinetStatus, Reply<Cabinet>),

    UpsertAgentConfiguration(Uuid, AgentConfigurationUpsert, Reply<AgentConfiguration>),
    GetAgentConfiguration(Uuid, Reply<AgentConfiguration>),
    AppendAgentLog(Option<TenantContext>, AgentLogCreate, Reply<AgentLog>),
    ListAgentLogs(Uuid, u32, Reply<Vec<AgentLog>>),

    CreateDemand(TenantContext, DemandCreate, Reply<DemandResponse>),
    GetDemand(Uuid, i64, Reply<DemandResponse>),
    FindDemandsByCabinet(Uuid, DemandQuery, Reply<DemandListResponse>),
    UpdateDemand(Uuid, i64, DemandUpdate, Reply<DemandResponse>),
    /// Compare-and-set on `sync_status`.
    ApplySync(Uuid, i64, SyncStatus, DemandCityHallSync, Reply<DemandResponse>),
    ListDemandsForSync(Uuid, SyncStatus, u32, Reply<Vec<DemandResponse>>),

    InsertChunk(TenantContext, DocumentChunkCreate, Reply<DocumentChunk>),
    GetChunk(Uuid, Uuid, Reply<DocumentChunk>),
    ListChunks(Uuid, Option<Uuid>, Reply<Vec<DocumentChunk>>),
    BackfillEmbedding(Uuid, Uuid, ChunkEmbedding, Reply<DocumentChunk>),
    DeleteChunksByDocument(Uuid, Uuid, Reply<u64>),
    SearchChunks(Uuid, ChunkSearch, Reply<Vec<ChunkMatch>>),

    /// Row count per table.
    TableCounts(Reply<Vec<(&'static str, i64)>>),
}

#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

impl DbActorHandle {
    pub async fn create_cabinet(&self, create: CabinetCreate) -> Result<Cabinet, GabineteError> {
        ractor::call!(self.actor, DbActorMessage::CreateCabinet, create).map_err(|e| {
            GabineteError::RactorError(format!("DbActor CreateCabinet RPC failed: {e}"))
        })?
    }

    pub async fn get_cabinet(&self, id: Uuid) -> Result<Cabinet, GabineteError> {
        ractor::call!(self.actor, DbActorMessage::GetCabinet, id).map_err(|e| {
            GabineteError::RactorError(format!("DbActor GetCabinet RPC failed: {e}"))
        })?
    }

    pub async fn find_cabinet_by_agent_token(
        &self,
        token: impl Into<String>,
    ) -> Result<Cabinet, GabineteError> {
        ractor::call!(
            self.actor,
            DbActorMessage::FindCabinetByAgentToken,
            token.into()
        )
        .map_err(|e| {
            GabineteError::RactorError(format!("DbActor FindCabinetByAgentToken RPC failed: {e}"))
        })?
    }

    /// Apply any field-level update envelope.
    pub async fn patch(&self, patch: RecordPatch) -> Result<(), GabineteError> {
        ractor::call!(self.actor, DbActorMessage::Patch, patch)
            .map_err(|e| GabineteError::RactorError(format!("DbActor Patch RPC failed: {e}")))?
    }

    pub async fn patch_cabinet(&self, id: Uuid, patch: CabinetPatch) -> Result<(), GabineteError> {
        self.patch(RecordPatch::Cabinet { id, patch }).await
    }

    pub async fn update_calendar_tokens(
        &self,
        id: Uuid,
        tokens: CalendarTokens,
    ) -> Result<(), GabineteError> {
        self.patch(RecordPatch::CalendarTokens { id, tokens }).await
    }

    pub async fn disconnect_calendar(&self, id: Uuid) -> Result<(), GabineteError> {
        self.patch(RecordPatch::DisconnectCalendar { id }).await
    }

    pub async fn set_cabinet_status(
        &self,
        id: Uuid,
        status: CabinetStatus,
    ) -> Result<Cabinet, GabineteError> {
        ractor::call!(self.actor, DbActorMessage::SetCabinetStatus, id, status).map_err(|e| {
            GabineteError::RactorError(format!("DbActor SetCabinetStatus RPC failed: {e}"))
        })?
    }

    /// Cabinets are never hard-deleted; archiving is the end of the lifecycle.
    pub async fn archive_cabinet(&self, id: Uuid) -> Result<Cabinet, GabineteError> {
        self.set_cabinet_status(id, CabinetStatus::Archived).await
    }

    pub async fn upsert_agent_configuration(
        &self,
        cabinet_id: Uuid,
        upsert: AgentConfigurationUpsert,
    ) -> Result<AgentConfiguration, GabineteError> {
        ractor::call!(
            self.actor,
            DbActorMessage::UpsertAgentConfiguration,
            cabinet_id,
            upsert
        )
        .map_err(|e| {
            GabineteError::RactorError(format!("DbActor UpsertAgentConfiguration RPC failed: {e}"))
        })?
    }

    pub async fn get_agent_configuration(
        &self,
        cabinet_id: Uuid,
    ) -> Result<AgentConfiguration, GabineteError> {
        ractor::call!(self.actor, DbActorMessage::GetAgentConfiguration, cabinet_id).map_err(
            |e| GabineteError::RactorError(format!("DbActor GetAgentConfiguration RPC failed: {e}")),
        )?
    }

    /// `ctx` is `None` only for entries not bound to a cabinet.
    pub async fn append_agent_log(
        &self,
        ctx: Option<TenantContext>,
        create: AgentLogCreate,
    ) -> Result<AgentLog, GabineteError> {
        ractor::call!(self.actor, DbActorMessage::AppendAgentLog, ctx, create).map_err(|e| {
            GabineteError::RactorError(format!("DbActor AppendAgentLog RPC failed: {e}"))
        })?
    }

    pub async fn list_agent_logs(
        &self,
        cabinet_id: Uuid,
        limit: u32,
    ) -> Result<Vec<AgentLog>, GabineteError> {
        ractor::call!(self.actor, DbActorMessage::ListAgentLogs, cabinet_id, limit).map_err(|e| {
            GabineteError::RactorError(format!("DbActor ListAgentLogs RPC failed: {e}"))
        })?
    }

    pub async fn create_demand(
        &self,
        ctx: TenantContext,
        create: DemandCreate,
    ) -> Result<DemandResponse, GabineteError> {
        ractor::call!(self.actor, DbActorMessage::CreateDemand, ctx, create).map_err(|e| {
            GabineteError::RactorError(format!("DbActor CreateDemand RPC failed: {e}"))
        })?
    }

    pub async fn get_demand(
        &self,
        cabinet_id: Uuid,
        id: i64,
    ) -> Result<DemandResponse, GabineteError> {
        ractor::call!(self.actor, DbActorMessage::GetDemand, cabinet_id, id).map_err(|e| {
            GabineteError::RactorError(format!("DbActor GetDemand RPC failed: {e}"))
        })?
    }

    pub async fn find_demands_by_cabinet(
        &self,
        cabinet_id: Uuid,
        query: DemandQuery,
    ) -> Result<DemandListResponse, GabineteError> {
        ractor::call!(
            self.actor,
            DbActorMessage::FindDemandsByCabinet,
            cabinet_id,
            query
        )
        .map_err(|e| {
            GabineteError::RactorError(format!("DbActor FindDemandsByCabinet RPC failed: {e}"))
        })?
    }

    pub async fn update_demand(
        &self,
        cabinet_id: Uuid,
        id: i64,
        patch: DemandUpdate,
    ) -> Result<DemandResponse, GabineteError> {
        ractor::call!(self.actor, DbActorMessage::UpdateDemand, cabinet_id, id, patch).map_err(
            |e| GabineteError::RactorError(format!("DbActor UpdateDemand RPC failed: {e}")),
        )?
    }

    pub async fn apply_sync(
        &self,
        cabinet_id: Uuid,
        id: i64,
        expected: SyncStatus,
        sync: DemandCityHallSync,
    ) -> Result<DemandResponse, GabineteError> {
        ractor::call!(
            self.actor,
            DbActorMessage::ApplySync,
            cabinet_id,
            id,
            expected,
            sync
        )
        .map_err(|e| GabineteError::RactorError(format!("DbActor ApplySync RPC failed: {e}")))?
    }

    pub async fn list_demands_for_sync(
        &self,
        cabinet_id: Uuid,
        status: SyncStatus,
        limit: u32,
    ) -> Result<Vec<DemandResponse>, GabineteError> {
        ractor::call!(
            self.actor,
            DbActorMessage::ListDemandsForSync,
            cabinet_id,
            status,
            limit
        )
        .map_err(|e| {
            GabineteError::RactorError(format!("DbActor ListDemandsForSync RPC failed: {e}"))
        })?
    }

    pub async fn insert_chunk(
        &self,
        ctx: TenantContext,
        create: DocumentChunkCreate,
    ) -> Result<DocumentChunk, GabineteError> {
        ractor::call!(self.actor, DbActorMessage::InsertChunk, ctx, create).map_err(|e| {
            GabineteError::RactorError(format!("DbActor InsertChunk RPC failed: {e}"))
        })?
    }

    pub async fn get_chunk(&self, cabinet_id: Uuid, id: Uuid) -> Result<DocumentChunk, GabineteError> {
        ractor::call!(self.actor, DbActorMessage::GetChunk, cabinet_id, id)
            .map_err(|e| GabineteError::RactorError(format!("DbActor GetChunk RPC failed: {e}")))?
    }

    pub async fn list_chunks(
        &self,
        cabinet_id: Uuid,
        document_id: Option<Uuid>,
    ) -> Result<Vec<DocumentChunk>, GabineteError> {
        ractor::call!(self.actor, DbActorMessage::ListChunks, cabinet_id, document_id)
            .map_err(|e| GabineteError::RactorError(format!("DbActor ListChunks RPC failed: {e}")))?
    }

    pub async fn backfill_embedding(
        &self,
        cabinet_id: Uuid,
        id: Uuid,
        embedding: ChunkEmbedding,
    ) -> Result<DocumentChunk, GabineteError> {
        ractor::call!(
            self.actor,
            DbActorMessage::BackfillEmbedding,
            cabinet_id,
            id,
            embedding
        )
        .map_err(|e| {
            GabineteError::RactorError(format!("DbActor BackfillEmbedding RPC failed: {e}"))
        })?
    }

    pub async fn delete_chunks_by_document(
        &self,
        cabinet_id: Uuid,
        document_id: Uuid,
    ) -> Result<u64, GabineteError> {
        ractor::call!(
            self.actor,
            DbActorMessage::DeleteChunksByDocument,
            cabinet_id,
            document_id
        )
        .map_err(|e| {
            GabineteError::RactorError(format!("DbActor DeleteChunksByDocument RPC failed: {e}"))
        })?
    }

    pub async fn search_chunks(
        &self,
        cabinet_id: Uuid,
        search: ChunkSearch,
    ) -> Result<Vec<ChunkMatch>, GabineteError> {
        ractor::call!(self.actor, DbActorMessage::SearchChunks, cabinet_id, search).map_err(|e| {
            GabineteError::RactorError(format!("DbActor SearchChunks RPC failed: {e}"))
        })?
    }

    pub async fn table_counts(&self) -> Result<Vec<(&'static str, i64)>, GabineteError> {
        ractor::call!(self.actor, DbActorMessage::TableCounts).map_err(|e| {
            GabineteError::RactorError(format!("DbActor TableCounts RPC failed: {e}"))
        })?
    }
}

struct DbActorState {
    pool: SqlitePool,
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = DbActorState;
    type Arguments = (String, StorageConfig);

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let (database_url, storage) = args;
        let connect_opts = SqliteConnectOptions::from_str(database_url.as_str())
            .map_err(|e| ActorProcessingErr::from(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .busy_timeout(storage.busy_timeout())
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(storage.max_connections)
            .connect_with(connect_opts)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        apply_schema(&pool)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db schema init failed: {e}")))?;

        info!(max_connections = storage.max_connections, "DbActor initialized");
        Ok(DbActorState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let pool = &state.pool;
        match message {
            DbActorMessage::CreateCabinet(create, reply) => {
                let res = self.create_cabinet(pool, create).await;
                let _ = reply.send(res);
            }
            DbActorMessage::GetCabinet(id, reply) => {
                let res = self.get_cabinet(pool, id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::FindCabinetByAgentToken(token, reply) => {
                let res = self.find_cabinet_by_agent_token(pool, &token).await;
                let _ = reply.send(res);
            }
            DbActorMessage::Patch(patch, reply) => {
                let res = self.apply_patch(pool, &patch).await;
                let _ = reply.send(res);
            }
            DbActorMessage::SetCabinetStatus(id, status, reply) => {
                let res = self.set_cabinet_status(pool, id, status).await;
                let _ = reply.send(res);
            }
            DbActorMessage::UpsertAgentConfiguration(cabinet_id, upsert, reply) => {
                let res = self.upsert_agent_configuration(pool, cabinet_id, upsert).await;
                let _ = reply.send(res);
            }
            DbActorMessage::GetAgentConfiguration(cabinet_id, reply) => {
                let res = self.get_agent_configuration(pool, cabinet_id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::AppendAgentLog(ctx, create, reply) => {
                let res = self.append_agent_log(pool, ctx, create).await;
                let _ = reply.send(res);
            }
            DbActorMessage::ListAgentLogs(cabinet_id, limit, reply) => {
                let res = self.list_agent_logs(pool, cabinet_id, limit).await;
                let _ = reply.send(res);
            }
            DbActorMessage::CreateDemand(ctx, create, reply) => {
                let res = self.create_demand(pool, ctx, create).await;
                let _ = reply.send(res);
            }
            DbActorMessage::GetDemand(cabinet_id, id, reply) => {
                let res = self.get_demand(pool, cabinet_id, id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::FindDemandsByCabinet(cabinet_id, query, reply) => {
                let res = self.find_demands_by_cabinet(pool, cabinet_id, query).await;
                let _ = reply.send(res);
            }
            DbActorMessage::UpdateDemand(cabinet_id, id, patch, reply) => {
                let res = self.update_demand(pool, cabinet_id, id, patch).await;
                let _ = reply.send(res);
            }
            DbActorMessage::ApplySync(cabinet_id, id, expected, sync, reply) => {
                let res = self.apply_sync(pool, cabinet_id, id, expected, sync).await;
                let _ = reply.send(res);
            }
            DbActorMessage::ListDemandsForSync(cabinet_id, status, limit, reply) => {
                let res = self
                    .list_demands_for_sync(pool, cabinet_id, status, limit)
                    .await;
                let _ = reply.send(res);
            }
            DbActorMessage::InsertChunk(ctx, create, reply) => {
                let res = self.insert_chunk(pool, ctx, create).await;
                let _ = reply.send(res);
            }
            DbActorMessage::GetChunk(cabinet_id, id, reply) => {
                let res = self.get_chunk(pool, cabinet_id, id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::ListChunks(cabinet_id, document_id, reply) => {
                let res = self.list_chunks(pool, cabinet_id, document_id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::BackfillEmbedding(cabinet_id, id, embedding, reply) => {
                let res = self.backfill_embedding(pool, cabinet_id, id, embedding).await;
                let _ = reply.send(res);
            }
            DbActorMessage::DeleteChunksByDocument(cabinet_id, document_id, reply) => {
                let res = self
                    .delete_chunks_by_document(pool, cabinet_id, document_id)
                    .await;
                let _ = reply.send(res);
            }
            DbActorMessage::SearchChunks(cabinet_id, search, reply) => {
                let res = self.search_chunks(pool, cabinet_id, search).await;
                let _ = reply.send(res);
            }
            DbActorMessage::TableCounts(reply) => {
                let res = self.table_counts(pool).await;
                let _ = reply.send(res);
            }
        }
        Ok(())
    }
}

impl DbActor {
    async fn create_cabinet(
        &self,
        pool: &SqlitePool,
        create: CabinetCreate,
    ) -> Result<Cabinet, GabineteError> {
        let mut tx = pool.begin().await?;
        let cabinet = repo::cabinets::create(&mut tx, create).await?;
        tx.commit().await?;
        Ok(cabinet)
    }

    async fn get_cabinet(&self, pool: &SqlitePool, id: Uuid) -> Result<Cabinet, GabineteError> {
        let mut conn = pool.acquire().await?;
        repo::cabinets::get(&mut conn, id).await
    }

    async fn find_cabinet_by_agent_token(
        &self,
        pool: &SqlitePool,
        token: &str,
    ) -> Result<Cabinet, GabineteError> {
        let mut conn = pool.acquire().await?;
        repo::cabinets::find_by_agent_token(&mut conn, token).await
    }

    async fn apply_patch(&self, pool: &SqlitePool, patch: &RecordPatch) -> Result<(), GabineteError> {
        let mut conn = pool.acquire().await?;
        patch.apply_patch(&mut conn).await
    }

    async fn set_cabinet_status(
        &self,
        pool: &SqlitePool,
        id: Uuid,
        status: CabinetStatus,
    ) -> Result<Cabinet, GabineteError> {
        let mut tx = pool.begin().await?;
        let cabinet = repo::cabinets::set_status(&mut tx, id, status).await?;
        tx.commit().await?;
        Ok(cabinet)
    }

    async fn upsert_agent_configuration(
        &self,
        pool: &SqlitePool,
        cabinet_id: Uuid,
        upsert: AgentConfigurationUpsert,
    ) -> Result<AgentConfiguration, GabineteError> {
        let mut tx = pool.begin().await?;
        let config = repo::agents::upsert_configuration(&mut tx, cabinet_id, upsert).await?;
        tx.commit().await?;
        Ok(config)
    }

    async fn get_agent_configuration(
        &self,
        pool: &SqlitePool,
        cabinet_id: Uuid,
    ) -> Result<AgentConfiguration, GabineteError> {
        let mut conn = pool.acquire().await?;
        repo::agents::get_configuration(&mut conn, cabinet_id).await
    }

    async fn append_agent_log(
        &self,
        pool: &SqlitePool,
        ctx: Option<TenantContext>,
        create: AgentLogCreate,
    ) -> Result<AgentLog, GabineteError> {
        let mut conn = pool.acquire().await?;
        repo::agents::append_log(&mut conn, ctx.as_ref(), create).await
    }

    async fn list_agent_logs(
        &self,
        pool: &SqlitePool,
        cabinet_id: Uuid,
        limit: u32,
    ) -> Result<Vec<AgentLog>, GabineteError> {
        let mut conn = pool.acquire().await?;
        repo::agents::list_logs(&mut conn, cabinet_id, limit).await
    }

    async fn create_demand(
        &self,
        pool: &SqlitePool,
        ctx: TenantContext,
        create: DemandCreate,
    ) -> Result<DemandResponse, GabineteError> {
        let mut conn = pool.acquire().await?;
        repo::demands::create(&mut conn, &ctx, create).await
    }

    async fn get_demand(
        &self,
        pool: &SqlitePool,
        cabinet_id: Uuid,
        id: i64,
    ) -> Result<DemandResponse, GabineteError> {
        let mut conn = pool.acquire().await?;
        repo::demands::get(&mut conn, cabinet_id, id).await
    }

    async fn find_demands_by_cabinet(
        &self,
        pool: &SqlitePool,
        cabinet_id: Uuid,
        query: DemandQuery,
    ) -> Result<DemandListResponse, GabineteError> {
        let mut tx = pool.begin().await?;
        let page = repo::demands::list(&mut tx, cabinet_id, &query).await?;
        tx.commit().await?;
        Ok(page)
    }

    async fn update_demand(
        &self,
        pool: &SqlitePool,
        cabinet_id: Uuid,
        id: i64,
        patch: DemandUpdate,
    ) -> Result<DemandResponse, GabineteError> {
        let mut tx = pool.begin().await?;
        let demand = repo::demands::update(&mut tx, cabinet_id, id, patch).await?;
        tx.commit().await?;
        Ok(demand)
    }

    async fn apply_sync(
        &self,
        pool: &SqlitePool,
        cabinet_id: Uuid,
        id: i64,
        expected: SyncStatus,
        sync: DemandCityHallSync,
    ) -> Result<DemandResponse, GabineteError> {
        let mut tx = pool.begin().await?;
        let demand = repo::demands::apply_sync(&mut tx, cabinet_id, id, expected, sync).await?;
        tx.commit().await?;
        Ok(demand)
    }

    async fn list_demands_for_sync(
        &self,
        pool: &SqlitePool,
        cabinet_id: Uuid,
        status: SyncStatus,
        limit: u32,
    ) -> Result<Vec<DemandResponse>, GabineteError> {
        let mut conn = pool.acquire().await?;
        repo::demands::list_for_sync(&mut conn, cabinet_id, status, limit).await
    }

    async fn insert_chunk(
        &self,
        pool: &SqlitePool,
        ctx: TenantContext,
        create: DocumentChunkCreate,
    ) -> Result<DocumentChunk, GabineteError> {
        let mut conn = pool.acquire().await?;
        repo::chunks::insert(&mut conn, &ctx, create).await
    }

    async fn get_chunk(
        &self,
        pool: &SqlitePool,
        cabinet_id: Uuid,
        id: Uuid,
    ) -> Result<DocumentChunk, GabineteError> {
        let mut conn = pool.acquire().await?;
        repo::chunks::get(&mut conn, cabinet_id, id).await
    }

    async fn list_chunks(
        &self,
        pool: &SqlitePool,
        cabinet_id: Uuid,
        document_id: Option<Uuid>,
    ) -> Result<Vec<DocumentChunk>, GabineteError> {
        let mut conn = pool.acquire().await?;
        repo::chunks::list(&mut conn, cabinet_id, document_id).await
    }

    async fn backfill_embedding(
        &self,
        pool: &SqlitePool,
        cabinet_id: Uuid,
        id: Uuid,
        embedding: ChunkEmbedding,
    ) -> Result<DocumentChunk, GabineteError> {
        let mut tx = pool.begin().await?;
        let chunk = repo::chunks::backfill_embedding(&mut tx, cabinet_id, id, embedding).await?;
        tx.commit().await?;
        Ok(chunk)
    }

    async fn delete_chunks_by_document(
        &self,
        pool: &SqlitePool,
        cabinet_id: Uuid,
        document_id: Uuid,
    ) -> Result<u64, GabineteError> {
        let mut conn = pool.acquire().await?;
        repo::chunks::delete_by_document(&mut conn, cabinet_id, document_id).await
    }

    async fn search_chunks(
        &self,
        pool: &SqlitePool,
        cabinet_id: Uuid,
        search: ChunkSearch,
    ) -> Result<Vec<ChunkMatch>, GabineteError> {
        let mut conn = pool.acquire().await?;
        repo::chunks::search(&mut conn, cabinet_id, search).await
    }

    async fn table_counts(
        &self,
        pool: &SqlitePool,
    ) -> Result<Vec<(&'static str, i64)>, GabineteError> {
        let mut conn = pool.acquire().await?;
        repo::table_counts(&mut conn).await
    }
}

/// Spawn the database actor with default pool settings and return a cloneable handle.
pub async fn spawn(database_url: &str) -> Result<DbActorHandle, GabineteError> {
    spawn_with_options(database_url, &StorageConfig::default()).await
}

/// Spawn the database actor. The actor is unnamed so several databases can be open in one
/// process.
pub async fn spawn_with_options(
    database_url: &str,
    storage: &StorageConfig,
) -> Result<DbActorHandle, GabineteError> {
    let (actor, _jh) = ractor::Actor::spawn(
        None,
        DbActor,
        (database_url.to_string(), storage.clone()),
    )
    .await
    .map_err(|e| GabineteError::RactorError(format!("failed to spawn DbActor: {e}")))?;

    Ok(DbActorHandle { actor })
}

/// The DDL carries a trigger body, so it runs as one multi-statement script.
async fn apply_schema(pool: &SqlitePool) -> Result<(), GabineteError> {
    sqlx::raw_sql(SQLITE_INIT).execute(pool).await?;
    info!("database schema applied");
    Ok(())
}
