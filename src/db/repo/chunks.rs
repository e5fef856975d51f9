use chrono::Utc;
use gabinete_schema::{TenantContext, ValidationError};
use serde_json::Value;
use sqlx::SqliteConnection;
use sqlx::types::Json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::models::DocumentChunk;
use crate::db::patch::DocumentChunkCreate;
use crate::db::vector::{
    ChunkEmbedding, ChunkHit, ChunkMatch, ChunkSearch, Embedding, SourceType, rank_matches,
};
use crate::error::GabineteError;

pub(crate) async fn insert(
    conn: &mut SqliteConnection,
    ctx: &TenantContext,
    create: DocumentChunkCreate,
) -> Result<DocumentChunk, GabineteError> {
    create.validate_for(ctx)?;

    let chunk = sqlx::query_as::<_, DocumentChunk>(concat!(
        r#"
        INSERT INTO document_chunks (
            id, cabinet_id, document_id, content, embedding, embedding_openai,
            metadata, source_type, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING "#,
        chunk_columns!()
    ))
    .bind(Uuid::new_v4())
    .bind(create.cabinet_id)
    .bind(create.document_id)
    .bind(create.content)
    .bind(create.embedding)
    .bind(create.embedding_openai)
    .bind(Json(create.metadata))
    .bind(create.source_type)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    debug!(
        chunk_id = %chunk.id,
        cabinet_id = %chunk.cabinet_id,
        source_type = %chunk.source_type,
        embedding_set = chunk.embedding.is_some(),
        embedding_openai_set = chunk.embedding_openai.is_some(),
        "document chunk inserted"
    );
    Ok(chunk)
}

pub(crate) async fn get(
    conn: &mut SqliteConnection,
    cabinet_id: Uuid,
    id: Uuid,
) -> Result<DocumentChunk, GabineteError> {
    sqlx::query_as::<_, DocumentChunk>(concat!(
        "SELECT ",
        chunk_columns!(),
        " FROM document_chunks WHERE id = ? AND cabinet_id = ?"
    ))
    .bind(id)
    .bind(cabinet_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| GabineteError::not_found("document_chunk", id))
}

/// Every chunk of one tenant, optionally narrowed to a single parent document, in
/// insertion order.
pub(crate) async fn list(
    conn: &mut SqliteConnection,
    cabinet_id: Uuid,
    document_id: Option<Uuid>,
) -> Result<Vec<DocumentChunk>, GabineteError> {
    let chunks = sqlx::query_as::<_, DocumentChunk>(concat!(
        "SELECT ",
        chunk_columns!(),
        " FROM document_chunks \
          WHERE cabinet_id = ? AND (? IS NULL OR document_id = ?) \
          ORDER BY created_at ASC, rowid ASC"
    ))
    .bind(cabinet_id)
    .bind(document_id)
    .bind(document_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(chunks)
}

/// Fills one embedding column of a chunk written before that model was available.
/// An already populated column is never overwritten.
pub(crate) async fn backfill_embedding(
    conn: &mut SqliteConnection,
    cabinet_id: Uuid,
    id: Uuid,
    embedding: ChunkEmbedding,
) -> Result<DocumentChunk, GabineteError> {
    let column = embedding.column();
    let query = match embedding {
        ChunkEmbedding::Gemini(vector) => sqlx::query(
            "UPDATE document_chunks SET embedding = ? \
             WHERE id = ? AND cabinet_id = ? AND embedding IS NULL",
        )
        .bind(vector),
        ChunkEmbedding::Openai(vector) => sqlx::query(
            "UPDATE document_chunks SET embedding_openai = ? \
             WHERE id = ? AND cabinet_id = ? AND embedding_openai IS NULL",
        )
        .bind(vector),
    };

    let affected = query
        .bind(id)
        .bind(cabinet_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    // Distinguish a missing chunk from one whose column is already set.
    let chunk = get(conn, cabinet_id, id).await?;
    if affected == 0 {
        return Err(GabineteError::Conflict(format!(
            "document chunk {id} already has `{column}`"
        )));
    }

    debug!(chunk_id = %id, %cabinet_id, column, "embedding backfilled");
    Ok(chunk)
}

/// Removes every chunk derived from one parent document and returns how many went.
pub(crate) async fn delete_by_document(
    conn: &mut SqliteConnection,
    cabinet_id: Uuid,
    document_id: Uuid,
) -> Result<u64, GabineteError> {
    let deleted = sqlx::query("DELETE FROM document_chunks WHERE cabinet_id = ? AND document_id = ?")
        .bind(cabinet_id)
        .bind(document_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    info!(%cabinet_id, %document_id, deleted, "document chunks deleted");
    Ok(deleted)
}

type CandidateRow = (Uuid, Option<Uuid>, String, Json<Value>, SourceType, Vec<u8>);

async fn candidates<const DIM: usize>(
    conn: &mut SqliteConnection,
    sql: &'static str,
    cabinet_id: Uuid,
    source_type: Option<&SourceType>,
) -> Result<Vec<(ChunkHit, Embedding<DIM>)>, GabineteError> {
    let source_type = source_type.map(SourceType::as_str);
    let rows: Vec<CandidateRow> = sqlx::query_as(sql)
        .bind(cabinet_id)
        .bind(source_type)
        .bind(source_type)
        .fetch_all(&mut *conn)
        .await?;

    // A row written around the typed API may hold bytes that are not a usable vector;
    // it is left out of the ranking instead of failing the whole search.
    Ok(rows
        .into_iter()
        .filter_map(|(id, document_id, content, Json(metadata), source_type, blob)| {
            let vector = match Embedding::<DIM>::from_blob(&blob) {
                Ok(vector) => vector,
                Err(e) => {
                    warn!(chunk_id = %id, %cabinet_id, error = %e, "skipping undecodable embedding");
                    return None;
                }
            };
            let hit = ChunkHit {
                id,
                document_id,
                content,
                metadata,
                source_type,
            };
            Some((hit, vector))
        })
        .collect())
}

/// Cosine nearest neighbours over one embedding column of one tenant. Rows lacking the
/// queried column are skipped.
pub(crate) async fn search(
    conn: &mut SqliteConnection,
    cabinet_id: Uuid,
    search: ChunkSearch,
) -> Result<Vec<ChunkMatch>, GabineteError> {
    if !search.match_threshold.is_finite() || !(-1.0..=1.0).contains(&search.match_threshold) {
        return Err(ValidationError::new("match_threshold", "must be within [-1, 1]").into());
    }
    if search.match_count == 0 {
        return Ok(Vec::new());
    }

    let ChunkSearch {
        query,
        match_threshold,
        match_count,
        source_type,
    } = search;

    let matches = match query {
        ChunkEmbedding::Gemini(query) => {
            let rows = candidates(
                conn,
                "SELECT id, document_id, content, metadata, source_type, embedding \
                 FROM document_chunks \
                 WHERE cabinet_id = ? AND embedding IS NOT NULL AND (? IS NULL OR source_type = ?)",
                cabinet_id,
                source_type.as_ref(),
            )
            .await?;
            rank_matches(&query, rows, match_threshold, match_count)
        }
        ChunkEmbedding::Openai(query) => {
            let rows = candidates(
                conn,
                "SELECT id, document_id, content, metadata, source_type, embedding_openai \
                 FROM document_chunks \
                 WHERE cabinet_id = ? AND embedding_openai IS NOT NULL AND (? IS NULL OR source_type = ?)",
                cabinet_id,
                source_type.as_ref(),
            )
            .await?;
            rank_matches(&query, rows, match_threshold, match_count)
        }
    };

    debug!(%cabinet_id, returned = matches.len(), match_threshold, match_count, "chunk search");
    Ok(matches)
}
