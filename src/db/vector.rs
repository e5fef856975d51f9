//! Fixed-width embedding vectors and chunk similarity search.
//!
//! Embeddings travel as little-endian f32 BLOBs; the dimension is part of the Rust type, so a
//! partial vector cannot be constructed, bound, or decoded.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{Sqlite, SqliteTypeInfo, SqliteValueRef};
use sqlx::{Decode, Encode, Type};
use std::fmt;
use thiserror::Error as ThisError;
use uuid::Uuid;

pub const GEMINI_EMBEDDING_DIM: usize = 768;
pub const OPENAI_EMBEDDING_DIM: usize = 1536;

/// Primary embedding model (`document_chunks.embedding`).
pub type GeminiEmbedding = Embedding<GEMINI_EMBEDDING_DIM>;
/// Alternate embedding model (`document_chunks.embedding_openai`).
pub type OpenAiEmbedding = Embedding<OPENAI_EMBEDDING_DIM>;

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum EmbeddingError {
    #[error("embedding must have exactly {expected} dimensions, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("embedding contains non-finite values")]
    NonFinite,

    #[error("embedding blob must be {expected} bytes, got {actual}")]
    BlobLength { expected: usize, actual: usize },
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Embedding<const DIM: usize>(Vec<f32>);

impl<const DIM: usize> Embedding<DIM> {
    pub const BLOB_LEN: usize = DIM * std::mem::size_of::<f32>();

    pub fn new(values: Vec<f32>) -> Result<Self, EmbeddingError> {
        if values.len() != DIM {
            return Err(EmbeddingError::Dimension {
                expected: DIM,
                actual: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(EmbeddingError::NonFinite);
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn to_blob(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::BLOB_LEN);
        for &value in &self.0 {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    pub fn from_blob(blob: &[u8]) -> Result<Self, EmbeddingError> {
        if blob.len() != Self::BLOB_LEN {
            return Err(EmbeddingError::BlobLength {
                expected: Self::BLOB_LEN,
                actual: blob.len(),
            });
        }
        let values = blob
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Self::new(values)
    }

    /// Cosine similarity in `[-1, 1]`; `None` when either vector has zero norm.
    pub fn cosine_similarity(&self, other: &Self) -> Option<f64> {
        cosine_similarity(&self.0, &other.0)
    }
}

impl<const DIM: usize> TryFrom<Vec<f32>> for Embedding<DIM> {
    type Error = EmbeddingError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl<const DIM: usize> From<Embedding<DIM>> for Vec<f32> {
    fn from(e: Embedding<DIM>) -> Self {
        e.0
    }
}

// 1536 floats in a debug dump is noise.
impl<const DIM: usize> fmt::Debug for Embedding<DIM> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Embedding<{}>[", DIM)?;
        for (i, v) in self.0.iter().take(3).enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}")?;
        }
        f.write_str(", ..]")
    }
}

impl<const DIM: usize> Type<Sqlite> for Embedding<DIM> {
    fn type_info() -> SqliteTypeInfo {
        <Vec<u8> as Type<Sqlite>>::type_info()
    }

    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <Vec<u8> as Type<Sqlite>>::compatible(ty)
    }
}

impl<'q, const DIM: usize> Encode<'q, Sqlite> for Embedding<DIM> {
    fn encode_by_ref(
        &self,
        buf: &mut <Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, BoxDynError> {
        <Vec<u8> as Encode<'q, Sqlite>>::encode(self.to_blob(), buf)
    }
}

impl<'r, const DIM: usize> Decode<'r, Sqlite> for Embedding<DIM> {
    fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
        let blob = <&'r [u8] as Decode<'r, Sqlite>>::decode(value)?;
        Ok(Self::from_blob(blob)?)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x64 = f64::from(x);
        let y64 = f64::from(y);
        dot += x64 * y64;
        norm_a += x64 * x64;
        norm_b += y64 * y64;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return None;
    }
    Some(dot / denom)
}

/// Ingestion origin. Open set: new pipelines add values without a schema change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct SourceType(String);

impl SourceType {
    pub const UPLOAD: &'static str = "upload";
    pub const N8N_LEGACY: &'static str = "n8n_legacy";
    pub const SCRAPED_LAW: &'static str = "scraped_law";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn upload() -> Self {
        Self::new(Self::UPLOAD)
    }

    pub fn n8n_legacy() -> Self {
        Self::new(Self::N8N_LEGACY)
    }

    pub fn scraped_law() -> Self {
        Self::new(Self::SCRAPED_LAW)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SourceType {
    fn default() -> Self {
        Self::upload()
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An embedding tagged with its model; the variant selects the column it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", content = "vector", rename_all = "snake_case")]
pub enum ChunkEmbedding {
    Gemini(GeminiEmbedding),
    Openai(OpenAiEmbedding),
}

impl ChunkEmbedding {
    pub fn column(&self) -> &'static str {
        match self {
            ChunkEmbedding::Gemini(_) => "embedding",
            ChunkEmbedding::Openai(_) => "embedding_openai",
        }
    }
}

/// Nearest-neighbour request over one embedding column of one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkSearch {
    pub query: ChunkEmbedding,
    /// Minimum cosine similarity for a chunk to be returned.
    pub match_threshold: f64,
    /// Top-k.
    pub match_count: usize,
    #[serde(default)]
    pub source_type: Option<SourceType>,
}

impl ChunkSearch {
    pub fn new(query: ChunkEmbedding, match_threshold: f64, match_count: usize) -> Self {
        Self {
            query,
            match_threshold,
            match_count,
            source_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMatch {
    pub id: Uuid,
    pub document_id: Option<Uuid>,
    pub content: String,
    pub metadata: Value,
    pub source_type: SourceType,
    pub similarity: f64,
    /// Cosine distance, `1 - similarity`.
    pub distance: f64,
}

/// Scores candidates, drops those under the threshold, and keeps the best `match_count`
/// (similarity descending, ties by id).
pub(crate) fn rank_matches<const DIM: usize>(
    query: &Embedding<DIM>,
    candidates: Vec<(ChunkHit, Embedding<DIM>)>,
    match_threshold: f64,
    match_count: usize,
) -> Vec<ChunkMatch> {
    let mut hits: Vec<ChunkMatch> = candidates
        .into_iter()
        .filter_map(|(hit, vector)| {
            let similarity = query.cosine_similarity(&vector)?;
            (similarity >= match_threshold).then(|| ChunkMatch {
                id: hit.id,
                document_id: hit.document_id,
                content: hit.content,
                metadata: hit.metadata,
                source_type: hit.source_type,
                similarity,
                distance: 1.0 - similarity,
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(match_count);
    hits
}

/// Non-vector columns of a search candidate.
pub(crate) struct ChunkHit {
    pub id: Uuid,
    pub document_id: Option<Uuid>,
    pub content: String,
    pub metadata: Value,
    pub source_type: SourceType,
}

#[cfg(test)]
pub(crate) fn unit_vector<const DIM: usize>(axis: usize) -> Embedding<DIM> {
    let mut v = vec![0.0f32; DIM];
    v[axis] = 1.0;
    Embedding::new(v).expect("unit vector")
}
