//! Database module: models, schema and the actor that owns the pool.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `patch.rs`: create/update payloads and the `RecordPatch` envelope
//! - `vector.rs`: fixed-dimension embeddings and similarity search types
//! - `repo/`: per-table SQL, called from the actor

pub mod actor;
pub mod models;
pub mod patch;
pub mod schema;
pub mod traits;
pub mod vector;

mod patch_impl;
mod repo;

pub use models::{AgentConfiguration, AgentLog, Cabinet, DbDemand, DocumentChunk};
pub use patch::{
    AgentConfigurationUpsert, AgentLogCreate, CabinetCreate, CabinetPatch, CalendarTokens,
    DocumentChunkCreate, RecordPatch,
};
pub use schema::SQLITE_INIT;
pub use vector::{
    ChunkEmbedding, ChunkMatch, ChunkSearch, Embedding, EmbeddingError, GEMINI_EMBEDDING_DIM,
    GeminiEmbedding, OPENAI_EMBEDDING_DIM, OpenAiEmbedding, SourceType,
};

pub use actor::{DbActorHandle, spawn, spawn_with_options};
