//! SQL DDL for initializing the database schema.
//! SQLite-first; table, column and constraint names match the Postgres deployment.
//!
//! Storage mapping:
//! - UUIDs are 16-byte BLOBs, generated by the engine (`randomblob(16)`) when a write omits them
//! - timestamps are RFC3339 TEXT (`strftime('%Y-%m-%dT%H:%M:%fZ', 'now')`)
//! - JSON columns are TEXT
//! - embeddings are little-endian f32 BLOBs with a byte-length CHECK per column

/// SQLite schema includes:
/// - `cabinets` (tenant root, plan/status checks, unique `agent_access_token`)
/// - `agent_configurations` (one row per cabinet)
/// - `agent_logs` (append-only; field updates are aborted by trigger)
/// - `demands` (integer id, CityHall sync sub-state checks)
/// - `document_chunks` (768/1536-dim embeddings, free-form `metadata`)
pub const SQLITE_INIT: &str = r#"
-- ---------------------------------------------------------------------------
-- Tenant root
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS cabinets (
    id BLOB PRIMARY KEY NOT NULL DEFAULT (randomblob(16)),
    name TEXT NOT NULL,
    plan TEXT NOT NULL DEFAULT 'free',
    status TEXT NOT NULL DEFAULT 'active',
    owner_id BLOB NULL,
    parliamentary_name TEXT NULL,
    parliamentary_party TEXT NULL,
    parliamentary_photo TEXT NULL,
    official_name TEXT NULL,
    official_title TEXT NULL,
    header_url TEXT NULL,
    footer_url TEXT NULL,
    use_letterhead INTEGER NOT NULL DEFAULT 0,
    plan_tier TEXT NOT NULL DEFAULT 'basic',
    mrr_value REAL NOT NULL DEFAULT 0.0,
    payment_method TEXT NULL,
    next_payment TEXT NULL, -- YYYY-MM-DD
    gemini_api_key TEXT NULL,
    openai_api_key TEXT NULL,
    agent_access_token TEXT NULL UNIQUE,
    google_access_token TEXT NULL,
    google_refresh_token TEXT NULL,
    google_token_expires_at INTEGER NULL, -- epoch millis
    google_calendar_id TEXT NOT NULL DEFAULT 'primary',
    google_email TEXT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    CONSTRAINT cabinets_plan_check CHECK (plan IN ('free', 'pro', 'enterprise')),
    CONSTRAINT cabinets_status_check CHECK (status IN ('active', 'trial', 'suspended', 'archived'))
);

CREATE INDEX IF NOT EXISTS idx_cabinets_status ON cabinets(status);

-- ---------------------------------------------------------------------------
-- Agent configuration (exactly one per cabinet)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS agent_configurations (
    id BLOB PRIMARY KEY NOT NULL DEFAULT (randomblob(16)),
    cabinet_id BLOB NOT NULL UNIQUE REFERENCES cabinets(id) ON DELETE CASCADE,
    agent_name TEXT NOT NULL DEFAULT 'Assistente Virtual',
    tone TEXT NOT NULL DEFAULT 'Empático e Acolhedor',
    welcome_message TEXT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    system_prompt TEXT NOT NULL DEFAULT 'Você é um assistente virtual do gabinete do Vereador {{politician_name}}. Seu tom é {{tone}}. Hoje é {{current_date}}. Responda de forma curta e objetiva. Se não souber, diga que vai verificar com a equipe.',
    copilot_system_prompt TEXT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

-- ---------------------------------------------------------------------------
-- Agent / integration audit log (append-only)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS agent_logs (
    id BLOB PRIMARY KEY NOT NULL DEFAULT (randomblob(16)),
    cabinet_id BLOB NULL REFERENCES cabinets(id) ON DELETE SET NULL,
    agent_name TEXT NOT NULL,
    action TEXT NOT NULL,
    status TEXT NOT NULL,
    payload TEXT NOT NULL DEFAULT '{}',
    response_summary TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_agent_logs_cabinet_created ON agent_logs(cabinet_id, created_at);

-- `cabinet_id` stays writable so ON DELETE SET NULL keeps working.
CREATE TRIGGER IF NOT EXISTS agent_logs_append_only
BEFORE UPDATE OF agent_name, action, status, payload, response_summary, created_at ON agent_logs
BEGIN
    SELECT RAISE(ABORT, 'agent_logs is append-only');
END;

-- ---------------------------------------------------------------------------
-- Citizen demands (sequential id, CityHall sync sub-state)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS demands (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    cabinet_id BLOB NOT NULL REFERENCES cabinets(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    description TEXT NULL,
    beneficiary TEXT NULL,
    author TEXT NULL,
    category TEXT NULL,
    status TEXT NOT NULL DEFAULT 'Pendente',
    priority TEXT NOT NULL DEFAULT 'Média',
    obs TEXT NULL,
    assigned_to TEXT NULL,
    external_id TEXT NULL,
    sync_status TEXT NOT NULL DEFAULT 'pending',
    last_sync_error TEXT NULL,
    created_by BLOB NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    CONSTRAINT demands_sync_status_check CHECK (sync_status IN ('pending', 'synced', 'error')),
    CONSTRAINT demands_sync_error_check CHECK ((sync_status = 'error') = (last_sync_error IS NOT NULL)),
    CONSTRAINT demands_synced_external_id_check CHECK (sync_status <> 'synced' OR external_id IS NOT NULL)
);

CREATE INDEX IF NOT EXISTS idx_demands_cabinet_created ON demands(cabinet_id, created_at);
CREATE INDEX IF NOT EXISTS idx_demands_cabinet_sync ON demands(cabinet_id, sync_status);

-- ---------------------------------------------------------------------------
-- Knowledge chunks with dual embeddings
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS document_chunks (
    id BLOB PRIMARY KEY NOT NULL DEFAULT (randomblob(16)),
    cabinet_id BLOB NOT NULL REFERENCES cabinets(id) ON DELETE CASCADE,
    document_id BLOB NULL,
    content TEXT NOT NULL,
    embedding BLOB NULL, -- 768 x f32
    embedding_openai BLOB NULL, -- 1536 x f32
    metadata TEXT NOT NULL DEFAULT '{}',
    source_type TEXT NOT NULL DEFAULT 'upload',
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    CONSTRAINT document_chunks_embedding_dim_check CHECK (embedding IS NULL OR length(embedding) = 3072),
    CONSTRAINT document_chunks_embedding_openai_dim_check CHECK (embedding_openai IS NULL OR length(embedding_openai) = 6144)
);

CREATE INDEX IF NOT EXISTS idx_document_chunks_cabinet ON document_chunks(cabinet_id);
CREATE INDEX IF NOT EXISTS idx_document_chunks_document ON document_chunks(cabinet_id, document_id);
"#;
