//! Database schema definitions and migrations.

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Full DDL for the MoneyClaw state database.
pub const CREATE_SCHEMA: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

-- One row, written once at init, never updated.
CREATE TABLE IF NOT EXISTS identity (
    wallet_address  TEXT PRIMARY KEY,
    creator_address TEXT NOT NULL,
    genesis_prompt  TEXT NOT NULL,
    created_at      TEXT NOT NULL DEFAULT (datetime('now'))
);

-- At most one row with ended_at IS NULL.
CREATE TABLE IF NOT EXISTS sessions (
    id         TEXT PRIMARY KEY,
    started_at TEXT NOT NULL DEFAULT (datetime('now')),
    ended_at   TEXT
);

-- Key-value store for runtime state (current_tier, active_model, etc.)
CREATE TABLE IF NOT EXISTS kv (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Agent turns (inference + tool execution history)
CREATE TABLE IF NOT EXISTS turns (
    id                 TEXT PRIMARY KEY,
    session_id         TEXT NOT NULL REFERENCES sessions(id),
    turn_number        INTEGER NOT NULL,
    tier_at_decision   TEXT NOT NULL,
    model_id           TEXT NOT NULL,
    prompt_tokens      INTEGER NOT NULL DEFAULT 0,
    completion_tokens  INTEGER NOT NULL DEFAULT 0,
    credit_delta       REAL NOT NULL DEFAULT 0.0,
    status             TEXT NOT NULL DEFAULT 'pending',
    error_text         TEXT,
    created_at         TEXT NOT NULL DEFAULT (datetime('now')),
    completed_at       TEXT,
    UNIQUE (session_id, turn_number)
);

-- Individual tool calls within turns, ordered by seq.
CREATE TABLE IF NOT EXISTS tool_calls (
    id             TEXT PRIMARY KEY,
    turn_id        TEXT NOT NULL REFERENCES turns(id),
    seq            INTEGER NOT NULL,
    tool_name      TEXT NOT NULL,
    arguments_json TEXT NOT NULL DEFAULT '{}',
    output         TEXT,
    exit_code      INTEGER,
    started_at     TEXT NOT NULL DEFAULT (datetime('now')),
    finished_at    TEXT
);

-- Heartbeat execution log
CREATE TABLE IF NOT EXISTS heartbeat_entries (
    id          TEXT PRIMARY KEY,
    task_name   TEXT NOT NULL,
    result      TEXT,
    success     INTEGER NOT NULL DEFAULT 1,
    executed_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Model registry: provider is set on first insert and never changed thereafter.
CREATE TABLE IF NOT EXISTS model_registry (
    model_id          TEXT PRIMARY KEY,
    provider          TEXT NOT NULL,
    display_name      TEXT NOT NULL,
    tier_minimum      TEXT NOT NULL,
    cost_per_1k_input  REAL NOT NULL DEFAULT 0.0,
    cost_per_1k_output REAL NOT NULL DEFAULT 0.0,
    max_output_tokens INTEGER NOT NULL DEFAULT 4096,
    context_window    INTEGER NOT NULL DEFAULT 8192,
    supports_tools    INTEGER NOT NULL DEFAULT 0,
    supports_vision   INTEGER NOT NULL DEFAULT 0,
    param_style       TEXT NOT NULL DEFAULT 'max_tokens',
    enabled           INTEGER NOT NULL DEFAULT 1,
    created_at        TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at        TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Spawned children. Never hard-deleted outside pruning.
CREATE TABLE IF NOT EXISTS children (
    id             TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    address        TEXT NOT NULL,
    sandbox_id     TEXT NOT NULL,
    genesis_prompt TEXT NOT NULL,
    status         TEXT NOT NULL DEFAULT 'init',
    created_at     TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Append-only lifecycle transitions for children.
CREATE TABLE IF NOT EXISTS lifecycle_events (
    id         TEXT PRIMARY KEY,
    child_id   TEXT NOT NULL REFERENCES children(id),
    transition TEXT NOT NULL,
    to_state   TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_turns_session ON turns(session_id);
CREATE INDEX IF NOT EXISTS idx_tool_calls_turn ON tool_calls(turn_id);
CREATE INDEX IF NOT EXISTS idx_heartbeat_task ON heartbeat_entries(task_name);
CREATE INDEX IF NOT EXISTS idx_children_status ON children(status);
CREATE INDEX IF NOT EXISTS idx_children_created ON children(created_at);
CREATE INDEX IF NOT EXISTS idx_lifecycle_child ON lifecycle_events(child_id);
CREATE INDEX IF NOT EXISTS idx_registry_enabled ON model_registry(enabled);
"#;
