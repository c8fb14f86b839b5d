//! SQLite database wrapper with WAL mode and migration support.

use crate::store::schema;
use crate::types::*;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// The MoneyClaw state database.
pub struct Database {
    conn: Connection,
}

// Safety: `rusqlite::Connection` is `!Sync` purely because it forbids concurrent
// *use* from multiple threads at once. Every caller reaches `Database` through
// `tokio::sync::Mutex<Database>`, which already serializes access to one task at
// a time, so sharing a `&Database` across an await point is sound.
unsafe impl Sync for Database {}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl Database {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Run schema creation and migrations, inside one transaction.
    fn migrate(&mut self) -> Result<()> {
        let version = self.schema_version();
        let tx = self.conn.transaction()?;

        if version == 0 {
            info!("Creating database schema v{}", schema::SCHEMA_VERSION);
            tx.execute_batch(schema::CREATE_SCHEMA)
                .context("Failed to create schema")?;
            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::SCHEMA_VERSION],
            )?;
        } else if version < schema::SCHEMA_VERSION {
            // Linear migration steps land here as `MIGRATE_VN_TO_VN1` constants,
            // applied in order, same shape as the teacher's state::database.
            tx.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::SCHEMA_VERSION],
            )?;
        }

        tx.commit().context("Failed to commit schema migration")?;
        Ok(())
    }

    fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Identity
    // -----------------------------------------------------------------------

    /// Insert the one immutable identity row. Errors if one already exists.
    pub fn insert_identity(&self, identity: &Identity) -> Result<()> {
        self.conn.execute(
            "INSERT INTO identity (wallet_address, creator_address, genesis_prompt, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                identity.wallet_address,
                identity.creator_address,
                identity.genesis_prompt,
                identity.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_identity(&self) -> Result<Option<Identity>> {
        let result = self.conn.query_row(
            "SELECT wallet_address, creator_address, genesis_prompt, created_at FROM identity LIMIT 1",
            [],
            |row| {
                Ok(Identity {
                    wallet_address: row.get(0)?,
                    creator_address: row.get(1)?,
                    genesis_prompt: row.get(2)?,
                    created_at: row.get::<_, String>(3).map(|s| parse_rfc3339(&s))?,
                })
            },
        );
        match result {
            Ok(identity) => Ok(Some(identity)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    /// Open a new session. There must be at most one open session at a time.
    pub fn open_session(&self) -> Result<Session> {
        let session = Session {
            id: ulid::Ulid::new().to_string(),
            started_at: Utc::now(),
            ended_at: None,
        };
        self.conn.execute(
            "INSERT INTO sessions (id, started_at, ended_at) VALUES (?1, ?2, NULL)",
            params![session.id, session.started_at.to_rfc3339()],
        )?;
        Ok(session)
    }

    /// Close a session by id.
    pub fn close_session(&self, id: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE sessions SET ended_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id],
        )?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Key-value store
    // -----------------------------------------------------------------------

    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get(0)).ok();
        Ok(result)
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Turns + tool calls
    // -----------------------------------------------------------------------

    /// Insert a turn in `pending` state and return the row.
    pub fn insert_turn(
        &self,
        session_id: &str,
        tier: SurvivalTier,
        model_id: &str,
    ) -> Result<Turn> {
        let turn = Turn {
            id: ulid::Ulid::new().to_string(),
            session_id: session_id.to_string(),
            turn_number: self.next_turn_number(session_id)?,
            tier_at_decision: tier,
            model_id: model_id.to_string(),
            prompt_tokens: 0,
            completion_tokens: 0,
            credit_delta: 0.0,
            status: TurnStatus::Pending,
            error_text: None,
            created_at: Utc::now(),
            completed_at: None,
        };

        self.conn.execute(
            "INSERT INTO turns (id, session_id, turn_number, tier_at_decision, model_id,
                                 prompt_tokens, completion_tokens, credit_delta, status,
                                 error_text, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                turn.id,
                turn.session_id,
                turn.turn_number,
                turn.tier_at_decision.to_string(),
                turn.model_id,
                turn.prompt_tokens,
                turn.completion_tokens,
                turn.credit_delta,
                turn.status.to_string(),
                turn.error_text,
                turn.created_at.to_rfc3339(),
                Option::<String>::None,
            ],
        )?;

        Ok(turn)
    }

    /// Mark a turn completed and record its token usage / credit delta, plus all
    /// of its tool calls, atomically.
    pub fn complete_turn(
        &mut self,
        turn_id: &str,
        prompt_tokens: u32,
        completion_tokens: u32,
        credit_delta: f64,
        tool_calls: &[ToolCallRecord],
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE turns SET status = 'completed', prompt_tokens = ?1, completion_tokens = ?2,
                               credit_delta = ?3, completed_at = ?4
             WHERE id = ?5",
            params![
                prompt_tokens,
                completion_tokens,
                credit_delta,
                Utc::now().to_rfc3339(),
                turn_id,
            ],
        )?;
        for tc in tool_calls {
            insert_tool_call(&tx, tc)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Mark a turn failed with the given error text.
    pub fn fail_turn(&self, turn_id: &str, error_text: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE turns SET status = 'failed', error_text = ?1, completed_at = ?2 WHERE id = ?3",
            params![error_text, Utc::now().to_rfc3339(), turn_id],
        )?;
        Ok(())
    }

    /// Append a single tool call to an existing turn.
    pub fn append_tool_call(&self, tc: &ToolCallRecord) -> Result<()> {
        insert_tool_call(&self.conn, tc)
    }

    fn next_turn_number(&self, session_id: &str) -> Result<u64> {
        let max: Option<u64> = self
            .conn
            .query_row(
                "SELECT MAX(turn_number) FROM turns WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .ok();
        Ok(max.unwrap_or(0) + 1)
    }

    /// Count of failed turns within the last hour (for the tier governor's
    /// error-rate signal).
    pub fn errors_in_last_hour(&self) -> Result<u32> {
        let since = (Utc::now() - chrono::Duration::hours(1)).to_rfc3339();
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM turns WHERE status = 'failed' AND created_at >= ?1",
            params![since],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Total turn count across all sessions.
    pub fn turn_count(&self) -> Result<u64> {
        let count: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM turns", [], |row| row.get(0))?;
        Ok(count)
    }

    /// The most recent non-empty (failed, non-null error_text) turn's error text.
    pub fn last_turn_error(&self) -> Result<Option<String>> {
        let result = self.conn.query_row(
            "SELECT error_text FROM turns WHERE status = 'failed' AND error_text IS NOT NULL
             ORDER BY created_at DESC LIMIT 1",
            [],
            |row| row.get(0),
        );
        match result {
            Ok(text) => Ok(text),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Short human-readable summaries of the most recent turns in a session,
    /// newest last, for folding into the next turn's prompt context.
    pub fn recent_turn_summaries(&self, session_id: &str, limit: u32) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT turn_number, status, model_id, error_text FROM turns
             WHERE session_id = ?1 ORDER BY turn_number DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![session_id, limit], |row| {
            let turn_number: u64 = row.get(0)?;
            let status: String = row.get(1)?;
            let model_id: String = row.get(2)?;
            let error_text: Option<String> = row.get(3)?;
            Ok(match error_text {
                Some(err) => format!("Turn {turn_number} [{status}] ({model_id}): {err}"),
                None => format!("Turn {turn_number} [{status}] ({model_id})"),
            })
        })?;
        let mut summaries = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        summaries.reverse();
        Ok(summaries)
    }

    // -----------------------------------------------------------------------
    // Heartbeat
    // -----------------------------------------------------------------------

    pub fn last_heartbeat_result(&self) -> Result<Option<String>> {
        let result = self.conn.query_row(
            "SELECT result FROM heartbeat_entries ORDER BY executed_at DESC LIMIT 1",
            [],
            |row| row.get(0),
        );
        match result {
            Ok(text) => Ok(Some(text)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn log_heartbeat(&self, task_name: &str, result: &str, success: bool) -> Result<()> {
        let id = ulid::Ulid::new().to_string();
        self.conn.execute(
            "INSERT INTO heartbeat_entries (id, task_name, result, success)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, task_name, result, success as i32],
        )?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Model registry
    // -----------------------------------------------------------------------

    /// Upsert a registry row. `provider` is only honoured on first insert.
    pub fn upsert_registry_row(&self, row: &ModelRegistryRow) -> Result<()> {
        self.conn.execute(
            "INSERT INTO model_registry (model_id, provider, display_name, tier_minimum,
                cost_per_1k_input, cost_per_1k_output, max_output_tokens, context_window,
                supports_tools, supports_vision, param_style, enabled, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
             ON CONFLICT(model_id) DO UPDATE SET
                display_name = ?3, tier_minimum = ?4, cost_per_1k_input = ?5,
                cost_per_1k_output = ?6, max_output_tokens = ?7, context_window = ?8,
                supports_tools = ?9, supports_vision = ?10, param_style = ?11,
                enabled = ?12, updated_at = ?13",
            params![
                row.model_id,
                row.provider.to_string(),
                row.display_name,
                row.tier_minimum.to_string(),
                row.cost_per_1k_input,
                row.cost_per_1k_output,
                row.max_output_tokens,
                row.context_window,
                row.supports_tools as i32,
                row.supports_vision as i32,
                format!("{:?}", row.param_style).to_lowercase(),
                row.enabled as i32,
                row.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// List all enabled registry rows.
    pub fn list_enabled_registry_rows(&self) -> Result<Vec<ModelRegistryRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT model_id, provider, display_name, tier_minimum, cost_per_1k_input,
                    cost_per_1k_output, max_output_tokens, context_window, supports_tools,
                    supports_vision, param_style, enabled, created_at, updated_at
             FROM model_registry WHERE enabled = 1",
        )?;
        let rows = stmt.query_map([], row_to_registry)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// List every registry row regardless of enabled state.
    pub fn list_all_registry_rows(&self) -> Result<Vec<ModelRegistryRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT model_id, provider, display_name, tier_minimum, cost_per_1k_input,
                    cost_per_1k_output, max_output_tokens, context_window, supports_tools,
                    supports_vision, param_style, enabled, created_at, updated_at
             FROM model_registry",
        )?;
        let rows = stmt.query_map([], row_to_registry)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Flip the `enabled` flag on a registry row (tombstoning a withdrawn model).
    pub fn set_registry_enabled(&self, model_id: &str, enabled: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE model_registry SET enabled = ?1, updated_at = ?2 WHERE model_id = ?3",
            params![enabled as i32, Utc::now().to_rfc3339(), model_id],
        )?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Children + lifecycle
    // -----------------------------------------------------------------------

    /// Insert a child and its first lifecycle event, atomically.
    pub fn add_child(&mut self, child: &ChildRecord) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO children (id, name, address, sandbox_id, genesis_prompt, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                child.id,
                child.name,
                child.address,
                child.sandbox_id,
                child.genesis_prompt,
                child.status.to_string(),
                child.created_at.to_rfc3339(),
            ],
        )?;
        let event = LifecycleEvent {
            id: ulid::Ulid::new().to_string(),
            child_id: child.id.clone(),
            transition: "spawned".to_string(),
            to_state: child.status,
            created_at: Utc::now(),
        };
        insert_lifecycle_event(&tx, &event)?;
        tx.commit()?;
        Ok(())
    }

    /// Update a child's status and append the corresponding lifecycle event,
    /// atomically.
    pub fn update_child_status(
        &mut self,
        child_id: &str,
        transition: &str,
        to_state: ChildStatus,
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE children SET status = ?1 WHERE id = ?2",
            params![to_state.to_string(), child_id],
        )?;
        let event = LifecycleEvent {
            id: ulid::Ulid::new().to_string(),
            child_id: child_id.to_string(),
            transition: transition.to_string(),
            to_state,
            created_at: Utc::now(),
        };
        insert_lifecycle_event(&tx, &event)?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_child(&self, child_id: &str) -> Result<Option<ChildRecord>> {
        let result = self.conn.query_row(
            "SELECT id, name, address, sandbox_id, genesis_prompt, status, created_at
             FROM children WHERE id = ?1",
            params![child_id],
            row_to_child,
        );
        match result {
            Ok(child) => Ok(Some(child)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List children in a given status, oldest first.
    pub fn list_children_by_status(&self, status: ChildStatus) -> Result<Vec<ChildRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, address, sandbox_id, genesis_prompt, status, created_at
             FROM children WHERE status = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![status.to_string()], row_to_child)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    pub fn list_children(&self) -> Result<Vec<ChildRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, address, sandbox_id, genesis_prompt, status, created_at
             FROM children ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map([], row_to_child)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    pub fn active_children_count(&self) -> Result<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM children WHERE status NOT IN ('dead', 'cleaned_up')",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Most recent lifecycle state recorded for a child.
    pub fn latest_lifecycle_state(&self, child_id: &str) -> Result<Option<ChildStatus>> {
        let result = self.conn.query_row(
            "SELECT to_state FROM lifecycle_events WHERE child_id = ?1
             ORDER BY created_at DESC LIMIT 1",
            params![child_id],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(s) => Ok(Some(ChildStatus::from_str(&s)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn insert_tool_call(conn: &Connection, tc: &ToolCallRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO tool_calls (id, turn_id, seq, tool_name, arguments_json, output,
                                  exit_code, started_at, finished_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            tc.id,
            tc.turn_id,
            tc.seq,
            tc.tool_name,
            tc.arguments_json.to_string(),
            tc.output,
            tc.exit_code,
            tc.started_at.to_rfc3339(),
            tc.finished_at.map(|d| d.to_rfc3339()),
        ],
    )?;
    Ok(())
}

fn insert_lifecycle_event(conn: &Connection, event: &LifecycleEvent) -> Result<()> {
    conn.execute(
        "INSERT INTO lifecycle_events (id, child_id, transition, to_state, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            event.id,
            event.child_id,
            event.transition,
            event.to_state.to_string(),
            event.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn row_to_child(row: &rusqlite::Row) -> rusqlite::Result<ChildRecord> {
    Ok(ChildRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        sandbox_id: row.get(3)?,
        genesis_prompt: row.get(4)?,
        status: row
            .get::<_, String>(5)
            .map(|s| ChildStatus::from_str(&s).unwrap_or(ChildStatus::Dead))?,
        created_at: row.get::<_, String>(6).map(|s| parse_rfc3339(&s))?,
    })
}

fn row_to_registry(row: &rusqlite::Row) -> rusqlite::Result<ModelRegistryRow> {
    Ok(ModelRegistryRow {
        model_id: row.get(0)?,
        provider: row
            .get::<_, String>(1)
            .map(|s| Provider::from_str(&s).unwrap_or(Provider::Openai))?,
        display_name: row.get(2)?,
        tier_minimum: row
            .get::<_, String>(3)
            .map(|s| SurvivalTier::from_str(&s).unwrap_or(SurvivalTier::Normal))?,
        cost_per_1k_input: row.get(4)?,
        cost_per_1k_output: row.get(5)?,
        max_output_tokens: row.get(6)?,
        context_window: row.get(7)?,
        supports_tools: row.get::<_, i32>(8)? != 0,
        supports_vision: row.get::<_, i32>(9)? != 0,
        param_style: match row.get::<_, String>(10)?.as_str() {
            "max_completion_tokens" => ParamStyle::MaxCompletionTokens,
            _ => ParamStyle::MaxTokens,
        },
        enabled: row.get::<_, i32>(11)? != 0,
        created_at: row.get::<_, String>(12).map(|s| parse_rfc3339(&s))?,
        updated_at: row.get::<_, String>(13).map(|s| parse_rfc3339(&s))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_identity() -> Identity {
        Identity {
            wallet_address: "0x1111111111111111111111111111111111111111".into(),
            creator_address: "0x2222222222222222222222222222222222222222".into(),
            genesis_prompt: "exist".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn opens_in_memory_and_migrates() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.schema_version(), schema::SCHEMA_VERSION);
    }

    #[test]
    fn identity_round_trips() {
        let db = Database::open_memory().unwrap();
        assert!(db.get_identity().unwrap().is_none());
        let identity = sample_identity();
        db.insert_identity(&identity).unwrap();
        let loaded = db.get_identity().unwrap().unwrap();
        assert_eq!(loaded.wallet_address, identity.wallet_address);
    }

    #[test]
    fn turn_numbers_are_monotonic_per_session() {
        let mut db = Database::open_memory().unwrap();
        let session = db.open_session().unwrap();
        let t1 = db.insert_turn(&session.id, SurvivalTier::Normal, "gpt-4o").unwrap();
        let t2 = db.insert_turn(&session.id, SurvivalTier::Normal, "gpt-4o").unwrap();
        assert_eq!(t1.turn_number, 1);
        assert_eq!(t2.turn_number, 2);
        db.complete_turn(&t1.id, 10, 20, -0.01, &[]).unwrap();
        db.fail_turn(&t2.id, "boom").unwrap();
        assert_eq!(db.last_turn_error().unwrap().as_deref(), Some("boom"));
    }

    #[test]
    fn child_and_lifecycle_insert_atomically() {
        let mut db = Database::open_memory().unwrap();
        let child = ChildRecord {
            id: ulid::Ulid::new().to_string(),
            name: "kid".into(),
            address: "0x3333333333333333333333333333333333333333".into(),
            sandbox_id: "sbx-1".into(),
            genesis_prompt: "survive".into(),
            status: ChildStatus::Init,
            created_at: Utc::now(),
        };
        db.add_child(&child).unwrap();
        assert_eq!(
            db.latest_lifecycle_state(&child.id).unwrap(),
            Some(ChildStatus::Init)
        );

        db.update_child_status(&child.id, "sandbox_created", ChildStatus::SandboxCreated)
            .unwrap();
        assert_eq!(
            db.latest_lifecycle_state(&child.id).unwrap(),
            Some(ChildStatus::SandboxCreated)
        );
        assert_eq!(db.active_children_count().unwrap(), 1);
    }

    #[test]
    fn registry_tombstoning_flips_enabled() {
        let db = Database::open_memory().unwrap();
        let row = ModelRegistryRow {
            model_id: "gpt-4o".into(),
            provider: Provider::Openai,
            display_name: "GPT-4o".into(),
            tier_minimum: SurvivalTier::Normal,
            cost_per_1k_input: 0.005,
            cost_per_1k_output: 0.015,
            max_output_tokens: 4096,
            context_window: 128_000,
            supports_tools: true,
            supports_vision: true,
            param_style: ParamStyle::MaxTokens,
            enabled: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        db.upsert_registry_row(&row).unwrap();
        assert_eq!(db.list_enabled_registry_rows().unwrap().len(), 1);

        db.set_registry_enabled("gpt-4o", false).unwrap();
        assert_eq!(db.list_enabled_registry_rows().unwrap().len(), 0);
        assert_eq!(db.list_all_registry_rows().unwrap().len(), 1);
    }
}
