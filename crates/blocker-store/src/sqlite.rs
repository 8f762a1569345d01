//! SQLite-based store implementation

use blocker_config::{parse_plan_document, plan_to_json, BlockPlan};
use blocker_util::AppId;
use chrono::{DateTime, Local, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::{
    AuditEvent, AuditEventType, PlanStore, Store, StoreError, StoreResult, UsageRecord,
    UsageStore, CURRENT_PLAN_SLOT,
};

const DAY_FORMAT: &str = "%Y-%m-%d";

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path, creating missing parent
    /// directories
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Document slots (the current plan lives in one of them)
            CREATE TABLE IF NOT EXISTS documents (
                slot TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Usage history
            CREATE TABLE IF NOT EXISTS usage (
                app_id TEXT NOT NULL,
                day TEXT NOT NULL,
                minutes INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (app_id, day)
            );

            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            CREATE INDEX IF NOT EXISTS idx_usage_day ON usage(day);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }

    fn read_slot(&self, slot: &str) -> StoreResult<Option<String>> {
        let conn = self.conn()?;
        let body = conn
            .query_row("SELECT body FROM documents WHERE slot = ?", [slot], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(body)
    }

    fn write_slot(&self, slot: &str, body: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO documents (slot, body, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(slot)
            DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
            "#,
            params![slot, body, blocker_util::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

fn parse_day(s: &str) -> StoreResult<NaiveDate> {
    NaiveDate::parse_from_str(s, DAY_FORMAT)
        .map_err(|e| StoreError::Serialization(format!("bad day '{}': {}", s, e)))
}

impl PlanStore for SqliteStore {
    fn save(&self, plan: &BlockPlan) -> StoreResult<()> {
        let body = plan_to_json(plan)?;
        self.write_slot(CURRENT_PLAN_SLOT, &body)?;

        info!(plan_id = %plan.id(), name = plan.name(), "Plan saved");
        Ok(())
    }

    fn load_current(&self) -> StoreResult<Option<BlockPlan>> {
        let Some(body) = self.read_slot(CURRENT_PLAN_SLOT)? else {
            return Ok(None);
        };

        match parse_plan_document(&body) {
            Ok(plan) => Ok(Some(plan)),
            Err(e) => {
                warn!(error = %e, "Stored plan document failed validation");
                Err(e.into())
            }
        }
    }

    fn exists(&self) -> StoreResult<bool> {
        Ok(self.read_slot(CURRENT_PLAN_SLOT)?.is_some())
    }

    fn delete_current(&self) -> StoreResult<bool> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM documents WHERE slot = ?", [CURRENT_PLAN_SLOT])?;

        debug!(removed, "Current plan slot cleared");
        Ok(removed > 0)
    }
}

impl UsageStore for SqliteStore {
    fn get_usage(&self, app_id: &AppId, day: NaiveDate) -> StoreResult<u32> {
        let conn = self.conn()?;
        let day_str = day.format(DAY_FORMAT).to_string();

        let minutes: Option<i64> = conn
            .query_row(
                "SELECT minutes FROM usage WHERE app_id = ? AND day = ?",
                params![app_id.as_str(), day_str],
                |row| row.get(0),
            )
            .optional()?;

        Ok(minutes.unwrap_or(0).clamp(0, u32::MAX as i64) as u32)
    }

    fn add_usage(&self, app_id: &AppId, day: NaiveDate, minutes: u32) -> StoreResult<()> {
        let conn = self.conn()?;
        let day_str = day.format(DAY_FORMAT).to_string();

        conn.execute(
            r#"
            INSERT INTO usage (app_id, day, minutes)
            VALUES (?, ?, ?)
            ON CONFLICT(app_id, day)
            DO UPDATE SET minutes = minutes + excluded.minutes
            "#,
            params![app_id.as_str(), day_str, minutes as i64],
        )?;

        debug!(app_id = %app_id, day = %day_str, added_minutes = minutes, "Usage added");
        Ok(())
    }

    fn usage_since(&self, first_day: NaiveDate) -> StoreResult<Vec<UsageRecord>> {
        let conn = self.conn()?;
        let first_day_str = first_day.format(DAY_FORMAT).to_string();

        let mut stmt = conn.prepare(
            "SELECT app_id, day, minutes FROM usage WHERE day >= ? ORDER BY day, app_id",
        )?;

        let rows = stmt.query_map([first_day_str], |row| {
            let app_id: String = row.get(0)?;
            let day: String = row.get(1)?;
            let minutes: i64 = row.get(2)?;
            Ok((app_id, day, minutes))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (app_id, day, minutes) = row?;
            records.push(UsageRecord {
                app_id: AppId::new(app_id),
                day: parse_day(&day)?,
                minutes: minutes.clamp(0, u32::MAX as i64) as u32,
            });
        }

        Ok(records)
    }

    fn prune_usage_before(&self, day: NaiveDate) -> StoreResult<usize> {
        let conn = self.conn()?;
        let day_str = day.format(DAY_FORMAT).to_string();

        let removed = conn.execute("DELETE FROM usage WHERE day < ?", [day_str])?;
        debug!(removed, "Usage history pruned");
        Ok(removed)
    }
}

impl Store for SqliteStore {
    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Local))
                .unwrap_or_else(|_| blocker_util::now());
            let event: AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocker_config::AppRule;
    use blocker_util::{PlanId, TimeWindow, WallClock};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn sample_plan() -> BlockPlan {
        BlockPlan::new(
            PlanId::generate(),
            "Evenings",
            TimeWindow::new(WallClock::hm(22, 0).unwrap(), WallClock::hm(6, 0).unwrap()),
            vec![AppRule::blocked("com.example.game", "Game").with_daily_limit(30)],
        )
        .unwrap()
    }

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
    }

    #[test]
    fn test_plan_slot_lifecycle() {
        let store = SqliteStore::in_memory().unwrap();

        // Nothing stored yet is not an error
        assert!(!store.exists().unwrap());
        assert!(store.load_current().unwrap().is_none());

        let plan = sample_plan();
        store.save(&plan).unwrap();
        assert!(store.exists().unwrap());
        assert_eq!(store.load_current().unwrap(), Some(plan.clone()));

        // Saving again replaces the whole plan
        let paused = plan.with_active(false);
        store.save(&paused).unwrap();
        assert_eq!(store.load_current().unwrap(), Some(paused));

        assert!(store.delete_current().unwrap());
        assert!(!store.exists().unwrap());
        assert!(!store.delete_current().unwrap());
    }

    #[test]
    fn test_corrupt_plan_document_is_reported() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .write_slot(CURRENT_PLAN_SLOT, "{\"document_version\": 1, \"name\": \"\"}")
            .unwrap();

        assert!(store.exists().unwrap());
        assert!(matches!(
            store.load_current(),
            Err(StoreError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_new_plan_ids_are_unique() {
        let store = SqliteStore::in_memory().unwrap();
        assert_ne!(store.new_plan_id(), store.new_plan_id());
    }

    #[test]
    fn test_usage_accounting() {
        let store = SqliteStore::in_memory().unwrap();
        let app = AppId::new("com.example.game");

        // Initially zero
        assert_eq!(store.get_usage(&app, day(10)).unwrap(), 0);

        store.add_usage(&app, day(10), 5).unwrap();
        store.add_usage(&app, day(10), 7).unwrap();
        assert_eq!(store.get_usage(&app, day(10)).unwrap(), 12);

        // Other days are separate buckets
        assert_eq!(store.get_usage(&app, day(11)).unwrap(), 0);
    }

    #[test]
    fn test_usage_since_and_prune() {
        let store = SqliteStore::in_memory().unwrap();
        let game = AppId::new("com.example.game");
        let chat = AppId::new("com.example.chat");

        store.add_usage(&game, day(1), 10).unwrap();
        store.add_usage(&game, day(5), 20).unwrap();
        store.add_usage(&chat, day(5), 3).unwrap();
        store.add_usage(&chat, day(7), 4).unwrap();

        let records = store.usage_since(day(5)).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0],
            UsageRecord {
                app_id: chat.clone(),
                day: day(5),
                minutes: 3
            }
        );

        assert_eq!(store.prune_usage_before(day(5)).unwrap(), 1);
        assert_eq!(store.get_usage(&game, day(1)).unwrap(), 0);
        assert_eq!(store.get_usage(&game, day(5)).unwrap(), 20);
    }

    #[test]
    fn test_audit_log() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .append_audit(AuditEvent::new(AuditEventType::PlanRejected {
                reasons: vec!["Plan name cannot be empty".into()],
            }))
            .unwrap();
        store
            .append_audit(AuditEvent::new(AuditEventType::PlanDeleted {
                plan_id: PlanId::new("p1"),
            }))
            .unwrap();

        let events = store.recent_audits(10).unwrap();
        assert_eq!(events.len(), 2);
        // Newest first
        assert!(matches!(events[0].event, AuditEventType::PlanDeleted { .. }));
        assert!(matches!(events[1].event, AuditEventType::PlanRejected { .. }));

        assert_eq!(store.recent_audits(1).unwrap().len(), 1);
    }

    #[test]
    fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocker.db");
        let plan = sample_plan();

        {
            let store = SqliteStore::open(&path).unwrap();
            store.save(&plan).unwrap();
            store
                .add_usage(&AppId::new("com.example.game"), day(2), 9)
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.load_current().unwrap(), Some(plan));
        assert_eq!(
            store.get_usage(&AppId::new("com.example.game"), day(2)).unwrap(),
            9
        );
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data").join("blocker.db");

        let store = SqliteStore::open(&path).unwrap();
        assert!(store.is_healthy());
        assert!(path.exists());
    }

    #[test]
    fn test_open_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let result = SqliteStore::open(blocker.join("blocker.db"));
        assert!(matches!(result, Err(StoreError::Io(_))));
    }
}
