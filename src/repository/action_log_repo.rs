// ==========================================
// 注塑排产管理系统 - 操作日志仓储
// ==========================================
// 职责: 管理 action_log 表 (平移传播操作审计)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::action_log::ActionLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repo.ensure_table()?;
        Ok(repo)
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.ensure_table()?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 确保表存在 (如果不存在则创建)
    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS action_log (
              action_id TEXT PRIMARY KEY,
              action_type TEXT NOT NULL,
              target_id TEXT,
              machine_sn TEXT,
              actor TEXT NOT NULL,
              action_ts TEXT NOT NULL,
              payload_json TEXT,
              detail TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_action_log_ts
              ON action_log(action_ts DESC);
            CREATE INDEX IF NOT EXISTS idx_action_log_machine
              ON action_log(machine_sn, action_ts DESC);
            "#,
        )?;
        Ok(())
    }

    /// 写入一条操作日志
    pub fn create(&self, log: &ActionLog) -> RepositoryResult<()> {
        let payload = log
            .payload_json
            .as_ref()
            .map(|v| v.to_string());
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO action_log (
                action_id, action_type, target_id, machine_sn,
                actor, action_ts, payload_json, detail
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                log.action_id,
                log.action_type,
                log.target_id,
                log.machine_sn,
                log.actor,
                log.action_ts,
                payload,
                log.detail,
            ],
        )?;
        Ok(())
    }

    /// 最近操作日志 (按时间倒序)
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT action_id, action_type, target_id, machine_sn,
                   actor, action_ts, payload_json, detail
            FROM action_log
            ORDER BY action_ts DESC
            LIMIT ?1
            "#,
        )?;
        let rows = stmt
            .query_map(params![limit as i64], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 某机台的操作日志 (按时间倒序)
    pub fn list_by_machine(&self, machine_sn: &str, limit: usize) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT action_id, action_type, target_id, machine_sn,
                   actor, action_ts, payload_json, detail
            FROM action_log
            WHERE machine_sn = ?1
            ORDER BY action_ts DESC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt
            .query_map(params![machine_sn, limit as i64], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> SqliteResult<ActionLog> {
        let payload_raw: Option<String> = row.get(6)?;
        Ok(ActionLog {
            action_id: row.get(0)?,
            action_type: row.get(1)?,
            target_id: row.get(2)?,
            machine_sn: row.get(3)?,
            actor: row.get(4)?,
            action_ts: row.get(5)?,
            payload_json: payload_raw.and_then(|raw| serde_json::from_str(&raw).ok()),
            detail: row.get(7)?,
        })
    }
}
