// ==========================================
// 注塑排产管理系统 - 机台状态仓储
// ==========================================
// 职责: 管理 machine_status 表 (人工申报的非生产时间窗口)
// 说明: 增删改均由 API 层经传播器批量落库 (timeline_shift_repo);
//       本仓储提供查询与基础写入
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::machine::MachineStatusWindow;
use crate::domain::types::MachineStatusKind;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    status_id, machine_sn, kind,
    plan_start_date, plan_end_date, actual_start_date, actual_end_date,
    note, created_at, updated_at
"#;

pub struct MachineStatusRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MachineStatusRepository {
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
            CREATE TABLE IF NOT EXISTS machine_status (
              status_id TEXT PRIMARY KEY,
              machine_sn TEXT NOT NULL,
              kind TEXT NOT NULL,
              plan_start_date TEXT NOT NULL,
              plan_end_date TEXT NOT NULL,
              actual_start_date TEXT,
              actual_end_date TEXT,
              note TEXT,
              created_at TEXT NOT NULL DEFAULT (datetime('now')),
              updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_machine_status_machine_start
              ON machine_status(machine_sn, plan_start_date);
            "#,
        )?;
        Ok(())
    }

    /// 写入状态窗口 (测试与数据准备用; 业务路径经传播器批量落库)
    pub fn create(&self, window: &MachineStatusWindow) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO machine_status (
                status_id, machine_sn, kind,
                plan_start_date, plan_end_date, actual_start_date, actual_end_date,
                note, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                window.status_id,
                window.machine_sn,
                window.kind.as_str(),
                window.plan_start_date,
                window.plan_end_date,
                window.actual_start_date,
                window.actual_end_date,
                window.note,
                window.created_at,
                window.updated_at,
            ],
        )?;
        Ok(())
    }

    /// 按ID查找状态窗口
    pub fn find_by_id(&self, status_id: &str) -> RepositoryResult<Option<MachineStatusWindow>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM machine_status WHERE status_id = ?1",
            SELECT_COLUMNS
        );
        let result = conn.query_row(&sql, params![status_id], Self::map_row);
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按ID查找, 不存在时直接报 NotFound
    pub fn get_by_id(&self, status_id: &str) -> RepositoryResult<MachineStatusWindow> {
        self.find_by_id(status_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "MachineStatus".to_string(),
                id: status_id.to_string(),
            })
    }

    /// 查询机台下游待移状态窗口
    ///
    /// 口径与排程侧一致: 计划开始不早于 `from`, 未实际开始, 排除自身, 升序
    pub fn find_downstream(
        &self,
        machine_sn: &str,
        from: NaiveDateTime,
        exclude_id: Option<&str>,
    ) -> RepositoryResult<Vec<MachineStatusWindow>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM machine_status
            WHERE machine_sn = ?1
              AND plan_start_date >= ?2
              AND actual_start_date IS NULL
              AND status_id != ?3
            ORDER BY plan_start_date ASC
            "#,
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![machine_sn, from, exclude_id.unwrap_or("")], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 列出机台全部状态窗口 (按计划开始升序)
    pub fn list_by_machine(&self, machine_sn: &str) -> RepositoryResult<Vec<MachineStatusWindow>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM machine_status
            WHERE machine_sn = ?1
            ORDER BY plan_start_date ASC
            "#,
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![machine_sn], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 按生产区域 + 时间窗口查询状态窗口 (联 machine 表, 供非规范化视图)
    pub fn list_by_area_window(
        &self,
        production_area: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> RepositoryResult<Vec<MachineStatusWindow>> {
        let conn = self.get_conn()?;
        let prefixed = SELECT_COLUMNS
            .split(',')
            .map(|c| format!("ms.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            r#"
            SELECT {} FROM machine_status ms
            JOIN machine m ON m.machine_sn = ms.machine_sn
            WHERE m.production_area = ?1
              AND ms.plan_start_date < ?3
              AND ms.plan_end_date > ?2
            ORDER BY ms.machine_sn ASC, ms.plan_start_date ASC
            "#,
            prefixed
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![production_area, from, to], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub(crate) fn map_row(row: &rusqlite::Row<'_>) -> SqliteResult<MachineStatusWindow> {
        let kind_raw: String = row.get(2)?;
        let kind = MachineStatusKind::from_str(&kind_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("未知机台状态类别: {}", kind_raw).into(),
            )
        })?;
        Ok(MachineStatusWindow {
            status_id: row.get(0)?,
            machine_sn: row.get(1)?,
            kind,
            plan_start_date: row.get(3)?,
            plan_end_date: row.get(4)?,
            actual_start_date: row.get(5)?,
            actual_end_date: row.get(6)?,
            note: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}
