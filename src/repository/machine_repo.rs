// ==========================================
// 注塑排产管理系统 - 机台仓储
// ==========================================
// 职责: 管理 machine 表 (机台主数据, 按生产区域组织)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::machine::Machine;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

pub struct MachineRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MachineRepository {
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
            CREATE TABLE IF NOT EXISTS machine (
              machine_sn TEXT PRIMARY KEY,
              machine_name TEXT NOT NULL,
              production_area TEXT NOT NULL,
              tonnage REAL,
              created_at TEXT NOT NULL DEFAULT (datetime('now')),
              updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_machine_area
              ON machine(production_area);
            "#,
        )?;
        Ok(())
    }

    /// 创建机台 (编号冲突时报唯一约束违反)
    pub fn create(&self, machine: &Machine) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO machine (machine_sn, machine_name, production_area, tonnage, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                machine.machine_sn,
                machine.machine_name,
                machine.production_area,
                machine.tonnage,
                machine.created_at,
                machine.updated_at,
            ],
        )?;
        Ok(())
    }

    /// 按编号查找机台
    pub fn find_by_sn(&self, machine_sn: &str) -> RepositoryResult<Option<Machine>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            r#"
            SELECT machine_sn, machine_name, production_area, tonnage, created_at, updated_at
            FROM machine
            WHERE machine_sn = ?1
            "#,
            params![machine_sn],
            Self::map_row,
        );
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 列出某生产区域全部机台 (按编号排序)
    pub fn list_by_area(&self, production_area: &str) -> RepositoryResult<Vec<Machine>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT machine_sn, machine_name, production_area, tonnage, created_at, updated_at
            FROM machine
            WHERE production_area = ?1
            ORDER BY machine_sn ASC
            "#,
        )?;
        let rows = stmt
            .query_map(params![production_area], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 检查机台是否存在
    pub fn exists(&self, machine_sn: &str) -> RepositoryResult<bool> {
        Ok(self.find_by_sn(machine_sn)?.is_some())
    }

    fn map_row(row: &rusqlite::Row<'_>) -> SqliteResult<Machine> {
        Ok(Machine {
            machine_sn: row.get(0)?,
            machine_name: row.get(1)?,
            production_area: row.get(2)?,
            tonnage: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}
