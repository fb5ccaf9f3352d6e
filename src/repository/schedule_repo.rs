// ==========================================
// 注塑排产管理系统 - 生产排程仓储
// ==========================================
// 职责: 管理 production_schedule 表 (工单排程)
// 说明: revision 列为乐观锁修订号, 窗口批量改写时逐行校验
//       (见 timeline_shift_repo)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::schedule::ProductionSchedule;
use crate::domain::types::ScheduleStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    schedule_id, order_no, machine_sn, product_name,
    plan_on_machine_date, plan_finish_date, work_days, mold_work_days,
    actual_on_machine_date, actual_finish_date, status, revision,
    created_at, updated_at
"#;

pub struct ProductionScheduleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductionScheduleRepository {
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
            CREATE TABLE IF NOT EXISTS production_schedule (
              schedule_id TEXT PRIMARY KEY,
              order_no TEXT NOT NULL,
              machine_sn TEXT NOT NULL,
              product_name TEXT,
              plan_on_machine_date TEXT NOT NULL,
              plan_finish_date TEXT NOT NULL,
              work_days INTEGER NOT NULL,
              mold_work_days INTEGER NOT NULL DEFAULT 0,
              actual_on_machine_date TEXT,
              actual_finish_date TEXT,
              status TEXT NOT NULL DEFAULT 'NOT_YET',
              revision INTEGER NOT NULL DEFAULT 0,
              created_at TEXT NOT NULL DEFAULT (datetime('now')),
              updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_schedule_machine_start
              ON production_schedule(machine_sn, plan_on_machine_date);
            CREATE INDEX IF NOT EXISTS idx_schedule_status
              ON production_schedule(status);
            CREATE INDEX IF NOT EXISTS idx_schedule_order_no
              ON production_schedule(order_no);
            "#,
        )?;
        Ok(())
    }

    /// 创建排程
    pub fn create(&self, schedule: &ProductionSchedule) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO production_schedule (
                schedule_id, order_no, machine_sn, product_name,
                plan_on_machine_date, plan_finish_date, work_days, mold_work_days,
                actual_on_machine_date, actual_finish_date, status, revision,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                schedule.schedule_id,
                schedule.order_no,
                schedule.machine_sn,
                schedule.product_name,
                schedule.plan_on_machine_date,
                schedule.plan_finish_date,
                schedule.work_days,
                schedule.mold_work_days,
                schedule.actual_on_machine_date,
                schedule.actual_finish_date,
                schedule.status.as_str(),
                schedule.revision,
                schedule.created_at,
                schedule.updated_at,
            ],
        )?;
        Ok(())
    }

    /// 按ID查找排程
    pub fn find_by_id(&self, schedule_id: &str) -> RepositoryResult<Option<ProductionSchedule>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_schedule WHERE schedule_id = ?1",
            SELECT_COLUMNS
        );
        let result = conn.query_row(&sql, params![schedule_id], Self::map_row);
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按ID查找, 不存在时直接报 NotFound
    pub fn get_by_id(&self, schedule_id: &str) -> RepositoryResult<ProductionSchedule> {
        self.find_by_id(schedule_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "ProductionSchedule".to_string(),
                id: schedule_id.to_string(),
            })
    }

    /// 查询机台下游待移条目
    ///
    /// 口径 (时间轴读取器约定):
    /// - 计划上机不早于 `from` 的排程
    /// - 仅 NOT_YET 且未实际上机 (已开工条目永不平移)
    /// - 排除被变更条目本身
    /// - 按计划上机时间升序
    pub fn find_downstream(
        &self,
        machine_sn: &str,
        from: NaiveDateTime,
        exclude_id: Option<&str>,
    ) -> RepositoryResult<Vec<ProductionSchedule>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM production_schedule
            WHERE machine_sn = ?1
              AND plan_on_machine_date >= ?2
              AND status = 'NOT_YET'
              AND actual_on_machine_date IS NULL
              AND schedule_id != ?3
            ORDER BY plan_on_machine_date ASC
            "#,
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![machine_sn, from, exclude_id.unwrap_or("")], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 列出机台时间轴上的全部排程 (CANCEL 除外, 按上机时间升序)
    pub fn list_by_machine(&self, machine_sn: &str) -> RepositoryResult<Vec<ProductionSchedule>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM production_schedule
            WHERE machine_sn = ?1 AND status != 'CANCEL'
            ORDER BY plan_on_machine_date ASC
            "#,
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![machine_sn], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 按生产区域 + 时间窗口查询排程 (联 machine 表, 供非规范化视图)
    pub fn list_by_area_window(
        &self,
        production_area: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> RepositoryResult<Vec<ProductionSchedule>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM production_schedule ps
            JOIN machine m ON m.machine_sn = ps.machine_sn
            WHERE m.production_area = ?1
              AND ps.status != 'CANCEL'
              AND ps.plan_on_machine_date < ?3
              AND ps.plan_finish_date > ?2
            ORDER BY ps.machine_sn ASC, ps.plan_on_machine_date ASC
            "#,
            SELECT_COLUMNS
                .split(',')
                .map(|c| format!("ps.{}", c.trim()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![production_area, from, to], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 回报实际上机 (NOT_YET → ON_GOING)
    pub fn report_start(
        &self,
        schedule_id: &str,
        actual_on_machine_date: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE production_schedule
            SET actual_on_machine_date = ?2,
                status = 'ON_GOING',
                revision = revision + 1,
                updated_at = ?3
            WHERE schedule_id = ?1 AND status = 'NOT_YET'
            "#,
            params![schedule_id, actual_on_machine_date, Utc::now().naive_utc()],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ProductionSchedule(NOT_YET)".to_string(),
                id: schedule_id.to_string(),
            });
        }
        Ok(())
    }

    /// 回报实际完工 (ON_GOING → DONE)
    pub fn report_finish(
        &self,
        schedule_id: &str,
        actual_finish_date: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE production_schedule
            SET actual_finish_date = ?2,
                status = 'DONE',
                revision = revision + 1,
                updated_at = ?3
            WHERE schedule_id = ?1 AND status = 'ON_GOING'
            "#,
            params![schedule_id, actual_finish_date, Utc::now().naive_utc()],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ProductionSchedule(ON_GOING)".to_string(),
                id: schedule_id.to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn map_row(row: &rusqlite::Row<'_>) -> SqliteResult<ProductionSchedule> {
        let status_raw: String = row.get(10)?;
        let status = ScheduleStatus::from_str(&status_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                10,
                rusqlite::types::Type::Text,
                format!("未知排程状态: {}", status_raw).into(),
            )
        })?;
        Ok(ProductionSchedule {
            schedule_id: row.get(0)?,
            order_no: row.get(1)?,
            machine_sn: row.get(2)?,
            product_name: row.get(3)?,
            plan_on_machine_date: row.get(4)?,
            plan_finish_date: row.get(5)?,
            work_days: row.get(6)?,
            mold_work_days: row.get(7)?,
            actual_on_machine_date: row.get(8)?,
            actual_finish_date: row.get(9)?,
            status,
            revision: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }
}
