// ==========================================
// 注塑排产管理系统 - 节假日历仓储
// ==========================================
// 职责: 管理 calendar 表 (date → {is_holiday, description})
// 说明: 表由 importer 层同步写入, 排产核心只读
// 降级: 未同步时查询返回空列表, 传播器按"无节假日"处理
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::calendar::HolidayEntry;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

pub struct CalendarRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CalendarRepository {
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
            CREATE TABLE IF NOT EXISTS calendar (
              calendar_date TEXT PRIMARY KEY,
              is_holiday INTEGER NOT NULL DEFAULT 0,
              description TEXT,
              synced_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_calendar_holiday
              ON calendar(is_holiday, calendar_date);
            "#,
        )?;
        Ok(())
    }

    /// 批量写入日历条目 (Upsert, 单事务)
    ///
    /// 返回写入条数
    pub fn upsert_many(&self, entries: &[HolidayEntry]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO calendar (calendar_date, is_holiday, description, synced_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(calendar_date) DO UPDATE SET
                    is_holiday = excluded.is_holiday,
                    description = excluded.description,
                    synced_at = excluded.synced_at
                "#,
            )?;
            for entry in entries {
                stmt.execute(params![
                    entry.calendar_date,
                    entry.is_holiday as i64,
                    entry.description,
                    entry.synced_at,
                ])?;
            }
        }
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(entries.len())
    }

    /// 查询某日期 (含) 之后的有序节假日列表
    ///
    /// # 参数
    /// - `from`: 起始日期 (含)
    /// - `horizon_days`: 查询视野 (天), 约束返回窗口
    pub fn find_holidays_from(
        &self,
        from: NaiveDate,
        horizon_days: i64,
    ) -> RepositoryResult<Vec<HolidayEntry>> {
        let to = from + chrono::Duration::days(horizon_days);
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT calendar_date, is_holiday, description, synced_at
            FROM calendar
            WHERE is_holiday = 1 AND calendar_date >= ?1 AND calendar_date < ?2
            ORDER BY calendar_date ASC
            "#,
        )?;

        let rows = stmt
            .query_map(params![from, to], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 查询日期区间内全部日历条目 (含工作日标记, 供前端日历视图)
    pub fn list_in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<HolidayEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT calendar_date, is_holiday, description, synced_at
            FROM calendar
            WHERE calendar_date >= ?1 AND calendar_date <= ?2
            ORDER BY calendar_date ASC
            "#,
        )?;

        let rows = stmt
            .query_map(params![from, to], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 判断单个日期是否为节假日
    pub fn is_holiday(&self, date: NaiveDate) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT is_holiday FROM calendar WHERE calendar_date = ?1",
            params![date],
            |row| row.get::<_, i64>(0),
        );
        match result {
            Ok(v) => Ok(v != 0),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn map_row(row: &rusqlite::Row<'_>) -> SqliteResult<HolidayEntry> {
        Ok(HolidayEntry {
            calendar_date: row.get(0)?,
            is_holiday: row.get::<_, i64>(1)? != 0,
            description: row.get(2)?,
            synced_at: row.get(3)?,
        })
    }
}
