// ==========================================
// 注塑排产管理系统 - 时间轴批量改写仓储
// ==========================================
// 职责: 平移传播结果的原子落库
// 约定: 被移动条目 + 全部重打包条目在同一事务提交;
//       任何一行失败整体回滚, 数据库保持变更前状态
// 并发: production_schedule 行逐条校验 revision (乐观锁),
//       不匹配即报 OptimisticLockFailure 并回滚
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::machine::MachineStatusWindow;
use crate::domain::schedule::ProductionSchedule;
use crate::domain::types::ScheduleStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// 批量改写记录
// ==========================================

/// 排程窗口改写 (revision 为读取时的修订号)
#[derive(Debug, Clone)]
pub struct ScheduleWindowUpdate {
    pub schedule_id: String,
    pub new_machine_sn: Option<String>,      // 机台改派时携带
    pub new_start: NaiveDateTime,
    pub new_end: NaiveDateTime,
    pub new_status: Option<ScheduleStatus>,  // 取消排程时携带
    pub expected_revision: i64,
}

/// 机台状态窗口改写
#[derive(Debug, Clone)]
pub struct StatusWindowUpdate {
    pub status_id: String,
    pub new_start: NaiveDateTime,
    pub new_end: NaiveDateTime,
}

/// 一次传播请求的全部写入
#[derive(Debug, Clone, Default)]
pub struct ShiftBatch {
    pub schedule_insert: Option<ProductionSchedule>,
    pub status_insert: Option<MachineStatusWindow>,
    pub status_delete: Option<String>,
    pub schedule_updates: Vec<ScheduleWindowUpdate>,
    pub status_updates: Vec<StatusWindowUpdate>,
}

impl ShiftBatch {
    /// 写入行数合计 (审计用)
    pub fn touched_rows(&self) -> usize {
        self.schedule_updates.len()
            + self.status_updates.len()
            + self.schedule_insert.is_some() as usize
            + self.status_insert.is_some() as usize
            + self.status_delete.is_some() as usize
    }
}

// ==========================================
// TimelineShiftRepository
// ==========================================

pub struct TimelineShiftRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TimelineShiftRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 共享连接构造 (生产路径; 必须与排程/状态仓储同一连接, 事务才覆盖两表)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 原子应用一个平移批次
    ///
    /// 返回实际改写的行数。事务内任何失败 (含乐观锁冲突) 使整批回滚。
    pub fn apply(&self, batch: &ShiftBatch) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now().naive_utc();
        let mut touched = 0usize;

        if let Some(schedule) = &batch.schedule_insert {
            tx.execute(
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
            touched += 1;
        }

        if let Some(window) = &batch.status_insert {
            tx.execute(
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
            touched += 1;
        }

        if let Some(status_id) = &batch.status_delete {
            let affected = tx.execute(
                "DELETE FROM machine_status WHERE status_id = ?1",
                params![status_id],
            )?;
            if affected == 0 {
                return Err(RepositoryError::NotFound {
                    entity: "MachineStatus".to_string(),
                    id: status_id.clone(),
                });
            }
            touched += affected;
        }

        for update in &batch.schedule_updates {
            let affected = tx.execute(
                r#"
                UPDATE production_schedule
                SET machine_sn = COALESCE(?2, machine_sn),
                    plan_on_machine_date = ?3,
                    plan_finish_date = ?4,
                    status = COALESCE(?5, status),
                    revision = revision + 1,
                    updated_at = ?6
                WHERE schedule_id = ?1 AND revision = ?7
                "#,
                params![
                    update.schedule_id,
                    update.new_machine_sn,
                    update.new_start,
                    update.new_end,
                    update.new_status.map(|s| s.as_str()),
                    now,
                    update.expected_revision,
                ],
            )?;
            if affected == 0 {
                // 区分不存在与乐观锁冲突
                let actual: Option<i64> = tx
                    .query_row(
                        "SELECT revision FROM production_schedule WHERE schedule_id = ?1",
                        params![update.schedule_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                return Err(match actual {
                    Some(actual) => RepositoryError::OptimisticLockFailure {
                        schedule_id: update.schedule_id.clone(),
                        expected: update.expected_revision,
                        actual,
                    },
                    None => RepositoryError::NotFound {
                        entity: "ProductionSchedule".to_string(),
                        id: update.schedule_id.clone(),
                    },
                });
            }
            touched += affected;
        }

        for update in &batch.status_updates {
            let affected = tx.execute(
                r#"
                UPDATE machine_status
                SET plan_start_date = ?2,
                    plan_end_date = ?3,
                    updated_at = ?4
                WHERE status_id = ?1
                "#,
                params![update.status_id, update.new_start, update.new_end, now],
            )?;
            if affected == 0 {
                return Err(RepositoryError::NotFound {
                    entity: "MachineStatus".to_string(),
                    id: update.status_id.clone(),
                });
            }
            touched += affected;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::MachineStatusKind;
    use crate::repository::machine_status_repo::MachineStatusRepository;
    use crate::repository::schedule_repo::ProductionScheduleRepository;
    use chrono::NaiveDate;

    fn dt(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    struct Fixture {
        schedule_repo: ProductionScheduleRepository,
        status_repo: MachineStatusRepository,
        shift_repo: TimelineShiftRepository,
    }

    fn setup() -> Fixture {
        let conn = crate::db::open_shared_connection(":memory:").expect("open");
        Fixture {
            schedule_repo: ProductionScheduleRepository::from_connection(conn.clone())
                .expect("schedule repo"),
            status_repo: MachineStatusRepository::from_connection(conn.clone())
                .expect("status repo"),
            shift_repo: TimelineShiftRepository::from_connection(conn),
        }
    }

    fn schedule(order_no: &str, start_day: u32, finish_day: u32) -> ProductionSchedule {
        ProductionSchedule::new(
            order_no.to_string(),
            "A1".to_string(),
            None,
            dt(start_day, 8),
            dt(finish_day, 8),
            (finish_day - start_day) as i64,
            0,
        )
    }

    #[test]
    fn test_apply_updates_and_bumps_revision() {
        let fx = setup();
        let s = schedule("MO-001", 1, 6);
        fx.schedule_repo.create(&s).expect("create");

        let touched = fx
            .shift_repo
            .apply(&ShiftBatch {
                schedule_updates: vec![ScheduleWindowUpdate {
                    schedule_id: s.schedule_id.clone(),
                    new_machine_sn: None,
                    new_start: dt(3, 8),
                    new_end: dt(8, 8),
                    new_status: None,
                    expected_revision: 0,
                }],
                ..Default::default()
            })
            .expect("apply");
        assert_eq!(touched, 1);

        let found = fx.schedule_repo.get_by_id(&s.schedule_id).expect("get");
        assert_eq!(found.plan_on_machine_date, dt(3, 8));
        assert_eq!(found.plan_finish_date, dt(8, 8));
        assert_eq!(found.revision, 1);
    }

    #[test]
    fn test_revision_mismatch_rolls_back_whole_batch() {
        let fx = setup();
        let s1 = schedule("MO-001", 1, 6);
        let s2 = schedule("MO-002", 6, 10);
        fx.schedule_repo.create(&s1).expect("create");
        fx.schedule_repo.create(&s2).expect("create");

        let err = fx
            .shift_repo
            .apply(&ShiftBatch {
                schedule_updates: vec![
                    ScheduleWindowUpdate {
                        schedule_id: s1.schedule_id.clone(),
                        new_machine_sn: None,
                        new_start: dt(2, 8),
                        new_end: dt(7, 8),
                        new_status: None,
                        expected_revision: 0,
                    },
                    ScheduleWindowUpdate {
                        schedule_id: s2.schedule_id.clone(),
                        new_machine_sn: None,
                        new_start: dt(7, 8),
                        new_end: dt(11, 8),
                        new_status: None,
                        expected_revision: 99, // 过期修订号
                    },
                ],
                ..Default::default()
            })
            .unwrap_err();

        match err {
            RepositoryError::OptimisticLockFailure { expected, actual, .. } => {
                assert_eq!(expected, 99);
                assert_eq!(actual, 0);
            }
            other => panic!("Expected OptimisticLockFailure, got {:?}", other),
        }

        // 第一行的改写必须已随事务回滚
        let found = fx.schedule_repo.get_by_id(&s1.schedule_id).expect("get");
        assert_eq!(found.plan_on_machine_date, dt(1, 8));
        assert_eq!(found.revision, 0);
    }

    #[test]
    fn test_delete_missing_status_rolls_back() {
        let fx = setup();
        let s = schedule("MO-001", 1, 6);
        fx.schedule_repo.create(&s).expect("create");

        let err = fx
            .shift_repo
            .apply(&ShiftBatch {
                status_delete: Some("missing".to_string()),
                schedule_updates: vec![ScheduleWindowUpdate {
                    schedule_id: s.schedule_id.clone(),
                    new_machine_sn: None,
                    new_start: dt(2, 8),
                    new_end: dt(7, 8),
                    new_status: None,
                    expected_revision: 0,
                }],
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));

        let found = fx.schedule_repo.get_by_id(&s.schedule_id).expect("get");
        assert_eq!(found.plan_on_machine_date, dt(1, 8));
    }

    #[test]
    fn test_insert_and_update_mixed_batch() {
        let fx = setup();
        let s = schedule("MO-001", 6, 10);
        fx.schedule_repo.create(&s).expect("create");

        let window = MachineStatusWindow::new(
            "A1".to_string(),
            MachineStatusKind::MoldChange,
            dt(3, 8),
            dt(6, 8),
            None,
        );
        let touched = fx
            .shift_repo
            .apply(&ShiftBatch {
                status_insert: Some(window.clone()),
                schedule_updates: vec![ScheduleWindowUpdate {
                    schedule_id: s.schedule_id.clone(),
                    new_machine_sn: None,
                    new_start: dt(6, 8),
                    new_end: dt(10, 8),
                    new_status: None,
                    expected_revision: 0,
                }],
                ..Default::default()
            })
            .expect("apply");
        assert_eq!(touched, 2);
        assert!(fx
            .status_repo
            .find_by_id(&window.status_id)
            .expect("find")
            .is_some());
    }
}
