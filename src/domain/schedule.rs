// ==========================================
// 注塑排产管理系统 - 生产排程领域模型
// ==========================================
// 不变量: 同一机台上所有非 CANCEL 排程窗口与机台状态窗口两两不重叠
// (由平移传播器维护, 数据库层不强制)
// ==========================================

use crate::domain::types::ScheduleStatus;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// ProductionSchedule - 生产排程 (工单)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionSchedule {
    pub schedule_id: String,                        // 排程ID (UUID)
    pub order_no: String,                           // 制令单号
    pub machine_sn: String,                         // 机台编号 (可改派)
    pub product_name: Option<String>,               // 产品名称
    pub plan_on_machine_date: NaiveDateTime,        // 计划上机时间
    pub plan_finish_date: NaiveDateTime,            // 计划完工时间 (工作日推算)
    pub work_days: i64,                             // 生产工作天数
    pub mold_work_days: i64,                        // 上下模工作天数
    pub actual_on_machine_date: Option<NaiveDateTime>, // 实际上机时间
    pub actual_finish_date: Option<NaiveDateTime>,  // 实际完工时间
    pub status: ScheduleStatus,                     // 生命周期状态
    pub revision: i64,                              // 乐观锁修订号
    pub created_at: NaiveDateTime,                  // 创建时间
    pub updated_at: NaiveDateTime,                  // 更新时间
}

impl ProductionSchedule {
    /// 创建新排程 (自动生成 UUID 与时间戳; 完工时间由调用方经工作日推算器给出)
    pub fn new(
        order_no: String,
        machine_sn: String,
        product_name: Option<String>,
        plan_on_machine_date: NaiveDateTime,
        plan_finish_date: NaiveDateTime,
        work_days: i64,
        mold_work_days: i64,
    ) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            schedule_id: Uuid::new_v4().to_string(),
            order_no,
            machine_sn,
            product_name,
            plan_on_machine_date,
            plan_finish_date,
            work_days,
            mold_work_days,
            actual_on_machine_date: None,
            actual_finish_date: None,
            status: ScheduleStatus::NotYet,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// 排程占用的总工作天数 (生产 + 上下模)
    pub fn total_work_days(&self) -> i64 {
        self.work_days + self.mold_work_days
    }

    /// 是否可被传播器移动
    pub fn is_movable(&self) -> bool {
        self.status.is_movable() && self.actual_on_machine_date.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_new_schedule_defaults() {
        let s = ProductionSchedule::new(
            "MO-2025-001".to_string(),
            "A1".to_string(),
            Some("外壳-上盖".to_string()),
            dt(2025, 3, 1),
            dt(2025, 3, 8),
            5,
            2,
        );
        assert_eq!(s.status, ScheduleStatus::NotYet);
        assert_eq!(s.total_work_days(), 7);
        assert_eq!(s.revision, 0);
        assert!(s.is_movable());
    }

    #[test]
    fn test_started_schedule_not_movable() {
        let mut s = ProductionSchedule::new(
            "MO-2025-002".to_string(),
            "A1".to_string(),
            None,
            dt(2025, 3, 1),
            dt(2025, 3, 6),
            5,
            0,
        );
        s.actual_on_machine_date = Some(dt(2025, 3, 1));
        s.status = ScheduleStatus::OnGoing;
        assert!(!s.is_movable());
    }
}
