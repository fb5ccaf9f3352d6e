// ==========================================
// 注塑排产管理系统 - 机台与机台状态领域模型
// ==========================================
// 机台状态 = 人工申报的非生产时间窗口 (换模/保养/试模/故障)
// 每个状态窗口归属唯一机台
// ==========================================

use crate::domain::types::MachineStatusKind;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// Machine - 机台
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    pub machine_sn: String,          // 机台编号 (主键)
    pub machine_name: String,        // 机台名称
    pub production_area: String,     // 生产区域
    pub tonnage: Option<f64>,        // 锁模吨位
    pub created_at: NaiveDateTime,   // 创建时间
    pub updated_at: NaiveDateTime,   // 更新时间
}

impl Machine {
    pub fn new(
        machine_sn: String,
        machine_name: String,
        production_area: String,
        tonnage: Option<f64>,
    ) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            machine_sn,
            machine_name,
            production_area,
            tonnage,
            created_at: now,
            updated_at: now,
        }
    }
}

// ==========================================
// MachineStatusWindow - 机台状态窗口
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineStatusWindow {
    pub status_id: String,                       // 状态ID (UUID)
    pub machine_sn: String,                      // 归属机台
    pub kind: MachineStatusKind,                 // 状态类别
    pub plan_start_date: NaiveDateTime,          // 计划开始
    pub plan_end_date: NaiveDateTime,            // 计划结束
    pub actual_start_date: Option<NaiveDateTime>, // 实际开始
    pub actual_end_date: Option<NaiveDateTime>,  // 实际结束
    pub note: Option<String>,                    // 备注
    pub created_at: NaiveDateTime,               // 创建时间
    pub updated_at: NaiveDateTime,               // 更新时间
}

impl MachineStatusWindow {
    pub fn new(
        machine_sn: String,
        kind: MachineStatusKind,
        plan_start_date: NaiveDateTime,
        plan_end_date: NaiveDateTime,
        note: Option<String>,
    ) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            status_id: Uuid::new_v4().to_string(),
            machine_sn,
            kind,
            plan_start_date,
            plan_end_date,
            actual_start_date: None,
            actual_end_date: None,
            note,
            created_at: now,
            updated_at: now,
        }
    }

    /// 是否可被传播器移动 (已实际开始的窗口永不平移)
    pub fn is_movable(&self) -> bool {
        self.actual_start_date.is_none()
    }

    /// 计划窗口时长 (日历时间, 平移时保持不变)
    pub fn plan_duration(&self) -> chrono::Duration {
        self.plan_end_date - self.plan_start_date
    }
}
