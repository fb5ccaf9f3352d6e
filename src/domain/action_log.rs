// ==========================================
// 注塑排产管理系统 - 操作日志领域模型
// ==========================================
// 用途: 审计追踪 - 每次平移传播操作记录一条
// 写入失败不阻断主操作 (warn 降级)
// ==========================================

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    ChangeWorkOrder,     // 工单改排
    CreateSchedule,      // 创建排程
    CancelSchedule,      // 取消排程
    CreateMachineStatus, // 登记机台状态
    UpdateMachineStatus, // 调整机台状态
    DeleteMachineStatus, // 删除机台状态
    ImportCalendar,      // 导入节假日历
}

impl ActionType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::ChangeWorkOrder => "ChangeWorkOrder",
            ActionType::CreateSchedule => "CreateSchedule",
            ActionType::CancelSchedule => "CancelSchedule",
            ActionType::CreateMachineStatus => "CreateMachineStatus",
            ActionType::UpdateMachineStatus => "UpdateMachineStatus",
            ActionType::DeleteMachineStatus => "DeleteMachineStatus",
            ActionType::ImportCalendar => "ImportCalendar",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ChangeWorkOrder" => Some(ActionType::ChangeWorkOrder),
            "CreateSchedule" => Some(ActionType::CreateSchedule),
            "CancelSchedule" => Some(ActionType::CancelSchedule),
            "CreateMachineStatus" => Some(ActionType::CreateMachineStatus),
            "UpdateMachineStatus" => Some(ActionType::UpdateMachineStatus),
            "DeleteMachineStatus" => Some(ActionType::DeleteMachineStatus),
            "ImportCalendar" => Some(ActionType::ImportCalendar),
            _ => None,
        }
    }
}

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,               // 日志ID (UUID)
    pub action_type: String,             // 操作类型 (存储为字符串)
    pub target_id: Option<String>,       // 目标排程/状态ID
    pub machine_sn: Option<String>,      // 机台编号
    pub actor: String,                   // 操作人
    pub action_ts: NaiveDateTime,        // 操作时间戳
    pub payload_json: Option<JsonValue>, // 操作参数 (JSON)
    pub detail: Option<String>,          // 详细描述
}

impl ActionLog {
    /// 创建新的操作日志
    pub fn new(action_type: ActionType, actor: String) -> Self {
        Self {
            action_id: Uuid::new_v4().to_string(),
            action_type: action_type.as_str().to_string(),
            target_id: None,
            machine_sn: None,
            actor,
            action_ts: Utc::now().naive_utc(),
            payload_json: None,
            detail: None,
        }
    }

    /// 设置目标ID
    pub fn with_target(mut self, target_id: String) -> Self {
        self.target_id = Some(target_id);
        self
    }

    /// 设置机台编号
    pub fn with_machine(mut self, machine_sn: String) -> Self {
        self.machine_sn = Some(machine_sn);
        self
    }

    /// 设置操作负载 (转换为JSON)
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload_json = serde_json::to_value(payload).ok();
        self
    }

    /// 设置详细描述
    pub fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_type_roundtrip() {
        for t in [
            ActionType::ChangeWorkOrder,
            ActionType::CreateSchedule,
            ActionType::CancelSchedule,
            ActionType::CreateMachineStatus,
            ActionType::UpdateMachineStatus,
            ActionType::DeleteMachineStatus,
            ActionType::ImportCalendar,
        ] {
            assert_eq!(ActionType::from_str(t.as_str()), Some(t));
        }
    }

    #[test]
    fn test_builder_chain() {
        let log = ActionLog::new(ActionType::ChangeWorkOrder, "planner01".to_string())
            .with_target("S-001".to_string())
            .with_machine("A1".to_string())
            .with_detail("顺延2天".to_string());
        assert_eq!(log.action_type, "ChangeWorkOrder");
        assert_eq!(log.target_id.as_deref(), Some("S-001"));
        assert_eq!(log.machine_sn.as_deref(), Some("A1"));
    }
}
