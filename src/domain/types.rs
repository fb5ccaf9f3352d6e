// ==========================================
// 注塑排产管理系统 - 领域类型定义
// ==========================================
// 职责: 排程/机台状态的枚举类型与数据库编码
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 排程状态 (Schedule Status)
// ==========================================
// 生命周期: NOT_YET → ON_GOING → DONE
// 旁路终态: PAUSE / CANCEL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    NotYet,  // 未上机
    OnGoing, // 生产中
    Done,    // 完工
    Pause,   // 暂停
    Cancel,  // 取消
}

impl ScheduleStatus {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::NotYet => "NOT_YET",
            ScheduleStatus::OnGoing => "ON_GOING",
            ScheduleStatus::Done => "DONE",
            ScheduleStatus::Pause => "PAUSE",
            ScheduleStatus::Cancel => "CANCEL",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "NOT_YET" => Some(ScheduleStatus::NotYet),
            "ON_GOING" => Some(ScheduleStatus::OnGoing),
            "DONE" => Some(ScheduleStatus::Done),
            "PAUSE" => Some(ScheduleStatus::Pause),
            "CANCEL" => Some(ScheduleStatus::Cancel),
            _ => None,
        }
    }

    /// 是否允许被传播器移动
    ///
    /// 只有尚未上机的排程可被平移; 生产中/完工/暂停/取消均不可动
    pub fn is_movable(&self) -> bool {
        matches!(self, ScheduleStatus::NotYet)
    }

    /// 是否占用机台时间轴
    ///
    /// CANCEL 的排程不再参与非重叠不变量
    pub fn occupies_timeline(&self) -> bool {
        !matches!(self, ScheduleStatus::Cancel)
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 机台状态类别 (Machine Status Kind)
// ==========================================
// 人工申报的非生产时间窗口类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachineStatusKind {
    MoldChange,  // 换模
    Maintenance, // 保养
    Trial,       // 试模
    Breakdown,   // 故障停机
}

impl MachineStatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineStatusKind::MoldChange => "MOLD_CHANGE",
            MachineStatusKind::Maintenance => "MAINTENANCE",
            MachineStatusKind::Trial => "TRIAL",
            MachineStatusKind::Breakdown => "BREAKDOWN",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "MOLD_CHANGE" => Some(MachineStatusKind::MoldChange),
            "MAINTENANCE" => Some(MachineStatusKind::Maintenance),
            "TRIAL" => Some(MachineStatusKind::Trial),
            "BREAKDOWN" => Some(MachineStatusKind::Breakdown),
            _ => None,
        }
    }
}

impl fmt::Display for MachineStatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 平移方向 (Shift Direction)
// ==========================================
// 顺延 = 新窗口晚于旧窗口; 提前 = 新窗口早于旧窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftDirection {
    Postpone, // 顺延 (推后)
    Advance,  // 提前 (拉前)
}

impl ShiftDirection {
    pub fn is_postpone(&self) -> bool {
        matches!(self, ShiftDirection::Postpone)
    }
}

impl fmt::Display for ShiftDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShiftDirection::Postpone => write!(f, "POSTPONE"),
            ShiftDirection::Advance => write!(f, "ADVANCE"),
        }
    }
}

// ==========================================
// 时间轴条目类别 (Timeline Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimelineKind {
    Schedule,      // 生产排程
    MachineStatus, // 机台状态窗口
}

impl fmt::Display for TimelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimelineKind::Schedule => write!(f, "SCHEDULE"),
            TimelineKind::MachineStatus => write!(f, "MACHINE_STATUS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_status_roundtrip() {
        for status in [
            ScheduleStatus::NotYet,
            ScheduleStatus::OnGoing,
            ScheduleStatus::Done,
            ScheduleStatus::Pause,
            ScheduleStatus::Cancel,
        ] {
            assert_eq!(ScheduleStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(ScheduleStatus::from_str("INVALID"), None);
    }

    #[test]
    fn test_movable_and_timeline_rules() {
        assert!(ScheduleStatus::NotYet.is_movable());
        assert!(!ScheduleStatus::OnGoing.is_movable());
        assert!(!ScheduleStatus::Cancel.occupies_timeline());
        assert!(ScheduleStatus::Done.occupies_timeline());
    }

    #[test]
    fn test_machine_status_kind_roundtrip() {
        for kind in [
            MachineStatusKind::MoldChange,
            MachineStatusKind::Maintenance,
            MachineStatusKind::Trial,
            MachineStatusKind::Breakdown,
        ] {
            assert_eq!(MachineStatusKind::from_str(kind.as_str()), Some(kind));
        }
    }
}
