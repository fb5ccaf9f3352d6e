// ==========================================
// 注塑排产管理系统 - 节假日历领域模型
// ==========================================
// 数据源: 政府开放数据文件同步 (见 importer 层)
// 排产核心对本表只读
// ==========================================

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// HolidayEntry - 日历条目
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolidayEntry {
    pub calendar_date: NaiveDate,    // 日期 (主键)
    pub is_holiday: bool,            // 是否放假
    pub description: Option<String>, // 节日说明
    pub synced_at: NaiveDateTime,    // 同步时间
}

impl HolidayEntry {
    pub fn holiday(calendar_date: NaiveDate, description: Option<String>) -> Self {
        Self {
            calendar_date,
            is_holiday: true,
            description,
            synced_at: Utc::now().naive_utc(),
        }
    }

    pub fn workday(calendar_date: NaiveDate) -> Self {
        Self {
            calendar_date,
            is_holiday: false,
            description: None,
            synced_at: Utc::now().naive_utc(),
        }
    }
}
