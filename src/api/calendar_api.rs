// ==========================================
// 注塑排产管理系统 - 节假日历 API
// ==========================================
// 职责: 节假日历的文件同步入口与查询
// ==========================================

use std::path::Path;
use std::sync::Arc;

use rust_i18n::t;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::importer::CalendarImporter;
use crate::repository::{ActionLogRepository, CalendarRepository};
use chrono::NaiveDate;

// ==========================================
// DTO 定义
// ==========================================

/// 日历条目 DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolidayDto {
    pub date: String, // YYYY-MM-DD
    pub is_holiday: bool,
    pub description: Option<String>,
}

/// 导入响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportCalendarResponse {
    pub success: bool,
    pub message: String,
    pub imported: usize,
    pub skipped: usize,
}

// ==========================================
// CalendarApi
// ==========================================

pub struct CalendarApi {
    calendar_repo: Arc<CalendarRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    importer: CalendarImporter,
}

impl CalendarApi {
    pub fn new(
        calendar_repo: Arc<CalendarRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        let importer = CalendarImporter::new(calendar_repo.clone());
        Self {
            calendar_repo,
            action_log_repo,
            importer,
        }
    }

    /// 从节假日文件同步日历 (CSV / JSON)
    pub fn import_holidays(&self, file_path: &str, operator: &str) -> ApiResult<ImportCalendarResponse> {
        let summary = self.importer.import_file(Path::new(file_path))?;

        let log = ActionLog::new(ActionType::ImportCalendar, operator.to_string())
            .with_payload(&summary)
            .with_detail(file_path.to_string());
        if let Err(e) = self.action_log_repo.create(&log) {
            tracing::warn!("操作日志写入失败(不阻断主操作): {}", e);
        }

        Ok(ImportCalendarResponse {
            success: true,
            message: t!("calendar.import_success").to_string(),
            imported: summary.imported,
            skipped: summary.skipped,
        })
    }

    /// 查询日期区间内的日历条目
    pub fn list_holidays(&self, date_from: &str, date_to: &str) -> ApiResult<Vec<HolidayDto>> {
        let from = parse_date(date_from)?;
        let to = parse_date(date_to)?;
        Ok(self
            .calendar_repo
            .list_in_range(from, to)?
            .into_iter()
            .map(|entry| HolidayDto {
                date: entry.calendar_date.format("%Y-%m-%d").to_string(),
                is_holiday: entry.is_holiday,
                description: entry.description,
            })
            .collect())
    }
}

fn parse_date(raw: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::InvalidInput(format!("日期格式错误 (期望 YYYY-MM-DD): {}", raw)))
}
