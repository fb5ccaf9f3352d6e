// ==========================================
// 注塑排产管理系统 - API 层
// ==========================================
// 职责: 业务接口 (DTO 请求/响应的服务对象)
// 说明: 不含 HTTP 路由; 外层接线按部署形态另行提供
// ==========================================

pub mod calendar_api;
pub mod error;
pub mod machine_status_api;
pub mod schedule_api;
pub mod smart_schedule_api;

pub use calendar_api::CalendarApi;
pub use error::{ApiError, ApiResult};
pub use machine_status_api::MachineStatusApi;
pub use schedule_api::ScheduleApi;
pub use smart_schedule_api::SmartScheduleApi;

use chrono::{NaiveDate, NaiveDateTime};

/// 解析 ISO-8601 时点字符串
///
/// 接受 "YYYY-MM-DDTHH:MM:SS" / "YYYY-MM-DD HH:MM:SS" / "YYYY-MM-DD"
/// (纯日期按当日 00:00:00 处理)
pub(crate) fn parse_datetime(raw: &str) -> ApiResult<NaiveDateTime> {
    let trimmed = raw.trim();
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }
    Err(ApiError::InvalidInput(format!(
        "日期时间格式错误 (期望 ISO-8601): {}",
        raw
    )))
}
