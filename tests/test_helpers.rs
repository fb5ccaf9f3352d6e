// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库初始化、未来日期生成、基础数据播种
// 说明: 传播器校验"新日期不得在过去", 所以测试日期一律
//       以 今天+30天 为基准偏移生成
// ==========================================
#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use injection_molding_aps::app::AppState;
use injection_molding_aps::domain::calendar::HolidayEntry;
use injection_molding_aps::domain::machine::Machine;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 AppState
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - AppState: 完整装配的应用状态
pub fn create_test_state() -> (NamedTempFile, AppState) {
    injection_molding_aps::logging::init_test();
    let temp_file = NamedTempFile::new().expect("Failed to create temp db");
    let db_path = temp_file.path().to_str().unwrap().to_string();
    let state = AppState::new(db_path).expect("Failed to init AppState");
    (temp_file, state)
}

/// 测试基准日期: 今天 + 30 天 (保证全部计划日期都在未来)
pub fn base_date() -> NaiveDate {
    Utc::now().date_naive() + Duration::days(30)
}

/// 基准日期 + offset 天
pub fn day(offset: i64) -> NaiveDate {
    base_date() + Duration::days(offset)
}

/// 基准日期 + offset 天的 08:00 时点
pub fn at(offset: i64) -> NaiveDateTime {
    day(offset).and_hms_opt(8, 0, 0).unwrap()
}

/// ISO-8601 字符串 (API 请求用)
pub fn iso(instant: NaiveDateTime) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// 播种机台
pub fn seed_machine(state: &AppState, machine_sn: &str, production_area: &str) {
    state
        .machine_repo
        .create(&Machine::new(
            machine_sn.to_string(),
            format!("测试机台{}", machine_sn),
            production_area.to_string(),
            Some(160.0),
        ))
        .expect("Failed to seed machine");
}

/// 播种节假日 (以基准日期偏移表示)
pub fn seed_holidays(state: &AppState, offsets: &[i64]) {
    let entries: Vec<HolidayEntry> = offsets
        .iter()
        .map(|&offset| HolidayEntry::holiday(day(offset), None))
        .collect();
    state
        .calendar_repo
        .upsert_many(&entries)
        .expect("Failed to seed holidays");
}
