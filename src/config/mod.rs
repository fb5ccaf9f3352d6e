// ==========================================
// 注塑排产管理系统 - 配置层
// ==========================================

pub mod config_manager;

pub use config_manager::ConfigManager;

/// 配置键全集 (config_kv 表, scope='global')
pub mod config_keys {
    /// 时区偏移 (分钟); 可被环境变量 TIMEZONE_OFFSET_MINUTES 覆盖
    pub const TIMEZONE_OFFSET_MINUTES: &str = "timezone_offset_minutes";
    /// 工作日推算查询视野倍率 (相对 workdays)
    pub const PROJECTION_LOOKAHEAD_MULTIPLIER: &str = "projection_lookahead_multiplier";
    /// 节假日取数视野 (天)
    pub const HOLIDAY_FETCH_HORIZON_DAYS: &str = "holiday_fetch_horizon_days";
}
