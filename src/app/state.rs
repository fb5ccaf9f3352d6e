// ==========================================
// 注塑排产管理系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 说明: 全部仓储/引擎/API 显式依赖注入, 共享单一 SQLite 连接
// ==========================================

use std::sync::Arc;

use crate::api::{CalendarApi, MachineStatusApi, ScheduleApi, SmartScheduleApi};
use crate::config::ConfigManager;
use crate::db::open_shared_connection;
use crate::engine::propagator::ShiftPropagator;
use crate::repository::{
    ActionLogRepository, CalendarRepository, MachineRepository, MachineStatusRepository,
    ProductionScheduleRepository, TimelineShiftRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 智慧排程API (工单改排 + 区域时间轴)
    pub smart_schedule_api: Arc<SmartScheduleApi>,

    /// 生产排程API
    pub schedule_api: Arc<ScheduleApi>,

    /// 机台状态API
    pub machine_status_api: Arc<MachineStatusApi>,

    /// 节假日历API
    pub calendar_api: Arc<CalendarApi>,

    /// 机台仓储 (机台主数据维护)
    pub machine_repo: Arc<MachineRepository>,

    /// 日历仓储 (同步工具/测试数据准备)
    pub calendar_repo: Arc<CalendarRepository>,

    /// 操作日志仓储 (审计查询)
    pub action_log_repo: Arc<ActionLogRepository>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会:
    /// 1. 打开共享数据库连接 (统一 PRAGMA)
    /// 2. 初始化所有 Repository (各自 ensure_table)
    /// 3. 初始化传播器与全部 API 实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState, 数据库路径: {}", db_path);

        let conn = open_shared_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;

        // ==========================================
        // Repository 层 (共享连接)
        // ==========================================
        let schedule_repo = Arc::new(
            ProductionScheduleRepository::from_connection(conn.clone())
                .map_err(|e| format!("排程仓储初始化失败: {}", e))?,
        );
        let status_repo = Arc::new(
            MachineStatusRepository::from_connection(conn.clone())
                .map_err(|e| format!("机台状态仓储初始化失败: {}", e))?,
        );
        let calendar_repo = Arc::new(
            CalendarRepository::from_connection(conn.clone())
                .map_err(|e| format!("日历仓储初始化失败: {}", e))?,
        );
        let machine_repo = Arc::new(
            MachineRepository::from_connection(conn.clone())
                .map_err(|e| format!("机台仓储初始化失败: {}", e))?,
        );
        let action_log_repo = Arc::new(
            ActionLogRepository::from_connection(conn.clone())
                .map_err(|e| format!("操作日志仓储初始化失败: {}", e))?,
        );
        let shift_repo = Arc::new(TimelineShiftRepository::from_connection(conn.clone()));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| format!("配置管理器初始化失败: {}", e))?,
        );

        // ==========================================
        // 引擎层
        // ==========================================
        let propagator = Arc::new(ShiftPropagator::new(
            schedule_repo.clone(),
            status_repo.clone(),
            calendar_repo.clone(),
            machine_repo.clone(),
            shift_repo,
            config_manager.clone(),
        ));

        // ==========================================
        // API 层
        // ==========================================
        let smart_schedule_api = Arc::new(SmartScheduleApi::new(
            schedule_repo.clone(),
            status_repo.clone(),
            machine_repo.clone(),
            action_log_repo.clone(),
            propagator.clone(),
        ));
        let schedule_api = Arc::new(ScheduleApi::new(
            schedule_repo,
            action_log_repo.clone(),
            propagator.clone(),
        ));
        let machine_status_api = Arc::new(MachineStatusApi::new(
            status_repo,
            action_log_repo.clone(),
            propagator,
        ));
        let calendar_api = Arc::new(CalendarApi::new(
            calendar_repo.clone(),
            action_log_repo.clone(),
        ));

        tracing::info!("AppState初始化成功");
        Ok(Self {
            db_path,
            smart_schedule_api,
            schedule_api,
            machine_status_api,
            calendar_api,
            machine_repo,
            calendar_repo,
            action_log_repo,
            config_manager,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 INJECTION_APS_DB_PATH > 用户数据目录 > 当前目录回退
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("INJECTION_APS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./injection_molding_aps.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录, 避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("injection-molding-aps-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("injection-molding-aps");
        }

        if let Err(e) = std::fs::create_dir_all(&path) {
            tracing::warn!("数据目录创建失败, 回退当前目录: {}", e);
            path = PathBuf::from(".");
        }
        path = path.join("injection_molding_aps.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_in_memory() {
        let state = AppState::new(":memory:".to_string()).expect("AppState");
        assert_eq!(state.db_path, ":memory:");
    }
}
