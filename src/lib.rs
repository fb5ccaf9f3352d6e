// ==========================================
// 注塑排产管理系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 工厂排产后端 (智慧排程 / 平移传播核心)
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 排产核心算法
pub mod engine;

// 导入层 - 外部数据 (节假日历)
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 依赖装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{MachineStatusKind, ScheduleStatus, ShiftDirection, TimelineKind};

// 领域实体
pub use domain::{ActionLog, ActionType, HolidayEntry, Machine, MachineStatusWindow, ProductionSchedule};

// 引擎
pub use engine::{
    HolidayCalendar, PropagationOutcome, RepackedEntry, ShiftPropagator, TimelineEntry,
    TimelineFetcher, WorkdayProjector,
};

// API
pub use api::{CalendarApi, MachineStatusApi, ScheduleApi, SmartScheduleApi};

// 应用
pub use app::{get_default_db_path, AppState};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "注塑排产管理系统";
