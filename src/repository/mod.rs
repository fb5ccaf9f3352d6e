// ==========================================
// 注塑排产管理系统 - 数据仓储层
// ==========================================
// 职责: 数据访问; 各仓储经 from_connection 共享单一 SQLite 连接,
//       跨表事务 (timeline_shift_repo) 才能覆盖全部写入
// ==========================================

pub mod action_log_repo;
pub mod calendar_repo;
pub mod error;
pub mod machine_repo;
pub mod machine_status_repo;
pub mod schedule_repo;
pub mod timeline_shift_repo;

// 重导出常用类型
pub use action_log_repo::ActionLogRepository;
pub use calendar_repo::CalendarRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use machine_repo::MachineRepository;
pub use machine_status_repo::MachineStatusRepository;
pub use schedule_repo::ProductionScheduleRepository;
pub use timeline_shift_repo::{
    ScheduleWindowUpdate, ShiftBatch, StatusWindowUpdate, TimelineShiftRepository,
};
