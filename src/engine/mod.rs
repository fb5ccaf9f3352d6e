// ==========================================
// 注塑排产管理系统 - 引擎层
// ==========================================
// 职责: 排产核心算法 (节假日查询/工作日推算/时间轴读取/平移传播)
// 红线: 所有前置校验在写入之前; 传播绝不部分应用
// ==========================================

pub mod error;
pub mod holiday;
pub mod projector;
pub mod propagator;
pub mod timeline;

// 重导出核心引擎
pub use error::{EngineError, EngineResult};
pub use holiday::HolidayCalendar;
pub use projector::WorkdayProjector;
pub use propagator::{PropagationOutcome, RepackedEntry, ShiftPropagator};
pub use timeline::{TimelineEntry, TimelineFetcher};
