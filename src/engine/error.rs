// ==========================================
// 注塑排产管理系统 - 引擎层错误类型
// ==========================================
// 约定: 所有校验错误在任何写入之前返回; 传播过程绝不部分应用
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 前置校验错误 (写入前拒绝, 400 等价) =====
    #[error("新上机日期与原排程相同")]
    SameAsOriginal,

    #[error("新上机日期早于当前日期: {0}")]
    StartInPast(String),

    #[error("新上机日期为节假日: {0}")]
    StartOnHoliday(String),

    #[error("排程已开工, 不可平移: schedule_id={0}")]
    ScheduleNotMovable(String),

    #[error("机台状态已实际开始, 不可变更: status_id={0}")]
    StatusNotMovable(String),

    #[error("时间窗口无效: {0}")]
    InvalidWindow(String),

    // ===== 推算错误 =====
    /// 节假日密度超过查询视野时显式报错, 禁止静默欠移
    #[error("工作日推算越界: 起点={start}, 需求工作日={workdays}, 查询视野={lookahead_days}天")]
    LookaheadExceeded {
        start: String,
        workdays: i64,
        lookahead_days: i64,
    },

    // ===== 数据访问错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
