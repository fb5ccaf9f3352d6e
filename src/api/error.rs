// ==========================================
// 注塑排产管理系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型, 将仓储/引擎/导入层错误转换为
//       用户可读的业务错误
// 状态码口径: 校验类 400 / 未找到 404 / 其余 500
// ==========================================

use crate::engine::error::EngineError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use rust_i18n::t;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ===== 校验错误 (400 等价, 任何写入前拒绝) =====
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ===== 未找到 (404 等价) =====
    #[error("资源未找到: {0}")]
    NotFound(String),

    // ===== 并发控制错误 =====
    #[error("乐观锁冲突: {0}")]
    OptimisticLockFailure(String),

    // ===== 数据访问错误 =====
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ===== 导入错误 =====
    #[error("文件导入失败: {0}")]
    ImportFailed(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// HTTP 等价状态码
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidInput(_)
            | ApiError::BusinessRuleViolation(_)
            | ApiError::ImportFailed(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::OptimisticLockFailure(_) => 409,
            _ => 500,
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::OptimisticLockFailure {
                schedule_id,
                expected,
                actual,
            } => ApiError::OptimisticLockFailure(format!(
                "排程{}已被其他用户修改（期望revision={}, 实际revision={}）",
                schedule_id, expected, actual
            )),
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// 目的: 把传播器的前置校验结果映射为用户可读消息
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::SameAsOriginal => {
                ApiError::InvalidInput(t!("smart_schedule.same_as_original").to_string())
            }
            EngineError::StartInPast(date) => ApiError::InvalidInput(format!(
                "{}: {}",
                t!("smart_schedule.start_in_past"),
                date
            )),
            EngineError::StartOnHoliday(date) => ApiError::InvalidInput(format!(
                "{}: {}",
                t!("smart_schedule.start_on_holiday"),
                date
            )),
            EngineError::ScheduleNotMovable(_) => {
                ApiError::BusinessRuleViolation(t!("smart_schedule.schedule_started").to_string())
            }
            EngineError::StatusNotMovable(_) => {
                ApiError::BusinessRuleViolation(t!("machine_status.already_started").to_string())
            }
            EngineError::InvalidWindow(msg) => ApiError::InvalidInput(msg),
            err @ EngineError::LookaheadExceeded { .. } => {
                ApiError::BusinessRuleViolation(err.to_string())
            }
            EngineError::Repository(repo_err) => repo_err.into(),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        ApiError::ImportFailed(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_validation_errors_map_to_400() {
        let err: ApiError = EngineError::SameAsOriginal.into();
        assert_eq!(err.status_code(), 400);

        let err: ApiError = EngineError::StartInPast("2020-01-01".to_string()).into();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let err: ApiError = RepositoryError::NotFound {
            entity: "ProductionSchedule".to_string(),
            id: "S-001".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), 404);
        match err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("ProductionSchedule"));
                assert!(msg.contains("S-001"));
            }
            _ => panic!("Expected NotFound"),
        }
    }

    #[test]
    fn test_optimistic_lock_maps_to_409() {
        let err: ApiError = RepositoryError::OptimisticLockFailure {
            schedule_id: "S-001".to_string(),
            expected: 1,
            actual: 2,
        }
        .into();
        assert_eq!(err.status_code(), 409);
    }
}
