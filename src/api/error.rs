// ==========================================
// 冷链运输监控系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换引擎/仓储错误为用户友好的错误消息
// 红线: 可解释性——所有错误信息必须包含显式原因
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效读数: {0}")]
    InvalidReading(String),

    #[error("策略未找到: {0}")]
    PolicyNotFound(String),

    #[error("非法状态转移: from={from} to={to}")]
    IllegalTransition { from: String, to: String },

    #[error("运单已终止: {0}")]
    ShipmentTerminal(String),

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 持久化错误
    // ==========================================
    #[error("持久化超时: {0}")]
    PersistenceTimeout(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("配置错误: {0}")]
    ConfigurationError(String),

    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 EngineError 转换
// 目的: 引擎层错误分类原样上浮，保持调用方可编程处理
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidReading(msg) => ApiError::InvalidReading(msg),
            EngineError::InvalidPolicy(msg) => ApiError::InvalidInput(msg),
            EngineError::PolicyNotFound { cargo_type } => {
                ApiError::PolicyNotFound(format!("cargo_type={}", cargo_type))
            }
            EngineError::Configuration(msg) => ApiError::ConfigurationError(msg),
            EngineError::IllegalTransition { from, to } => ApiError::IllegalTransition {
                from: from.to_string(),
                to: to.to_string(),
            },
            EngineError::ShipmentTerminal { shipment_id } => {
                ApiError::ShipmentTerminal(shipment_id)
            }
            EngineError::ShipmentNotFound { shipment_id } => {
                ApiError::NotFound(format!("Shipment(id={})不存在", shipment_id))
            }
            EngineError::PersistenceTimeout(msg) => ApiError::PersistenceTimeout(msg),
            EngineError::Repository(repo) => repo.into(),
            EngineError::Internal(msg) => ApiError::InternalError(msg),
            EngineError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将仓储层的技术错误转换为用户友好的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::Timeout(msg) => ApiError::PersistenceTimeout(msg),
            RepositoryError::DatabaseTransactionError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::DatabaseError(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::DatabaseError(format!("外键约束违反: {}", msg))
            }
            RepositoryError::ValidationError(msg) => ApiError::InvalidInput(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
