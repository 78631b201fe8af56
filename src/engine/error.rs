// ==========================================
// 冷链运输监控系统 - 引擎层错误类型
// ==========================================
// 职责: 定义监控引擎错误分类
// 红线: 任何拒绝必须返回类型化错误，不允许静默吞掉
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::types::ShipmentStatus;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 输入错误（调用方修正后可重试）=====
    #[error("无效读数: {0}")]
    InvalidReading(String),

    #[error("无效策略: {0}")]
    InvalidPolicy(String),

    // ===== 配置缺口（暴露给运维，不自动重试）=====
    #[error("策略未找到: cargo_type={cargo_type}")]
    PolicyNotFound { cargo_type: String },

    #[error("配置读取失败: {0}")]
    Configuration(String),

    // ===== 状态机错误（逻辑错误，直接返回调用方）=====
    #[error("非法状态转移: from={from} to={to}")]
    IllegalTransition {
        from: ShipmentStatus,
        to: ShipmentStatus,
    },

    #[error("运单已终止: shipment_id={shipment_id}")]
    ShipmentTerminal { shipment_id: String },

    #[error("运单不存在: shipment_id={shipment_id}")]
    ShipmentNotFound { shipment_id: String },

    // ===== 持久化超时（瞬时错误，幂等键保证重试安全）=====
    #[error("持久化超时: {0}")]
    PersistenceTimeout(String),

    // ===== 通用错误 =====
    #[error("仓储错误: {0}")]
    Repository(RepositoryError),

    #[error("内部错误: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<RepositoryError>
// 目的: busy_timeout 到期统一上浮为 PersistenceTimeout
impl From<RepositoryError> for EngineError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Timeout(msg) => EngineError::PersistenceTimeout(msg),
            other => EngineError::Repository(other),
        }
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
