// ==========================================
// 冷链运输监控系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 运单温度监控与状态追踪引擎（独立可测服务）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 设备日志文件
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/schema 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 服务装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AlertSeverity, AlertStatus, ClassificationLevel, MetricKind, ReadingSource, ShipmentStatus,
};

// 领域实体
pub use domain::{
    AdvanceRequest, Alert, NewReading, NewShipment, RangePolicy, Reading, ReadingImportReport,
    Shipment, TimelineEvent,
};

// 引擎
pub use engine::{
    AlertClassifier, ClassifierCore, RangePolicyResolver, ReadingIngestor, ShipmentLocks,
    StatsEngine, StatsSummary, StatsWindow, TimelineEngine,
};

// API
pub use api::{MonitorApi, QueryApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "冷链运输监控系统";

// ==========================================
// 预编译检查
// ==========================================

// 确保编译时所有模块可见
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
