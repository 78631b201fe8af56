// ==========================================
// 冷链运输监控系统 - 数据仓储层
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 红线: Repository 不含业务逻辑
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod alert_repo;
pub mod error;
pub mod reading_repo;
pub mod shipment_repo;
pub mod stats_repo;
pub mod timeline_repo;

// 重导出核心仓储
pub use alert_repo::AlertRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use reading_repo::ReadingRepository;
pub use shipment_repo::ShipmentRepository;
pub use stats_repo::{ShipmentStatsRow, StatsRepository};
pub use timeline_repo::TimelineRepository;
