// ==========================================
// 冷链运输监控系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体与类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod alert;
pub mod reading;
pub mod shipment;
pub mod timeline;
pub mod types;

// 重导出核心类型
pub use alert::Alert;
pub use reading::{
    ImportRowError, NewReading, RawReadingRecord, Reading, ReadingImportReport,
};
pub use shipment::{NewShipment, RangePolicy, Shipment};
pub use timeline::{AdvanceRequest, TimelineEvent};
pub use types::{
    AlertSeverity, AlertStatus, ClassificationLevel, MetricKind, ReadingSource, ShipmentStatus,
};
