// ==========================================
// 冷链运输监控系统 - 领域类型定义
// ==========================================
// 红线: 状态机为等级制枚举，序列化统一 SCREAMING_SNAKE_CASE（与数据库一致）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 运单状态 (Shipment Status)
// ==========================================
// 状态机: CREATED → PROCESSING → PICKED_UP → IN_TRANSIT ⇄ AT_RISK
//         → DELIVERED | CANCELLED
// AT_RISK 为在途子状态，由严重告警自动进入，告警解除后回到 IN_TRANSIT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Created,   // 已创建（订单确认）
    Processing, // 处理中（备货/预冷）
    PickedUp,  // 已提货
    InTransit, // 在途
    AtRisk,    // 在途风险（严重告警未解除）
    Delivered, // 已送达（终态）
    Cancelled, // 已取消（终态）
}

impl ShipmentStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, ShipmentStatus::Delivered | ShipmentStatus::Cancelled)
    }

    /// 是否处于在途（含风险子状态）
    pub fn is_in_transit(&self) -> bool {
        matches!(self, ShipmentStatus::InTransit | ShipmentStatus::AtRisk)
    }

    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "CREATED" => ShipmentStatus::Created,
            "PROCESSING" => ShipmentStatus::Processing,
            "PICKED_UP" => ShipmentStatus::PickedUp,
            "IN_TRANSIT" => ShipmentStatus::InTransit,
            "AT_RISK" => ShipmentStatus::AtRisk,
            "DELIVERED" => ShipmentStatus::Delivered,
            "CANCELLED" => ShipmentStatus::Cancelled,
            _ => ShipmentStatus::Created, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Created => "CREATED",
            ShipmentStatus::Processing => "PROCESSING",
            ShipmentStatus::PickedUp => "PICKED_UP",
            ShipmentStatus::InTransit => "IN_TRANSIT",
            ShipmentStatus::AtRisk => "AT_RISK",
            ShipmentStatus::Delivered => "DELIVERED",
            ShipmentStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 读数来源 (Reading Source)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadingSource {
    Manual, // 人工录入
    Device, // IoT 温度记录仪
}

impl ReadingSource {
    /// 从字符串解析来源
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "DEVICE" => ReadingSource::Device,
            _ => ReadingSource::Manual,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ReadingSource::Manual => "MANUAL",
            ReadingSource::Device => "DEVICE",
        }
    }
}

impl fmt::Display for ReadingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 读数判级 (Classification Level)
// ==========================================
// 顺序: Normal < Warning < Critical（用于取两个指标中的较差者）
// UNCLASSIFIED: 策略缺失时入库待补分类，不丢弃读数
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassificationLevel {
    Normal,       // 区间内
    Warning,      // 超出区间但未超严重裕度
    Critical,     // 超出区间且超过严重裕度
    Unclassified, // 策略缺失，待补分类
}

impl ClassificationLevel {
    /// 是否出区间（计入告警读数统计）
    pub fn is_breach(&self) -> bool {
        matches!(
            self,
            ClassificationLevel::Warning | ClassificationLevel::Critical
        )
    }

    /// 从字符串解析判级
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "NORMAL" => ClassificationLevel::Normal,
            "WARNING" => ClassificationLevel::Warning,
            "CRITICAL" => ClassificationLevel::Critical,
            _ => ClassificationLevel::Unclassified,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ClassificationLevel::Normal => "NORMAL",
            ClassificationLevel::Warning => "WARNING",
            ClassificationLevel::Critical => "CRITICAL",
            ClassificationLevel::Unclassified => "UNCLASSIFIED",
        }
    }
}

impl fmt::Display for ClassificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 告警严重度 (Alert Severity)
// ==========================================
// 顺序: Warning < Critical，升级只升不降
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Warning,  // 警告
    Critical, // 严重
}

impl AlertSeverity {
    /// 从字符串解析严重度
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "CRITICAL" => AlertSeverity::Critical,
            _ => AlertSeverity::Warning,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AlertSeverity::Warning => "WARNING",
            AlertSeverity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 告警状态 (Alert Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Open,     // 打开
    Resolved, // 已解除
}

impl AlertStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "RESOLVED" => AlertStatus::Resolved,
            _ => AlertStatus::Open,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AlertStatus::Open => "OPEN",
            AlertStatus::Resolved => "RESOLVED",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 监控指标 (Metric Kind)
// ==========================================
// 温度/湿度各自独立一条告警序列（每运单每指标至多一条打开告警）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricKind {
    Temperature, // 温度（°C）
    Humidity,    // 湿度（%）
}

impl MetricKind {
    /// 从字符串解析指标
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "HUMIDITY" => MetricKind::Humidity,
            _ => MetricKind::Temperature,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            MetricKind::Temperature => "TEMPERATURE",
            MetricKind::Humidity => "HUMIDITY",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}
