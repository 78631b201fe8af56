// ==========================================
// 冷链运输监控系统 - 读数领域模型
// ==========================================
// 红线: 读数一经接收不可修改；按 (recorded_at, 入库顺序) 排序，不按插入顺序
// ==========================================

use crate::domain::types::{ClassificationLevel, ReadingSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Reading - 温湿度读数
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    // ===== 主键与关联 =====
    pub reading_id: String,  // 读数唯一标识（UUID）
    pub shipment_id: String, // 关联运单（FK）

    // ===== 采样值 =====
    pub temperature: f64,      // 温度（°C，必填，有限数）
    pub humidity: Option<f64>, // 湿度（%，0-100，可选）

    // ===== 时间与来源 =====
    pub recorded_at: DateTime<Utc>, // 采样时间（设备时间或入库时间）
    pub source: ReadingSource,      // 来源（MANUAL/DEVICE）
    pub device_id: Option<String>,  // 设备标识（设备来源时提供）
    pub notes: Option<String>,      // 备注

    // ===== 派生字段 =====
    pub classification: ClassificationLevel, // 判级结果

    // ===== 审计字段 =====
    pub ingested_at: DateTime<Utc>, // 入库时间
}

impl Reading {
    /// 幂等键：(shipment_id, device_id, recorded_at, temperature, humidity)
    ///
    /// 设备重传同一读数时据此去重，保证至多入库一次。
    pub fn dedup_key(&self) -> (&str, Option<&str>, DateTime<Utc>, f64, Option<f64>) {
        (
            self.shipment_id.as_str(),
            self.device_id.as_deref(),
            self.recorded_at,
            self.temperature,
            self.humidity,
        )
    }
}

// ==========================================
// NewReading - 读数提交入参
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReading {
    pub shipment_id: String,
    pub temperature: f64,
    pub humidity: Option<f64>,
    /// 采样时间（None 时取入库时间；允许晚到的早时间戳）
    pub recorded_at: Option<DateTime<Utc>>,
    pub source: ReadingSource,
    pub device_id: Option<String>,
    pub notes: Option<String>,
}

// ==========================================
// RawReadingRecord - 设备日志导入中间结构体
// ==========================================
// 用途: 导入管道中间产物（文件解析 → 字段映射 → 此结构）
// 生命周期: 仅在导入流程内
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawReadingRecord {
    pub shipment_id: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub device_id: Option<String>,
    pub notes: Option<String>,

    // 元信息
    pub row_number: usize, // 原始文件行号（用于导入报告）
}

// ==========================================
// ImportRowError - 导入行错误
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRowError {
    pub row_number: usize,
    pub message: String,
}

// ==========================================
// ReadingImportReport - 设备日志导入报告
// ==========================================
// 用途: 导入接口返回值（逐行结果汇总）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingImportReport {
    pub batch_id: String,             // 批次 ID（UUID）
    pub file_name: Option<String>,    // 源文件名
    pub total_rows: usize,            // 总行数
    pub imported_rows: usize,         // 新入库行数
    pub duplicate_rows: usize,        // 幂等去重行数（重传）
    pub rejected_rows: usize,         // 拒绝行数
    pub errors: Vec<ImportRowError>,  // 拒绝明细
    pub imported_at: DateTime<Utc>,   // 导入时间
}
