// ==========================================
// 冷链运输监控系统 - 设备日志导入器
// ==========================================
// 职责: 温度记录仪导出文件 → 字段映射 → 逐行提交入库引擎
// 说明: 入库幂等键保证重复导入同一文件安全（重传计入 duplicate_rows）
// ==========================================

use crate::config::PolicyConfigReader;
use crate::domain::reading::{
    ImportRowError, NewReading, RawReadingRecord, ReadingImportReport,
};
use crate::domain::types::ReadingSource;
use crate::engine::ingestor::ReadingIngestor;
use crate::importer::error::ImportError;
use crate::importer::file_parser::parser_for;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

// ===== 设备导出文件的标准列名 =====
const COL_SHIPMENT_ID: &str = "shipment_id";
const COL_TEMPERATURE: &str = "temperature";
const COL_HUMIDITY: &str = "humidity";
const COL_RECORDED_AT: &str = "recorded_at";
const COL_DEVICE_ID: &str = "device_id";
const COL_NOTES: &str = "notes";

// ==========================================
// DeviceLogImporter - 设备日志导入器
// ==========================================
pub struct DeviceLogImporter<C>
where
    C: PolicyConfigReader,
{
    ingestor: Arc<ReadingIngestor<C>>,
}

impl<C> DeviceLogImporter<C>
where
    C: PolicyConfigReader,
{
    /// 创建新的 DeviceLogImporter 实例
    pub fn new(ingestor: Arc<ReadingIngestor<C>>) -> Self {
        Self { ingestor }
    }

    // ==========================================
    // 字段映射
    // ==========================================

    /// 取可选字符串列（空白视为缺失）
    fn get_opt(row: &HashMap<String, String>, key: &str) -> Option<String> {
        row.get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// 解析可选数值列
    fn parse_opt_f64(
        row: &HashMap<String, String>,
        key: &str,
        row_number: usize,
    ) -> Result<Option<f64>, ImportError> {
        match Self::get_opt(row, key) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<f64>()
                .map(Some)
                .map_err(|e| ImportError::TypeConversionError {
                    row: row_number,
                    field: key.to_string(),
                    message: e.to_string(),
                }),
        }
    }

    /// 解析采样时间（ISO-8601；容忍记录仪常见的无时区格式，按 UTC 处理）
    fn parse_opt_timestamp(
        row: &HashMap<String, String>,
        key: &str,
        row_number: usize,
    ) -> Result<Option<DateTime<Utc>>, ImportError> {
        let Some(raw) = Self::get_opt(row, key) else {
            return Ok(None);
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(Some(dt.with_timezone(&Utc)));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S") {
            return Ok(Some(naive.and_utc()));
        }

        Err(ImportError::TimestampFormatError {
            row: row_number,
            field: key.to_string(),
            value: raw,
        })
    }

    /// 单行映射为中间结构
    fn map_row(
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> Result<RawReadingRecord, ImportError> {
        Ok(RawReadingRecord {
            shipment_id: Self::get_opt(row, COL_SHIPMENT_ID),
            temperature: Self::parse_opt_f64(row, COL_TEMPERATURE, row_number)?,
            humidity: Self::parse_opt_f64(row, COL_HUMIDITY, row_number)?,
            recorded_at: Self::parse_opt_timestamp(row, COL_RECORDED_AT, row_number)?,
            device_id: Self::get_opt(row, COL_DEVICE_ID),
            notes: Self::get_opt(row, COL_NOTES),
            row_number,
        })
    }

    // ==========================================
    // 核心操作
    // ==========================================

    /// 导入设备日志文件
    ///
    /// # 参数
    /// - file_path: 导出文件路径（.csv/.xlsx/.xls）
    /// - default_shipment_id: 文件未带 shipment_id 列时的归属运单
    ///
    /// # 返回
    /// - ReadingImportReport: 逐行结果汇总（新入库/重传去重/拒绝）
    pub async fn import_file(
        &self,
        file_path: &Path,
        default_shipment_id: Option<&str>,
    ) -> Result<ReadingImportReport, ImportError> {
        let parser = parser_for(file_path)?;
        let rows = parser
            .parse_to_raw_records(file_path)
            .map_err(|e| ImportError::FileReadError(e.to_string()))?;

        let batch_id = Uuid::new_v4().to_string();
        let total_rows = rows.len();
        let mut imported_rows = 0usize;
        let mut duplicate_rows = 0usize;
        let mut errors: Vec<ImportRowError> = Vec::new();

        for (idx, row) in rows.iter().enumerate() {
            // 表头占第 1 行，数据行号从 2 起
            let row_number = idx + 2;

            let record = match Self::map_row(row, row_number) {
                Ok(r) => r,
                Err(e) => {
                    errors.push(ImportRowError {
                        row_number,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            // 必填字段检查
            let shipment_id = match record
                .shipment_id
                .as_deref()
                .or(default_shipment_id)
            {
                Some(id) => id.to_string(),
                None => {
                    errors.push(ImportRowError {
                        row_number,
                        message: ImportError::ShipmentIdMissing(row_number).to_string(),
                    });
                    continue;
                }
            };
            let Some(temperature) = record.temperature else {
                errors.push(ImportRowError {
                    row_number,
                    message: format!("温度缺失 (行 {})", row_number),
                });
                continue;
            };

            let input = NewReading {
                shipment_id,
                temperature,
                humidity: record.humidity,
                recorded_at: record.recorded_at,
                source: ReadingSource::Device,
                device_id: record.device_id,
                notes: record.notes,
            };

            match self.ingestor.submit_with_outcome(input).await {
                Ok((_, true)) => duplicate_rows += 1,
                Ok((_, false)) => imported_rows += 1,
                Err(e) => {
                    warn!(row = row_number, error = %e, "读数提交失败，行被拒绝");
                    errors.push(ImportRowError {
                        row_number,
                        message: ImportError::SubmitError {
                            row: row_number,
                            message: e.to_string(),
                        }
                        .to_string(),
                    });
                }
            }
        }

        let report = ReadingImportReport {
            batch_id,
            file_name: file_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string()),
            total_rows,
            imported_rows,
            duplicate_rows,
            rejected_rows: errors.len(),
            errors,
            imported_at: Utc::now(),
        };

        info!(
            batch_id = %report.batch_id,
            total = report.total_rows,
            imported = report.imported_rows,
            duplicate = report.duplicate_rows,
            rejected = report.rejected_rows,
            "设备日志导入完成"
        );

        Ok(report)
    }
}
