// ==========================================
// 冷链运输监控系统 - 运单统计仓储
// ==========================================
// 红线: Repository 不含业务逻辑（增量合并规则在统计引擎）
// 用途: shipment_stats 单行快照的读写，O(1)/读数
// ==========================================

use crate::db::open_sqlite_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

// ==========================================
// ShipmentStatsRow - 统计快照行
// ==========================================
// 与 shipment_stats 表一一对应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentStatsRow {
    pub shipment_id: String,

    // ===== 温度聚合 =====
    pub reading_count: i64,
    pub temp_sum: f64,
    pub temp_min: Option<f64>,
    pub temp_min_at: Option<DateTime<Utc>>, // 平局取最早采样时间
    pub temp_max: Option<f64>,
    pub temp_max_at: Option<DateTime<Utc>>,

    // ===== 湿度聚合（湿度为可选采样值，单独计数）=====
    pub humidity_count: i64,
    pub humidity_sum: f64,

    // ===== 告警读数计数（判级为 WARNING/CRITICAL 的读数）=====
    pub alert_reading_count: i64,

    pub updated_at: DateTime<Utc>,
}

impl ShipmentStatsRow {
    /// 空快照（无读数）
    pub fn empty(shipment_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            shipment_id: shipment_id.to_string(),
            reading_count: 0,
            temp_sum: 0.0,
            temp_min: None,
            temp_min_at: None,
            temp_max: None,
            temp_max_at: None,
            humidity_count: 0,
            humidity_sum: 0.0,
            alert_reading_count: 0,
            updated_at: now,
        }
    }
}

// ==========================================
// StatsRepository - 统计仓储
// ==========================================
pub struct StatsRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StatsRepository {
    /// 创建新的 StatsRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 行映射
    fn map_row(row: &Row) -> rusqlite::Result<ShipmentStatsRow> {
        Ok(ShipmentStatsRow {
            shipment_id: row.get("shipment_id")?,
            reading_count: row.get("reading_count")?,
            temp_sum: row.get("temp_sum")?,
            temp_min: row.get("temp_min")?,
            temp_min_at: row.get("temp_min_at")?,
            temp_max: row.get("temp_max")?,
            temp_max_at: row.get("temp_max_at")?,
            humidity_count: row.get("humidity_count")?,
            humidity_sum: row.get("humidity_sum")?,
            alert_reading_count: row.get("alert_reading_count")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// 读取统计快照
    pub fn fetch(&self, shipment_id: &str) -> RepositoryResult<Option<ShipmentStatsRow>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT * FROM shipment_stats WHERE shipment_id = ?1",
            params![shipment_id],
            Self::map_row,
        );

        match result {
            Ok(row) => Ok(Some(row)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 写入统计快照（upsert 语义）
    pub fn upsert(&self, stats: &ShipmentStatsRow) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO shipment_stats (
                shipment_id, reading_count, temp_sum,
                temp_min, temp_min_at, temp_max, temp_max_at,
                humidity_count, humidity_sum,
                alert_reading_count, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(shipment_id) DO UPDATE SET
                reading_count = excluded.reading_count,
                temp_sum = excluded.temp_sum,
                temp_min = excluded.temp_min,
                temp_min_at = excluded.temp_min_at,
                temp_max = excluded.temp_max,
                temp_max_at = excluded.temp_max_at,
                humidity_count = excluded.humidity_count,
                humidity_sum = excluded.humidity_sum,
                alert_reading_count = excluded.alert_reading_count,
                updated_at = excluded.updated_at
            "#,
            params![
                stats.shipment_id,
                stats.reading_count,
                stats.temp_sum,
                stats.temp_min,
                stats.temp_min_at,
                stats.temp_max,
                stats.temp_max_at,
                stats.humidity_count,
                stats.humidity_sum,
                stats.alert_reading_count,
                stats.updated_at,
            ],
        )?;
        Ok(())
    }

    /// 删除统计快照（仅测试/重建用）
    pub fn delete(&self, shipment_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "DELETE FROM shipment_stats WHERE shipment_id = ?1",
            params![shipment_id],
        )?;
        Ok(())
    }
}
