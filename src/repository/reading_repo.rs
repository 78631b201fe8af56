// ==========================================
// 冷链运输监控系统 - 读数仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 排序: 所有列表按 (recorded_at, rowid)，晚到的早时间戳读数落在正确位置
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::reading::Reading;
use crate::domain::types::{ClassificationLevel, ReadingSource};
use chrono::{DateTime, Utc};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ReadingRepository - 读数仓储
// ==========================================
pub struct ReadingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReadingRepository {
    /// 创建新的 ReadingRepository 实例
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
    fn map_row(row: &Row) -> rusqlite::Result<Reading> {
        let source: String = row.get("source")?;
        let classification: String = row.get("classification")?;

        Ok(Reading {
            reading_id: row.get("reading_id")?,
            shipment_id: row.get("shipment_id")?,
            temperature: row.get("temperature")?,
            humidity: row.get("humidity")?,
            recorded_at: row.get("recorded_at")?,
            source: ReadingSource::from_str(&source),
            device_id: row.get("device_id")?,
            notes: row.get("notes")?,
            classification: ClassificationLevel::from_str(&classification),
            ingested_at: row.get("ingested_at")?,
        })
    }

    /// 插入读数
    pub fn insert(&self, reading: &Reading) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO reading (
                reading_id, shipment_id, temperature, humidity,
                recorded_at, source, device_id, notes,
                classification, ingested_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                reading.reading_id,
                reading.shipment_id,
                reading.temperature,
                reading.humidity,
                reading.recorded_at,
                reading.source.to_db_str(),
                reading.device_id,
                reading.notes,
                reading.classification.to_db_str(),
                reading.ingested_at,
            ],
        )?;
        Ok(())
    }

    /// 幂等查重：按 (shipment_id, device_id, recorded_at, temperature, humidity) 精确匹配
    ///
    /// # 说明
    /// - device_id/humidity 可为 NULL，比较使用 IS 语义
    /// - 命中时返回已存在读数，入库层据此实现 at-most-once
    pub fn find_duplicate(
        &self,
        shipment_id: &str,
        device_id: Option<&str>,
        recorded_at: DateTime<Utc>,
        temperature: f64,
        humidity: Option<f64>,
    ) -> RepositoryResult<Option<Reading>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            r#"
            SELECT * FROM reading
            WHERE shipment_id = ?1
              AND device_id IS ?2
              AND recorded_at = ?3
              AND temperature = ?4
              AND humidity IS ?5
            LIMIT 1
            "#,
            params![shipment_id, device_id, recorded_at, temperature, humidity],
            Self::map_row,
        );

        match result {
            Ok(reading) => Ok(Some(reading)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按 ID 查询读数
    pub fn find_by_id(&self, reading_id: &str) -> RepositoryResult<Option<Reading>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT * FROM reading WHERE reading_id = ?1",
            params![reading_id],
            Self::map_row,
        );

        match result {
            Ok(reading) => Ok(Some(reading)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 分页查询运单读数（时间序）
    ///
    /// # 参数
    /// - page: 页码（从 1 开始）
    /// - page_size: 每页条数
    pub fn list_paged(
        &self,
        shipment_id: &str,
        page: i64,
        page_size: i64,
    ) -> RepositoryResult<Vec<Reading>> {
        let offset = (page - 1) * page_size;
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM reading
            WHERE shipment_id = ?1
            ORDER BY recorded_at, rowid
            LIMIT ?2 OFFSET ?3
            "#,
        )?;
        let rows = stmt.query_map(params![shipment_id, page_size, offset], Self::map_row)?;

        let mut readings = Vec::new();
        for row in rows {
            readings.push(row?);
        }
        Ok(readings)
    }

    /// 统计运单读数总条数
    pub fn count_for(&self, shipment_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM reading WHERE shipment_id = ?1",
            params![shipment_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 查询时间窗口内的读数（闭区间，时间序）
    pub fn list_window(
        &self,
        shipment_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> RepositoryResult<Vec<Reading>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM reading
            WHERE shipment_id = ?1
              AND (?2 IS NULL OR recorded_at >= ?2)
              AND (?3 IS NULL OR recorded_at <= ?3)
            ORDER BY recorded_at, rowid
            "#,
        )?;
        let rows = stmt.query_map(params![shipment_id, from, to], Self::map_row)?;

        let mut readings = Vec::new();
        for row in rows {
            readings.push(row?);
        }
        Ok(readings)
    }

    /// 查询待补分类读数（策略缺失期间入库）
    pub fn list_unclassified(&self, shipment_id: &str) -> RepositoryResult<Vec<Reading>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM reading
            WHERE shipment_id = ?1 AND classification = 'UNCLASSIFIED'
            ORDER BY recorded_at, rowid
            "#,
        )?;
        let rows = stmt.query_map(params![shipment_id], Self::map_row)?;

        let mut readings = Vec::new();
        for row in rows {
            readings.push(row?);
        }
        Ok(readings)
    }

    /// 更新读数判级（仅用于待补分类流程，不改采样值）
    pub fn update_classification(
        &self,
        reading_id: &str,
        classification: ClassificationLevel,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE reading SET classification = ?2 WHERE reading_id = ?1",
            params![reading_id, classification.to_db_str()],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Reading".to_string(),
                id: reading_id.to_string(),
            });
        }
        Ok(())
    }
}
