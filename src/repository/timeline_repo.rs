// ==========================================
// 冷链运输监控系统 - 时间线事件仓储
// ==========================================
// 红线: 只追加，(shipment_id, seq) 唯一；转移合法性在时间线引擎判定
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::timeline::TimelineEvent;
use crate::domain::types::ShipmentStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// TimelineRepository - 时间线事件仓储
// ==========================================
pub struct TimelineRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TimelineRepository {
    /// 创建新的 TimelineRepository 实例
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
    fn map_row(row: &Row) -> rusqlite::Result<TimelineEvent> {
        let status: String = row.get("status")?;

        Ok(TimelineEvent {
            event_id: row.get("event_id")?,
            shipment_id: row.get("shipment_id")?,
            seq: row.get("seq")?,
            status: ShipmentStatus::from_str(&status),
            location: row.get("location")?,
            occurred_at: row.get("occurred_at")?,
            reading_id: row.get("reading_id")?,
            note: row.get("note")?,
            created_at: row.get("created_at")?,
        })
    }

    /// 下一个序号（运单内严格递增）
    ///
    /// # 说明
    /// - 调用方必须持有该运单的独占临界区，序号才不会碰撞
    pub fn next_seq(&self, shipment_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let max_seq: i64 = conn.query_row(
            "SELECT COALESCE(MAX(seq), 0) FROM timeline_event WHERE shipment_id = ?1",
            params![shipment_id],
            |row| row.get(0),
        )?;
        Ok(max_seq + 1)
    }

    /// 追加事件
    pub fn append(&self, event: &TimelineEvent) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO timeline_event (
                event_id, shipment_id, seq, status, location,
                occurred_at, reading_id, note, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                event.event_id,
                event.shipment_id,
                event.seq,
                event.status.to_db_str(),
                event.location,
                event.occurred_at,
                event.reading_id,
                event.note,
                event.created_at,
            ],
        )?;
        Ok(())
    }

    /// 查询运单时间线（序号全序）
    pub fn list_by_shipment(&self, shipment_id: &str) -> RepositoryResult<Vec<TimelineEvent>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM timeline_event WHERE shipment_id = ?1 ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![shipment_id], Self::map_row)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    /// 运单是否已有终态事件
    pub fn has_terminal(&self, shipment_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM timeline_event
            WHERE shipment_id = ?1 AND status IN ('DELIVERED', 'CANCELLED')
            "#,
            params![shipment_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
