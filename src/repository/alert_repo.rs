// ==========================================
// 冷链运输监控系统 - 告警仓储
// ==========================================
// 红线: Repository 不含业务逻辑（打开/合并/升级/解除规则在分类引擎）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::alert::Alert;
use crate::domain::types::{AlertSeverity, AlertStatus, MetricKind};
use chrono::{DateTime, Utc};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// AlertRepository - 告警仓储
// ==========================================
pub struct AlertRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AlertRepository {
    /// 创建新的 AlertRepository 实例
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
    fn map_row(row: &Row) -> rusqlite::Result<Alert> {
        let metric: String = row.get("metric")?;
        let severity: String = row.get("severity")?;
        let status: String = row.get("status")?;

        Ok(Alert {
            alert_id: row.get("alert_id")?,
            shipment_id: row.get("shipment_id")?,
            metric: MetricKind::from_str(&metric),
            severity: AlertSeverity::from_str(&severity),
            status: AlertStatus::from_str(&status),
            opened_reading_id: row.get("opened_reading_id")?,
            opened_at: row.get("opened_at")?,
            last_seen_reading_id: row.get("last_seen_reading_id")?,
            last_seen_at: row.get("last_seen_at")?,
            escalated_at: row.get("escalated_at")?,
            resolved_reading_id: row.get("resolved_reading_id")?,
            resolved_at: row.get("resolved_at")?,
            resolution_note: row.get("resolution_note")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// 插入告警
    pub fn insert(&self, alert: &Alert) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO alert (
                alert_id, shipment_id, metric, severity, status,
                opened_reading_id, opened_at,
                last_seen_reading_id, last_seen_at,
                escalated_at, resolved_reading_id, resolved_at, resolution_note,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                alert.alert_id,
                alert.shipment_id,
                alert.metric.to_db_str(),
                alert.severity.to_db_str(),
                alert.status.to_db_str(),
                alert.opened_reading_id,
                alert.opened_at,
                alert.last_seen_reading_id,
                alert.last_seen_at,
                alert.escalated_at,
                alert.resolved_reading_id,
                alert.resolved_at,
                alert.resolution_note,
                alert.created_at,
                alert.updated_at,
            ],
        )?;
        Ok(())
    }

    /// 按 ID 查询告警
    pub fn find_by_id(&self, alert_id: &str) -> RepositoryResult<Option<Alert>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT * FROM alert WHERE alert_id = ?1",
            params![alert_id],
            Self::map_row,
        );

        match result {
            Ok(alert) => Ok(Some(alert)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询运单某指标的打开告警（业务不变量: 至多一条）
    pub fn find_open(
        &self,
        shipment_id: &str,
        metric: MetricKind,
    ) -> RepositoryResult<Option<Alert>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            r#"
            SELECT * FROM alert
            WHERE shipment_id = ?1 AND metric = ?2 AND status = 'OPEN'
            ORDER BY opened_at
            LIMIT 1
            "#,
            params![shipment_id, metric.to_db_str()],
            Self::map_row,
        );

        match result {
            Ok(alert) => Ok(Some(alert)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询运单全部打开告警
    pub fn list_open_by_shipment(&self, shipment_id: &str) -> RepositoryResult<Vec<Alert>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM alert
            WHERE shipment_id = ?1 AND status = 'OPEN'
            ORDER BY opened_at, alert_id
            "#,
        )?;
        let rows = stmt.query_map(params![shipment_id], Self::map_row)?;

        let mut alerts = Vec::new();
        for row in rows {
            alerts.push(row?);
        }
        Ok(alerts)
    }

    /// 查询全局打开告警（跨运单监控视图）
    pub fn list_open_all(&self) -> RepositoryResult<Vec<Alert>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM alert
            WHERE status = 'OPEN'
            ORDER BY opened_at, alert_id
            "#,
        )?;
        let rows = stmt.query_map([], Self::map_row)?;

        let mut alerts = Vec::new();
        for row in rows {
            alerts.push(row?);
        }
        Ok(alerts)
    }

    /// 查询运单全部告警（含已解除，时间序）
    pub fn list_by_shipment(&self, shipment_id: &str) -> RepositoryResult<Vec<Alert>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM alert
            WHERE shipment_id = ?1
            ORDER BY opened_at, alert_id
            "#,
        )?;
        let rows = stmt.query_map(params![shipment_id], Self::map_row)?;

        let mut alerts = Vec::new();
        for row in rows {
            alerts.push(row?);
        }
        Ok(alerts)
    }

    /// 推进最近越界读数（同档越界合并，不新建告警）
    pub fn touch_last_seen(
        &self,
        alert_id: &str,
        reading_id: &str,
        last_seen_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE alert SET
                last_seen_reading_id = ?2, last_seen_at = ?3, updated_at = ?4
            WHERE alert_id = ?1 AND status = 'OPEN'
            "#,
            params![alert_id, reading_id, last_seen_at, updated_at],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Alert".to_string(),
                id: alert_id.to_string(),
            });
        }
        Ok(())
    }

    /// 就地升级 WARNING → CRITICAL（同一告警身份）
    pub fn escalate(
        &self,
        alert_id: &str,
        reading_id: &str,
        escalated_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE alert SET
                severity = 'CRITICAL',
                escalated_at = ?3,
                last_seen_reading_id = ?2, last_seen_at = ?3,
                updated_at = ?4
            WHERE alert_id = ?1 AND status = 'OPEN'
            "#,
            params![alert_id, reading_id, escalated_at, updated_at],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Alert".to_string(),
                id: alert_id.to_string(),
            });
        }
        Ok(())
    }

    /// 解除告警
    pub fn resolve(
        &self,
        alert_id: &str,
        reading_id: &str,
        resolved_at: DateTime<Utc>,
        resolution_note: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE alert SET
                status = 'RESOLVED',
                resolved_reading_id = ?2, resolved_at = ?3,
                resolution_note = ?4, updated_at = ?5
            WHERE alert_id = ?1 AND status = 'OPEN'
            "#,
            params![alert_id, reading_id, resolved_at, resolution_note, updated_at],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Alert".to_string(),
                id: alert_id.to_string(),
            });
        }
        Ok(())
    }
}
