// ==========================================
// 冷链运输监控系统 - 运单仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::shipment::{RangePolicy, Shipment};
use crate::domain::types::ShipmentStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ShipmentRepository - 运单仓储
// ==========================================
pub struct ShipmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ShipmentRepository {
    /// 创建新的 ShipmentRepository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
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
    fn map_row(row: &Row) -> rusqlite::Result<Shipment> {
        let status: String = row.get("status")?;
        let temp_min: Option<f64> = row.get("temp_min")?;
        let temp_max: Option<f64> = row.get("temp_max")?;
        let critical_margin: Option<f64> = row.get("critical_margin")?;

        // 策略列整体可空：temp_min/temp_max/critical_margin 同生同灭
        let policy = match (temp_min, temp_max, critical_margin) {
            (Some(min), Some(max), Some(margin)) => Some(RangePolicy {
                temp_min: min,
                temp_max: max,
                humidity_min: row.get("humidity_min")?,
                humidity_max: row.get("humidity_max")?,
                critical_margin: margin,
            }),
            _ => None,
        };

        Ok(Shipment {
            shipment_id: row.get("shipment_id")?,
            order_id: row.get("order_id")?,
            cargo_type: row.get("cargo_type")?,
            origin: row.get("origin")?,
            destination: row.get("destination")?,
            vehicle_code: row.get("vehicle_code")?,
            status: ShipmentStatus::from_str(&status),
            policy,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// 插入运单
    pub fn insert(&self, shipment: &Shipment) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO shipment (
                shipment_id, order_id, cargo_type, origin, destination,
                vehicle_code, status, temp_min, temp_max,
                humidity_min, humidity_max, critical_margin,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                shipment.shipment_id,
                shipment.order_id,
                shipment.cargo_type,
                shipment.origin,
                shipment.destination,
                shipment.vehicle_code,
                shipment.status.to_db_str(),
                shipment.policy.map(|p| p.temp_min),
                shipment.policy.map(|p| p.temp_max),
                shipment.policy.and_then(|p| p.humidity_min),
                shipment.policy.and_then(|p| p.humidity_max),
                shipment.policy.map(|p| p.critical_margin),
                shipment.created_at,
                shipment.updated_at,
            ],
        )?;
        Ok(())
    }

    /// 按 ID 查询运单
    pub fn find_by_id(&self, shipment_id: &str) -> RepositoryResult<Option<Shipment>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT * FROM shipment WHERE shipment_id = ?1",
            params![shipment_id],
            Self::map_row,
        );

        match result {
            Ok(shipment) => Ok(Some(shipment)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 更新运单当前状态（由时间线状态机调用）
    pub fn update_status(
        &self,
        shipment_id: &str,
        status: ShipmentStatus,
        updated_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE shipment SET status = ?2, updated_at = ?3 WHERE shipment_id = ?1",
            params![shipment_id, status.to_db_str(), updated_at],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Shipment".to_string(),
                id: shipment_id.to_string(),
            });
        }
        Ok(())
    }

    /// 更新运单策略（策略缺口修复后写入）
    pub fn update_policy(
        &self,
        shipment_id: &str,
        policy: &RangePolicy,
        updated_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE shipment SET
                temp_min = ?2, temp_max = ?3,
                humidity_min = ?4, humidity_max = ?5,
                critical_margin = ?6, updated_at = ?7
            WHERE shipment_id = ?1
            "#,
            params![
                shipment_id,
                policy.temp_min,
                policy.temp_max,
                policy.humidity_min,
                policy.humidity_max,
                policy.critical_margin,
                updated_at,
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Shipment".to_string(),
                id: shipment_id.to_string(),
            });
        }
        Ok(())
    }

    /// 查询运单列表（分页）
    pub fn list_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<Shipment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM shipment ORDER BY created_at, shipment_id LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit, offset], Self::map_row)?;

        let mut shipments = Vec::new();
        for row in rows {
            shipments.push(row?);
        }
        Ok(shipments)
    }
}
