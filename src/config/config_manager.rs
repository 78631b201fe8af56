// ==========================================
// 冷链运输监控系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 键约定: policy/{cargo_type} → RangePolicy JSON
// ==========================================

use crate::config::policy_config_trait::PolicyConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::shipment::RangePolicy;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::{Arc, Mutex};

/// 全局默认严重裕度
const DEFAULT_CRITICAL_MARGIN: f64 = 2.0;

// ==========================================
// PolicyConfigEntry - 策略配置 JSON 结构
// ==========================================
// critical_margin 可省略，省略时回退全局默认
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PolicyConfigEntry {
    temp_min: f64,
    temp_max: f64,
    #[serde(default)]
    humidity_min: Option<f64>,
    #[serde(default)]
    humidity_max: Option<f64>,
    #[serde(default)]
    critical_margin: Option<f64>,
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 参数
    /// - key: 配置键
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入配置值（scope_id='global'，upsert 语义）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 写入货物类型默认策略（JSON 序列化存储）
    pub fn set_default_policy(
        &self,
        cargo_type: &str,
        policy: &RangePolicy,
    ) -> Result<(), Box<dyn Error>> {
        let entry = PolicyConfigEntry {
            temp_min: policy.temp_min,
            temp_max: policy.temp_max,
            humidity_min: policy.humidity_min,
            humidity_max: policy.humidity_max,
            critical_margin: Some(policy.critical_margin),
        };
        let key = format!("policy/{}", cargo_type.trim().to_uppercase());
        self.set_config_value(&key, &serde_json::to_string(&entry)?)
    }
}

// ==========================================
// PolicyConfigReader 实现
// ==========================================
#[async_trait]
impl PolicyConfigReader for ConfigManager {
    async fn get_default_policy(
        &self,
        cargo_type: &str,
    ) -> Result<Option<RangePolicy>, Box<dyn Error>> {
        let key = format!("policy/{}", cargo_type.trim().to_uppercase());
        let raw = match self.get_config_value(&key)? {
            Some(v) => v,
            None => return Ok(None),
        };

        let entry: PolicyConfigEntry = serde_json::from_str(&raw)?;
        let critical_margin = match entry.critical_margin {
            Some(m) => m,
            None => self.get_default_critical_margin().await?,
        };

        Ok(Some(RangePolicy {
            temp_min: entry.temp_min,
            temp_max: entry.temp_max,
            humidity_min: entry.humidity_min,
            humidity_max: entry.humidity_max,
            critical_margin,
        }))
    }

    async fn get_default_critical_margin(&self) -> Result<f64, Box<dyn Error>> {
        match self.get_config_value("default_critical_margin")? {
            Some(v) => Ok(v.trim().parse::<f64>()?),
            None => Ok(DEFAULT_CRITICAL_MARGIN),
        }
    }
}
