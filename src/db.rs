// ==========================================
// 冷链运输监控系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免“部分模块外键开启/部分不开启”
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 统一建表语句，保证库结构幂等初始化
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
///
/// 持久化是唯一的挂起点，busy_timeout 即写入等待上限，
/// 超时由仓储层转换为 PersistenceTimeout 返回调用方。
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    configure_sqlite_connection_with_timeout(conn, DEFAULT_BUSY_TIMEOUT_MS)
}

/// 配置 SQLite 连接（自定义写入等待上限）
pub fn configure_sqlite_connection_with_timeout(
    conn: &Connection,
    busy_timeout_ms: u64,
) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开 SQLite 连接（自定义写入等待上限）
pub fn open_sqlite_connection_with_timeout(
    db_path: &str,
    busy_timeout_ms: u64,
) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection_with_timeout(&conn, busy_timeout_ms)?;
    Ok(conn)
}

/// 初始化数据库 schema（幂等）
///
/// # 说明
/// - 所有建表使用 CREATE TABLE IF NOT EXISTS，可重复执行
/// - 时间字段统一存储为 ISO-8601 UTC 文本
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- 配置作用域
        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        -- 配置键值表
        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        -- 运单主数据
        -- 红线: 运单不删除，只通过时间线进入终态
        CREATE TABLE IF NOT EXISTS shipment (
            shipment_id TEXT PRIMARY KEY,
            order_id TEXT,
            cargo_type TEXT NOT NULL,
            origin TEXT NOT NULL,
            destination TEXT NOT NULL,
            vehicle_code TEXT,
            status TEXT NOT NULL,
            temp_min REAL,
            temp_max REAL,
            humidity_min REAL,
            humidity_max REAL,
            critical_margin REAL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- 温湿度读数
        -- 红线: 读数一经接收不可修改（classification 除外，见待分类补分类流程）
        CREATE TABLE IF NOT EXISTS reading (
            reading_id TEXT PRIMARY KEY,
            shipment_id TEXT NOT NULL REFERENCES shipment(shipment_id),
            temperature REAL NOT NULL,
            humidity REAL,
            recorded_at TEXT NOT NULL,
            source TEXT NOT NULL,
            device_id TEXT,
            notes TEXT,
            classification TEXT NOT NULL,
            ingested_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_reading_shipment_time
            ON reading(shipment_id, recorded_at);

        -- 设备重传去重（手工读数 device_id 为 NULL，由入库层显式查重）
        CREATE UNIQUE INDEX IF NOT EXISTS idx_reading_dedup
            ON reading(shipment_id, device_id, recorded_at, temperature, humidity)
            WHERE device_id IS NOT NULL;

        -- 告警
        CREATE TABLE IF NOT EXISTS alert (
            alert_id TEXT PRIMARY KEY,
            shipment_id TEXT NOT NULL REFERENCES shipment(shipment_id),
            metric TEXT NOT NULL,
            severity TEXT NOT NULL,
            status TEXT NOT NULL,
            opened_reading_id TEXT NOT NULL,
            opened_at TEXT NOT NULL,
            last_seen_reading_id TEXT NOT NULL,
            last_seen_at TEXT NOT NULL,
            escalated_at TEXT,
            resolved_reading_id TEXT,
            resolved_at TEXT,
            resolution_note TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_alert_shipment_status
            ON alert(shipment_id, status);

        -- 时间线事件
        -- 红线: 只追加，(shipment_id, seq) 全序且严格递增
        CREATE TABLE IF NOT EXISTS timeline_event (
            event_id TEXT PRIMARY KEY,
            shipment_id TEXT NOT NULL REFERENCES shipment(shipment_id),
            seq INTEGER NOT NULL,
            status TEXT NOT NULL,
            location TEXT NOT NULL,
            occurred_at TEXT NOT NULL,
            reading_id TEXT,
            note TEXT,
            created_at TEXT NOT NULL,
            UNIQUE(shipment_id, seq)
        );

        -- 运单统计（增量维护，O(1)/读数）
        CREATE TABLE IF NOT EXISTS shipment_stats (
            shipment_id TEXT PRIMARY KEY REFERENCES shipment(shipment_id),
            reading_count INTEGER NOT NULL DEFAULT 0,
            temp_sum REAL NOT NULL DEFAULT 0,
            temp_min REAL,
            temp_min_at TEXT,
            temp_max REAL,
            temp_max_at TEXT,
            humidity_count INTEGER NOT NULL DEFAULT 0,
            humidity_sum REAL NOT NULL DEFAULT 0,
            alert_reading_count INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}
