// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、服务装配、测试数据生成等功能
// ==========================================
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use cold_chain_monitor::app::ServiceState;
use cold_chain_monitor::db;
use cold_chain_monitor::domain::reading::NewReading;
use cold_chain_monitor::domain::shipment::{NewShipment, RangePolicy, Shipment};
use cold_chain_monitor::domain::timeline::AdvanceRequest;
use cold_chain_monitor::domain::types::{ReadingSource, ShipmentStatus};
use cold_chain_monitor::engine::MonitorEventPublisher;
use std::error::Error;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = db::open_sqlite_connection(&db_path)?;
    db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 创建测试服务状态（共享临时库）
pub fn create_test_state() -> (NamedTempFile, ServiceState) {
    let (temp_file, db_path) = create_test_db().expect("创建测试数据库失败");
    let state = ServiceState::new(&db_path).expect("服务初始化失败");
    (temp_file, state)
}

/// 创建测试服务状态（接入事件发布者）
pub fn create_test_state_with_publisher(
    publisher: std::sync::Arc<dyn MonitorEventPublisher>,
) -> (NamedTempFile, ServiceState) {
    let (temp_file, db_path) = create_test_db().expect("创建测试数据库失败");
    let state =
        ServiceState::with_event_publisher(&db_path, publisher).expect("服务初始化失败");
    (temp_file, state)
}

// ==========================================
// 测试数据
// ==========================================

/// 冷冻货物策略: [-20, -18]°C，严重裕度 2°C
pub fn frozen_policy() -> RangePolicy {
    RangePolicy {
        temp_min: -20.0,
        temp_max: -18.0,
        humidity_min: None,
        humidity_max: None,
        critical_margin: 2.0,
    }
}

/// 带湿度界限的冷冻货物策略: 湿度 [30, 60]%
pub fn frozen_policy_with_humidity() -> RangePolicy {
    RangePolicy {
        humidity_min: Some(30.0),
        humidity_max: Some(60.0),
        ..frozen_policy()
    }
}

/// 测试基准时间（确定性时间戳）
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
}

/// 基准时间偏移分钟数
pub fn minutes_after(minutes: i64) -> DateTime<Utc> {
    base_time() + chrono::Duration::minutes(minutes)
}

/// 注册冷冻货物运单（策略覆盖固化）
pub async fn register_frozen_shipment(state: &ServiceState) -> Shipment {
    register_shipment_with_policy(state, Some(frozen_policy())).await
}

/// 注册运单（可选策略覆盖）
pub async fn register_shipment_with_policy(
    state: &ServiceState,
    policy: Option<RangePolicy>,
) -> Shipment {
    state
        .monitor_api
        .register_shipment(NewShipment {
            order_id: Some("ORD-1001".to_string()),
            cargo_type: "FROZEN_FOOD".to_string(),
            origin: "上海冷库".to_string(),
            destination: "北京配送中心".to_string(),
            vehicle_code: Some("冷藏车-03".to_string()),
            policy_override: policy,
        })
        .await
        .expect("运单注册失败")
}

/// 将运单推进到在途状态
pub async fn advance_to_in_transit(state: &ServiceState, shipment_id: &str) {
    for (status, location) in [
        (ShipmentStatus::Processing, "上海冷库"),
        (ShipmentStatus::PickedUp, "上海冷库"),
        (ShipmentStatus::InTransit, "G2 高速"),
    ] {
        state
            .monitor_api
            .advance_shipment(AdvanceRequest {
                shipment_id: shipment_id.to_string(),
                new_status: status,
                location: location.to_string(),
                occurred_at: None,
                note: None,
            })
            .await
            .expect("状态推进失败");
    }
}

/// 设备读数（确定性时间戳：基准时间 + 偏移分钟）
pub fn device_reading(shipment_id: &str, temperature: f64, minutes: i64) -> NewReading {
    NewReading {
        shipment_id: shipment_id.to_string(),
        temperature,
        humidity: None,
        recorded_at: Some(minutes_after(minutes)),
        source: ReadingSource::Device,
        device_id: Some("LOGGER-01".to_string()),
        notes: None,
    }
}

/// 带湿度的设备读数
pub fn device_reading_with_humidity(
    shipment_id: &str,
    temperature: f64,
    humidity: f64,
    minutes: i64,
) -> NewReading {
    NewReading {
        humidity: Some(humidity),
        ..device_reading(shipment_id, temperature, minutes)
    }
}
