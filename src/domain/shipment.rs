// ==========================================
// 冷链运输监控系统 - 运单领域模型
// ==========================================
// 红线: 运单状态只能通过时间线状态机变更，运单不删除只终止
// 用途: 注册时解析并固化温湿度策略，引擎层只读
// ==========================================

use crate::domain::types::ShipmentStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// RangePolicy - 温湿度策略
// ==========================================
// 用途: 读数判级依据（区间 + 严重裕度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangePolicy {
    pub temp_min: f64,            // 温度下限（°C）
    pub temp_max: f64,            // 温度上限（°C）
    pub humidity_min: Option<f64>, // 湿度下限（%，可选）
    pub humidity_max: Option<f64>, // 湿度上限（%，可选）
    pub critical_margin: f64,     // 严重裕度（超出区间此幅度以上判为 CRITICAL）
}

impl RangePolicy {
    /// 策略自检：区间方向正确且裕度非负
    pub fn is_valid(&self) -> bool {
        if self.temp_min > self.temp_max || self.critical_margin < 0.0 {
            return false;
        }
        match (self.humidity_min, self.humidity_max) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        }
    }
}

// ==========================================
// Shipment - 运单主数据
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    // ===== 主键 =====
    pub shipment_id: String, // 运单唯一标识（UUID）

    // ===== 基础信息 =====
    pub order_id: Option<String>, // 关联订单号（订单服务侧）
    pub cargo_type: String,       // 货物类型（策略解析键，如 FROZEN_FOOD）
    pub origin: String,           // 起运地
    pub destination: String,      // 目的地
    pub vehicle_code: Option<String>, // 指派车辆

    // ===== 当前状态（时间线状态机派生）=====
    pub status: ShipmentStatus,

    // ===== 固化策略（注册时解析，可被人工覆盖）=====
    // None 表示注册时未能解析且未覆盖，判级时回退配置再查一次
    pub policy: Option<RangePolicy>,

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// NewShipment - 运单注册入参
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShipment {
    pub order_id: Option<String>,
    pub cargo_type: String,
    pub origin: String,
    pub destination: String,
    pub vehicle_code: Option<String>,
    /// 人工覆盖策略（为 None 时按货物类型从配置解析）
    pub policy_override: Option<RangePolicy>,
}
