// ==========================================
// 冷链运输监控系统 - 时间线事件领域模型
// ==========================================
// 红线: 只追加；(occurred_at, seq) 全序，seq 按到达顺序打破时间戳平局
// ==========================================

use crate::domain::types::ShipmentStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// TimelineEvent - 运单状态/位置事件
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    // ===== 主键与关联 =====
    pub event_id: String,    // 事件唯一标识（UUID）
    pub shipment_id: String, // 关联运单（FK）

    // ===== 全序 =====
    pub seq: i64, // 运单内序号（严格递增，唯一）

    // ===== 事件内容 =====
    pub status: ShipmentStatus,       // 转入状态
    pub location: String,             // 位置（自由文本或坐标）
    pub occurred_at: DateTime<Utc>,   // 事件时间
    pub reading_id: Option<String>,   // 关联读数（告警触发转移时填写）
    pub note: Option<String>,         // 备注（系统转移携带告警引用）

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
}

// ==========================================
// AdvanceRequest - 状态推进入参
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceRequest {
    pub shipment_id: String,
    pub new_status: ShipmentStatus,
    pub location: String,
    /// 事件时间（None 时取当前时间）
    pub occurred_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}
