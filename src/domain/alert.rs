// ==========================================
// 冷链运输监控系统 - 告警领域模型
// ==========================================
// 红线: 每运单每指标至多一条打开告警；同档重复越界合并不新建
// 红线: 升级为原告警就地升级（同一 alert_id），不是新告警
// ==========================================

use crate::domain::types::{AlertSeverity, AlertStatus, MetricKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Alert - 越界告警
// ==========================================
// 一条告警覆盖一段出区间区期：打开 → (合并/升级)* → 解除
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    // ===== 主键与关联 =====
    pub alert_id: String,    // 告警唯一标识（UUID）
    pub shipment_id: String, // 关联运单（FK）
    pub metric: MetricKind,  // 触发指标（温度/湿度独立序列）

    // ===== 当前严重度与状态 =====
    pub severity: AlertSeverity, // 当前严重度（升级只升不降）
    pub status: AlertStatus,     // OPEN / RESOLVED

    // ===== 打开信息 =====
    pub opened_reading_id: String,     // 触发读数
    pub opened_at: DateTime<Utc>,      // 触发读数采样时间

    // ===== 持续信息（合并重传/连续越界时推进）=====
    pub last_seen_reading_id: String,  // 最近越界读数
    pub last_seen_at: DateTime<Utc>,   // 最近越界读数采样时间

    // ===== 升级信息 =====
    pub escalated_at: Option<DateTime<Utc>>, // WARNING→CRITICAL 升级时间

    // ===== 解除信息 =====
    pub resolved_reading_id: Option<String>, // 解除读数（回到区间内）
    pub resolved_at: Option<DateTime<Utc>>,  // 解除读数采样时间
    pub resolution_note: Option<String>,     // 解除备注

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Alert {
    /// 是否仍处于打开状态
    pub fn is_open(&self) -> bool {
        self.status == AlertStatus::Open
    }
}
