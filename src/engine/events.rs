// ==========================================
// 冷链运输监控系统 - 引擎层事件发布
// ==========================================
// 职责: 定义监控事件发布 trait，实现依赖倒置
// 说明: Engine 层定义 trait，通知系统（邮件/短信/UI 推送）在外部实现适配器
// 红线: 核心只发布事件，不直接发送任何通知
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 监控事件类型
// ==========================================

/// 监控事件触发类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorEventType {
    /// 告警打开
    AlertOpened,
    /// 告警升级（WARNING → CRITICAL，同一告警身份）
    AlertEscalated,
    /// 告警解除
    AlertResolved,
    /// 运单进入风险子状态
    ShipmentAtRisk,
    /// 运单脱离风险子状态
    ShipmentRecovered,
    /// 运单进入终态（送达/取消）
    ShipmentTerminal,
}

impl MonitorEventType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            MonitorEventType::AlertOpened => "AlertOpened",
            MonitorEventType::AlertEscalated => "AlertEscalated",
            MonitorEventType::AlertResolved => "AlertResolved",
            MonitorEventType::ShipmentAtRisk => "ShipmentAtRisk",
            MonitorEventType::ShipmentRecovered => "ShipmentRecovered",
            MonitorEventType::ShipmentTerminal => "ShipmentTerminal",
        }
    }
}

/// 监控事件
///
/// Engine 层发布的事件，包含运单 ID、触发类型和关联对象
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorEvent {
    /// 运单 ID
    pub shipment_id: String,
    /// 事件类型
    pub event_type: MonitorEventType,
    /// 关联告警（告警生命周期事件时填写）
    pub alert_id: Option<String>,
    /// 关联读数（由读数触发时填写）
    pub reading_id: Option<String>,
    /// 事件时间
    pub occurred_at: DateTime<Utc>,
}

impl MonitorEvent {
    /// 告警生命周期事件
    pub fn alert(
        shipment_id: &str,
        event_type: MonitorEventType,
        alert_id: &str,
        reading_id: &str,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            shipment_id: shipment_id.to_string(),
            event_type,
            alert_id: Some(alert_id.to_string()),
            reading_id: Some(reading_id.to_string()),
            occurred_at,
        }
    }

    /// 运单状态事件
    pub fn shipment(
        shipment_id: &str,
        event_type: MonitorEventType,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            shipment_id: shipment_id.to_string(),
            event_type,
            alert_id: None,
            reading_id: None,
            occurred_at,
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 监控事件发布者 Trait
///
/// Engine 层定义，通知适配器实现
/// 通过 trait 实现依赖倒置，核心不依赖任何通知渠道
pub trait MonitorEventPublisher: Send + Sync {
    /// 发布监控事件
    ///
    /// # 参数
    /// - `event`: 监控事件
    ///
    /// # 返回
    /// - `Ok(())`: 发布成功
    /// - `Err`: 发布失败（发布失败不阻断主流程，由调用方记录日志）
    fn publish(&self, event: MonitorEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要事件发布的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl MonitorEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: MonitorEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - shipment_id={}, event_type={}",
            event.shipment_id,
            event.event_type.as_str()
        );
        Ok(())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn MonitorEventPublisher>> 的使用
#[derive(Clone)]
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn MonitorEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn MonitorEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例（不发布事件）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者）
    ///
    /// 发布失败只记录日志，不影响主流程
    pub fn publish(&self, event: MonitorEvent) {
        if let Some(publisher) = &self.inner {
            if let Err(e) = publisher.publish(event.clone()) {
                tracing::warn!(
                    "事件发布失败 - shipment_id={}, event_type={}, error={}",
                    event.shipment_id,
                    event.event_type.as_str(),
                    e
                );
            }
        } else {
            tracing::debug!(
                "OptionalEventPublisher: 未配置发布者，跳过事件 - shipment_id={}, event_type={}",
                event.shipment_id,
                event.event_type.as_str()
            );
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_event_alert() {
        let now = Utc::now();
        let event = MonitorEvent::alert("S001", MonitorEventType::AlertOpened, "A001", "R001", now);

        assert_eq!(event.shipment_id, "S001");
        assert_eq!(event.alert_id.as_deref(), Some("A001"));
        assert_eq!(event.reading_id.as_deref(), Some("R001"));
    }

    #[test]
    fn test_monitor_event_shipment() {
        let now = Utc::now();
        let event = MonitorEvent::shipment("S001", MonitorEventType::ShipmentTerminal, now);

        assert_eq!(event.shipment_id, "S001");
        assert!(event.alert_id.is_none());
        assert!(event.reading_id.is_none());
    }

    #[test]
    fn test_noop_publisher() {
        let publisher = NoOpEventPublisher;
        let event = MonitorEvent::shipment("S001", MonitorEventType::ShipmentTerminal, Utc::now());

        assert!(publisher.publish(event).is_ok());
    }

    #[test]
    fn test_optional_publisher_none() {
        let publisher = OptionalEventPublisher::none();
        assert!(!publisher.is_configured());

        // 未配置时发布为空操作
        publisher.publish(MonitorEvent::shipment(
            "S001",
            MonitorEventType::AlertOpened,
            Utc::now(),
        ));
    }

    #[test]
    fn test_optional_publisher_with_noop() {
        let noop = Arc::new(NoOpEventPublisher) as Arc<dyn MonitorEventPublisher>;
        let publisher = OptionalEventPublisher::with_publisher(noop);
        assert!(publisher.is_configured());

        publisher.publish(MonitorEvent::shipment(
            "S001",
            MonitorEventType::ShipmentRecovered,
            Utc::now(),
        ));
    }
}
