// ==========================================
// 冷链运输监控系统 - 时间线状态机引擎
// ==========================================
// 职责: 运单状态转移判定 + 时间线追加 + 当前状态维护
// 状态机: CREATED → PROCESSING → PICKED_UP → IN_TRANSIT ⇄ AT_RISK
//         → DELIVERED | CANCELLED
// 红线: 终态后不再接受任何事件；seq 在运单临界区内分配
// ==========================================

use crate::domain::timeline::{AdvanceRequest, TimelineEvent};
use crate::domain::types::ShipmentStatus;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::events::{MonitorEvent, MonitorEventType, OptionalEventPublisher};
use crate::repository::shipment_repo::ShipmentRepository;
use crate::repository::timeline_repo::TimelineRepository;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

// ==========================================
// TimelineEngine - 时间线状态机
// ==========================================
pub struct TimelineEngine {
    shipment_repo: Arc<ShipmentRepository>,
    timeline_repo: Arc<TimelineRepository>,
    events: OptionalEventPublisher,
}

impl TimelineEngine {
    /// 创建新的 TimelineEngine 实例
    pub fn new(
        shipment_repo: Arc<ShipmentRepository>,
        timeline_repo: Arc<TimelineRepository>,
        events: OptionalEventPublisher,
    ) -> Self {
        Self {
            shipment_repo,
            timeline_repo,
            events,
        }
    }

    // ==========================================
    // 转移合法性判定
    // ==========================================

    /// 状态转移是否合法
    ///
    /// # 规则
    /// - 终态后不允许任何转移
    /// - CANCELLED 可从任何非终态进入
    /// - DELIVERED 只能从 PICKED_UP / IN_TRANSIT / AT_RISK 进入
    /// - IN_TRANSIT → IN_TRANSIT 可重复（在途位置更新）
    /// - AT_RISK 只能从 IN_TRANSIT 进入（在途子状态）
    pub fn is_transition_allowed(from: ShipmentStatus, to: ShipmentStatus) -> bool {
        use ShipmentStatus::*;

        if from.is_terminal() {
            return false;
        }
        if to == Cancelled {
            return true;
        }

        matches!(
            (from, to),
            (Created, Processing)
                | (Processing, PickedUp)
                | (PickedUp, InTransit)
                | (PickedUp, Delivered)
                | (InTransit, InTransit)
                | (InTransit, AtRisk)
                | (AtRisk, InTransit)
                | (InTransit, Delivered)
                | (AtRisk, Delivered)
        )
    }

    // ==========================================
    // 核心操作
    // ==========================================

    /// 推进运单状态并追加时间线事件
    ///
    /// # 参数
    /// - request: 推进请求
    /// - reading_id: 关联读数（告警触发的系统转移时填写）
    ///
    /// # 返回
    /// - Ok(TimelineEvent): 新追加的事件（seq 严格递增）
    /// - Err(ShipmentTerminal): 运单已有终态事件
    /// - Err(IllegalTransition): 目标状态不可达
    ///
    /// # 并发
    /// - 调用方必须持有该运单的独占临界区（ShipmentLocks），
    ///   否则 seq 分配可能碰撞
    pub async fn advance(
        &self,
        request: &AdvanceRequest,
        reading_id: Option<&str>,
    ) -> EngineResult<TimelineEvent> {
        let shipment = self
            .shipment_repo
            .find_by_id(&request.shipment_id)?
            .ok_or_else(|| EngineError::ShipmentNotFound {
                shipment_id: request.shipment_id.clone(),
            })?;

        // === 步骤 1: 终态检查 ===
        if shipment.status.is_terminal() || self.timeline_repo.has_terminal(&shipment.shipment_id)? {
            return Err(EngineError::ShipmentTerminal {
                shipment_id: shipment.shipment_id,
            });
        }

        // === 步骤 2: 转移合法性 ===
        if !Self::is_transition_allowed(shipment.status, request.new_status) {
            return Err(EngineError::IllegalTransition {
                from: shipment.status,
                to: request.new_status,
            });
        }

        // === 步骤 3: 分配序号并追加 ===
        let now = Utc::now();
        let seq = self.timeline_repo.next_seq(&shipment.shipment_id)?;
        let event = TimelineEvent {
            event_id: Uuid::new_v4().to_string(),
            shipment_id: shipment.shipment_id.clone(),
            seq,
            status: request.new_status,
            location: request.location.clone(),
            occurred_at: request.occurred_at.unwrap_or(now),
            reading_id: reading_id.map(|s| s.to_string()),
            note: request.note.clone(),
            created_at: now,
        };
        self.timeline_repo.append(&event)?;

        // === 步骤 4: 更新运单当前状态 ===
        self.shipment_repo
            .update_status(&shipment.shipment_id, request.new_status, now)?;

        info!(
            shipment_id = %shipment.shipment_id,
            seq = seq,
            from = %shipment.status,
            to = %request.new_status,
            "运单状态推进"
        );

        // === 步骤 5: 终态事件通知 ===
        if request.new_status.is_terminal() {
            self.events.publish(MonitorEvent::shipment(
                &shipment.shipment_id,
                MonitorEventType::ShipmentTerminal,
                event.occurred_at,
            ));
        } else {
            debug!(
                shipment_id = %shipment.shipment_id,
                status = %request.new_status,
                "非终态转移，不发布终态事件"
            );
        }

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_graph_forward_path() {
        use ShipmentStatus::*;

        assert!(TimelineEngine::is_transition_allowed(Created, Processing));
        assert!(TimelineEngine::is_transition_allowed(Processing, PickedUp));
        assert!(TimelineEngine::is_transition_allowed(PickedUp, InTransit));
        assert!(TimelineEngine::is_transition_allowed(InTransit, InTransit));
        assert!(TimelineEngine::is_transition_allowed(InTransit, Delivered));
        assert!(TimelineEngine::is_transition_allowed(PickedUp, Delivered));
    }

    #[test]
    fn test_transition_graph_risk_substate() {
        use ShipmentStatus::*;

        assert!(TimelineEngine::is_transition_allowed(InTransit, AtRisk));
        assert!(TimelineEngine::is_transition_allowed(AtRisk, InTransit));
        assert!(TimelineEngine::is_transition_allowed(AtRisk, Delivered));

        // AT_RISK 只能从在途进入
        assert!(!TimelineEngine::is_transition_allowed(Created, AtRisk));
        assert!(!TimelineEngine::is_transition_allowed(PickedUp, AtRisk));
    }

    #[test]
    fn test_transition_graph_cancel_from_any_nonterminal() {
        use ShipmentStatus::*;

        for from in [Created, Processing, PickedUp, InTransit, AtRisk] {
            assert!(TimelineEngine::is_transition_allowed(from, Cancelled));
        }
    }

    #[test]
    fn test_transition_graph_terminal_rejects_all() {
        use ShipmentStatus::*;

        for to in [Created, Processing, PickedUp, InTransit, AtRisk, Delivered, Cancelled] {
            assert!(!TimelineEngine::is_transition_allowed(Delivered, to));
            assert!(!TimelineEngine::is_transition_allowed(Cancelled, to));
        }
    }

    #[test]
    fn test_transition_graph_illegal_jumps() {
        use ShipmentStatus::*;

        assert!(!TimelineEngine::is_transition_allowed(Created, InTransit));
        assert!(!TimelineEngine::is_transition_allowed(Created, Delivered));
        assert!(!TimelineEngine::is_transition_allowed(Processing, Delivered));
        assert!(!TimelineEngine::is_transition_allowed(InTransit, PickedUp));
    }
}
