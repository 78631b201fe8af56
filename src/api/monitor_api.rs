// ==========================================
// 冷链运输监控系统 - 监控写入 API
// ==========================================
// 职责: 运单注册、读数提交、状态推进、策略补齐
// 说明: 角色鉴权由外部协作方在调用前完成，核心不做权限判断
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::PolicyConfigReader;
use crate::domain::reading::{NewReading, Reading};
use crate::domain::shipment::{NewShipment, RangePolicy, Shipment};
use crate::domain::timeline::{AdvanceRequest, TimelineEvent};
use crate::domain::types::ShipmentStatus;
use crate::engine::ingestor::ReadingIngestor;
use crate::engine::locks::ShipmentLocks;
use crate::engine::policy::RangePolicyResolver;
use crate::engine::timeline::TimelineEngine;
use crate::repository::shipment_repo::ShipmentRepository;
use crate::repository::timeline_repo::TimelineRepository;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

// ==========================================
// MonitorApi - 监控写入 API
// ==========================================
pub struct MonitorApi<C>
where
    C: PolicyConfigReader,
{
    shipment_repo: Arc<ShipmentRepository>,
    timeline_repo: Arc<TimelineRepository>,
    resolver: Arc<RangePolicyResolver<C>>,
    ingestor: Arc<ReadingIngestor<C>>,
    timeline: Arc<TimelineEngine>,
    locks: Arc<ShipmentLocks>,
}

impl<C> MonitorApi<C>
where
    C: PolicyConfigReader,
{
    /// 创建新的 MonitorApi 实例
    pub fn new(
        shipment_repo: Arc<ShipmentRepository>,
        timeline_repo: Arc<TimelineRepository>,
        resolver: Arc<RangePolicyResolver<C>>,
        ingestor: Arc<ReadingIngestor<C>>,
        timeline: Arc<TimelineEngine>,
        locks: Arc<ShipmentLocks>,
    ) -> Self {
        Self {
            shipment_repo,
            timeline_repo,
            resolver,
            ingestor,
            timeline,
            locks,
        }
    }

    // ==========================================
    // 运单注册
    // ==========================================

    /// 注册运单（订单确认时由订单服务调用）
    ///
    /// # 说明
    /// - 策略在注册时解析并固化：覆盖策略优先，否则取货物类型默认策略
    /// - 两者皆无时允许注册（告警判级延迟到策略补齐，读数以 UNCLASSIFIED 入库）
    /// - 时间线以 CREATED 事件起始（seq=1）
    pub async fn register_shipment(&self, input: NewShipment) -> ApiResult<Shipment> {
        if input.cargo_type.trim().is_empty() {
            return Err(ApiError::InvalidInput("货物类型不能为空".to_string()));
        }
        if input.origin.trim().is_empty() || input.destination.trim().is_empty() {
            return Err(ApiError::InvalidInput("起运地/目的地不能为空".to_string()));
        }

        let policy = self
            .resolver
            .resolve_for_registration(&input.cargo_type, input.policy_override)
            .await?;

        if policy.is_none() {
            warn!(
                cargo_type = %input.cargo_type,
                "注册时策略未解析，读数将以 UNCLASSIFIED 入库直至策略补齐"
            );
        }

        let now = Utc::now();
        let shipment = Shipment {
            shipment_id: Uuid::new_v4().to_string(),
            order_id: input.order_id,
            cargo_type: input.cargo_type,
            origin: input.origin,
            destination: input.destination,
            vehicle_code: input.vehicle_code,
            status: ShipmentStatus::Created,
            policy,
            created_at: now,
            updated_at: now,
        };
        self.shipment_repo.insert(&shipment)?;

        // 时间线起始事件
        let event = TimelineEvent {
            event_id: Uuid::new_v4().to_string(),
            shipment_id: shipment.shipment_id.clone(),
            seq: 1,
            status: ShipmentStatus::Created,
            location: shipment.origin.clone(),
            occurred_at: now,
            reading_id: None,
            note: Some("运单注册".to_string()),
            created_at: now,
        };
        self.timeline_repo.append(&event)?;

        info!(
            shipment_id = %shipment.shipment_id,
            cargo_type = %shipment.cargo_type,
            has_policy = shipment.policy.is_some(),
            "运单注册完成"
        );

        Ok(shipment)
    }

    // ==========================================
    // 读数提交
    // ==========================================

    /// 提交读数（人工录入或 IoT 设备）
    ///
    /// # 返回
    /// - Ok(Reading): 已接收读数（含同步判级结果）
    /// - Err: 类型化拒绝原因（无效读数/运单终止/持久化超时等）
    pub async fn submit_reading(&self, input: NewReading) -> ApiResult<Reading> {
        Ok(self.ingestor.submit(input).await?)
    }

    /// 补判级：策略缺口修复后重放待分类读数
    pub async fn reclassify_pending(&self, shipment_id: &str) -> ApiResult<usize> {
        Ok(self.ingestor.reclassify_pending(shipment_id).await?)
    }

    // ==========================================
    // 状态推进
    // ==========================================

    /// 推进运单状态（人工/调度系统触发）
    ///
    /// # 说明
    /// - 在运单临界区内执行，与读数入库/告警转移串行
    pub async fn advance_shipment(&self, request: AdvanceRequest) -> ApiResult<TimelineEvent> {
        if request.location.trim().is_empty() {
            return Err(ApiError::InvalidInput("位置不能为空".to_string()));
        }

        let _guard = self.locks.acquire(&request.shipment_id).await?;
        Ok(self.timeline.advance(&request, None).await?)
    }

    // ==========================================
    // 策略补齐
    // ==========================================

    /// 覆盖运单策略（策略缺口修复 / 人工调整区间）
    pub async fn apply_policy_override(
        &self,
        shipment_id: &str,
        policy: RangePolicy,
    ) -> ApiResult<()> {
        if !policy.is_valid() {
            return Err(ApiError::InvalidInput(format!(
                "策略区间非法: temp=[{}, {}], margin={}",
                policy.temp_min, policy.temp_max, policy.critical_margin
            )));
        }

        let _guard = self.locks.acquire(shipment_id).await?;

        let shipment = self
            .shipment_repo
            .find_by_id(shipment_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Shipment(id={})不存在", shipment_id)))?;

        self.shipment_repo
            .update_policy(&shipment.shipment_id, &policy, Utc::now())?;

        info!(
            shipment_id = %shipment_id,
            temp_min = policy.temp_min,
            temp_max = policy.temp_max,
            "运单策略覆盖完成"
        );
        Ok(())
    }
}
