// ==========================================
// 冷链运输监控系统 - 告警分类引擎
// ==========================================
// 职责: 读数判级落地为告警生命周期（打开/合并/升级/解除）
// 红线: 每运单每指标至多一条打开告警；升级就地进行，不新建
// 红线: 严重判级触发 AT_RISK 转移；全部告警解除后回到 IN_TRANSIT
// ==========================================

use crate::domain::alert::Alert;
use crate::domain::reading::Reading;
use crate::domain::shipment::{RangePolicy, Shipment};
use crate::domain::timeline::AdvanceRequest;
use crate::domain::types::{AlertSeverity, AlertStatus, ClassificationLevel, ShipmentStatus};
use crate::engine::classifier_core::{ClassifierCore, MetricAssessment};
use crate::engine::error::EngineResult;
use crate::engine::events::{MonitorEvent, MonitorEventType, OptionalEventPublisher};
use crate::engine::timeline::TimelineEngine;
use crate::repository::alert_repo::AlertRepository;
use crate::repository::timeline_repo::TimelineRepository;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ==========================================
// Classification - 判级与告警处理结果
// ==========================================
#[derive(Debug, Clone)]
pub struct Classification {
    /// 读数整体判级（两指标取较差者）
    pub level: ClassificationLevel,
    /// 各指标判级明细
    pub assessments: Vec<MetricAssessment>,
    /// 本次读数触达的告警（处理后的最新状态）
    pub alerts: Vec<Alert>,
}

// ==========================================
// AlertClassifier - 告警分类引擎
// ==========================================
pub struct AlertClassifier {
    alert_repo: Arc<AlertRepository>,
    timeline_repo: Arc<TimelineRepository>,
    timeline: Arc<TimelineEngine>,
    events: OptionalEventPublisher,
}

impl AlertClassifier {
    /// 创建新的 AlertClassifier 实例
    pub fn new(
        alert_repo: Arc<AlertRepository>,
        timeline_repo: Arc<TimelineRepository>,
        timeline: Arc<TimelineEngine>,
        events: OptionalEventPublisher,
    ) -> Self {
        Self {
            alert_repo,
            timeline_repo,
            timeline,
            events,
        }
    }

    /// 对已入库读数执行判级落地
    ///
    /// # 说明
    /// - 纯决策基于 (策略, 当前打开告警集, 读数)；
    ///   副作用仅限告警创建/变更与严重档触发的时间线转移
    /// - 调用方必须持有该运单的独占临界区
    ///
    /// # 返回
    /// - Classification: 整体判级 + 指标明细 + 触达告警
    pub async fn apply(
        &self,
        shipment: &Shipment,
        policy: &RangePolicy,
        reading: &Reading,
    ) -> EngineResult<Classification> {
        let (overall, assessments) =
            ClassifierCore::assess(policy, reading.temperature, reading.humidity);

        let mut touched = Vec::new();
        let mut critical_alert_id: Option<String> = None;

        // === 步骤 1: 逐指标推进告警生命周期 ===
        for assessment in &assessments {
            if let Some(alert) = self.apply_metric(shipment, reading, assessment)? {
                if alert.severity == AlertSeverity::Critical && alert.is_open() {
                    critical_alert_id = Some(alert.alert_id.clone());
                }
                touched.push(alert);
            }
        }

        // === 步骤 2: 严重判级触发风险子状态 ===
        if overall == ClassificationLevel::Critical {
            self.enter_at_risk(shipment, reading, critical_alert_id.as_deref())
                .await?;
        }

        // === 步骤 3: 告警全解除后脱离风险子状态 ===
        if overall == ClassificationLevel::Normal && shipment.status == ShipmentStatus::AtRisk {
            let still_open = self.alert_repo.list_open_by_shipment(&shipment.shipment_id)?;
            if still_open.is_empty() {
                self.leave_at_risk(shipment, reading).await?;
            }
        }

        Ok(Classification {
            level: overall,
            assessments,
            alerts: touched,
        })
    }

    // ==========================================
    // 单指标生命周期
    // ==========================================

    /// 推进单指标告警生命周期
    ///
    /// # 返回
    /// - Some(Alert): 本次触达（打开/合并/升级/解除）的告警
    /// - None: 指标正常且无打开告警
    fn apply_metric(
        &self,
        shipment: &Shipment,
        reading: &Reading,
        assessment: &MetricAssessment,
    ) -> EngineResult<Option<Alert>> {
        let open = self
            .alert_repo
            .find_open(&shipment.shipment_id, assessment.metric)?;

        match assessment.level {
            ClassificationLevel::Warning => self.on_breach(shipment, reading, assessment, open, AlertSeverity::Warning),
            ClassificationLevel::Critical => self.on_breach(shipment, reading, assessment, open, AlertSeverity::Critical),
            ClassificationLevel::Normal => self.on_clear(reading, open),
            // 待补分类读数不进入告警生命周期
            ClassificationLevel::Unclassified => Ok(None),
        }
    }

    /// 越界读数：打开新告警，或合并/升级既有告警
    fn on_breach(
        &self,
        shipment: &Shipment,
        reading: &Reading,
        assessment: &MetricAssessment,
        open: Option<Alert>,
        severity: AlertSeverity,
    ) -> EngineResult<Option<Alert>> {
        let now = Utc::now();

        match open {
            None => {
                // 无打开告警 → 新建
                let alert = Alert {
                    alert_id: Uuid::new_v4().to_string(),
                    shipment_id: shipment.shipment_id.clone(),
                    metric: assessment.metric,
                    severity,
                    status: AlertStatus::Open,
                    opened_reading_id: reading.reading_id.clone(),
                    opened_at: reading.recorded_at,
                    last_seen_reading_id: reading.reading_id.clone(),
                    last_seen_at: reading.recorded_at,
                    escalated_at: None,
                    resolved_reading_id: None,
                    resolved_at: None,
                    resolution_note: None,
                    created_at: now,
                    updated_at: now,
                };
                self.alert_repo.insert(&alert)?;

                info!(
                    shipment_id = %shipment.shipment_id,
                    alert_id = %alert.alert_id,
                    metric = %assessment.metric,
                    severity = %severity,
                    "告警打开"
                );
                self.events.publish(MonitorEvent::alert(
                    &shipment.shipment_id,
                    MonitorEventType::AlertOpened,
                    &alert.alert_id,
                    &reading.reading_id,
                    reading.recorded_at,
                ));
                Ok(Some(alert))
            }
            Some(existing) => {
                if severity == AlertSeverity::Critical
                    && existing.severity == AlertSeverity::Warning
                {
                    // WARNING → CRITICAL 就地升级（同一告警身份）
                    self.alert_repo.escalate(
                        &existing.alert_id,
                        &reading.reading_id,
                        reading.recorded_at,
                        now,
                    )?;

                    info!(
                        shipment_id = %shipment.shipment_id,
                        alert_id = %existing.alert_id,
                        metric = %assessment.metric,
                        "告警就地升级 WARNING → CRITICAL"
                    );
                    self.events.publish(MonitorEvent::alert(
                        &shipment.shipment_id,
                        MonitorEventType::AlertEscalated,
                        &existing.alert_id,
                        &reading.reading_id,
                        reading.recorded_at,
                    ));
                } else if reading.recorded_at >= existing.last_seen_at {
                    // 同档（或低档）重复越界 → 合并推进 last_seen，不新建不降档
                    self.alert_repo.touch_last_seen(
                        &existing.alert_id,
                        &reading.reading_id,
                        reading.recorded_at,
                        now,
                    )?;
                    debug!(
                        alert_id = %existing.alert_id,
                        "重复越界合并到既有告警"
                    );
                } else {
                    // 晚到的早时间戳越界读数不回拨 last_seen
                    debug!(
                        alert_id = %existing.alert_id,
                        "乱序越界读数早于 last_seen，保持既有告警不变"
                    );
                }

                let updated = self
                    .alert_repo
                    .find_by_id(&existing.alert_id)?
                    .unwrap_or(existing);
                Ok(Some(updated))
            }
        }
    }

    /// 区间内读数：作为清除信号解除该指标的打开告警
    fn on_clear(&self, reading: &Reading, open: Option<Alert>) -> EngineResult<Option<Alert>> {
        let Some(existing) = open else {
            return Ok(None);
        };

        // 乱序的早时间戳正常读数不能解除其后打开的告警
        if reading.recorded_at < existing.last_seen_at {
            debug!(
                alert_id = %existing.alert_id,
                "乱序正常读数早于 last_seen，不作为清除信号"
            );
            return Ok(Some(existing));
        }

        let now = Utc::now();
        self.alert_repo.resolve(
            &existing.alert_id,
            &reading.reading_id,
            reading.recorded_at,
            None,
            now,
        )?;

        info!(
            shipment_id = %existing.shipment_id,
            alert_id = %existing.alert_id,
            metric = %existing.metric,
            "告警解除"
        );
        self.events.publish(MonitorEvent::alert(
            &existing.shipment_id,
            MonitorEventType::AlertResolved,
            &existing.alert_id,
            &reading.reading_id,
            reading.recorded_at,
        ));

        let updated = self
            .alert_repo
            .find_by_id(&existing.alert_id)?
            .unwrap_or(existing);
        Ok(Some(updated))
    }

    // ==========================================
    // 风险子状态转移
    // ==========================================

    /// 严重告警触发 IN_TRANSIT → AT_RISK
    ///
    /// # 说明
    /// - AT_RISK 只能从 IN_TRANSIT 进入；运单尚未在途时只开告警不转移
    /// - 已处于 AT_RISK 时合并，不追加事件
    async fn enter_at_risk(
        &self,
        shipment: &Shipment,
        reading: &Reading,
        alert_id: Option<&str>,
    ) -> EngineResult<()> {
        match shipment.status {
            ShipmentStatus::InTransit => {
                let note = match alert_id {
                    Some(id) => format!("严重告警自动转入风险状态: alert_id={}", id),
                    None => "严重告警自动转入风险状态".to_string(),
                };
                let request = AdvanceRequest {
                    shipment_id: shipment.shipment_id.clone(),
                    new_status: ShipmentStatus::AtRisk,
                    location: self.last_known_location(&shipment.shipment_id)?,
                    occurred_at: Some(reading.recorded_at),
                    note: Some(note),
                };
                self.timeline
                    .advance(&request, Some(&reading.reading_id))
                    .await?;
                self.events.publish(MonitorEvent::shipment(
                    &shipment.shipment_id,
                    MonitorEventType::ShipmentAtRisk,
                    reading.recorded_at,
                ));
            }
            ShipmentStatus::AtRisk => {
                debug!(
                    shipment_id = %shipment.shipment_id,
                    "运单已处于风险状态，严重读数合并"
                );
            }
            other => {
                warn!(
                    shipment_id = %shipment.shipment_id,
                    status = %other,
                    "严重告警但运单不在途，跳过风险转移"
                );
            }
        }
        Ok(())
    }

    /// 告警全解除触发 AT_RISK → IN_TRANSIT
    async fn leave_at_risk(&self, shipment: &Shipment, reading: &Reading) -> EngineResult<()> {
        let request = AdvanceRequest {
            shipment_id: shipment.shipment_id.clone(),
            new_status: ShipmentStatus::InTransit,
            location: self.last_known_location(&shipment.shipment_id)?,
            occurred_at: Some(reading.recorded_at),
            note: Some("告警全部解除，自动脱离风险状态".to_string()),
        };
        self.timeline
            .advance(&request, Some(&reading.reading_id))
            .await?;
        self.events.publish(MonitorEvent::shipment(
            &shipment.shipment_id,
            MonitorEventType::ShipmentRecovered,
            reading.recorded_at,
        ));
        Ok(())
    }

    /// 最近一次时间线事件的位置（系统转移沿用）
    fn last_known_location(&self, shipment_id: &str) -> EngineResult<String> {
        let events = self.timeline_repo.list_by_shipment(shipment_id)?;
        Ok(events
            .last()
            .map(|e| e.location.clone())
            .unwrap_or_else(|| "UNKNOWN".to_string()))
    }
}
