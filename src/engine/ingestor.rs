// ==========================================
// 冷链运输监控系统 - 读数入库引擎
// ==========================================
// 职责: 读数校验 → 幂等去重 → 落库 → 同步判级 → 增量统计
// 红线: 同一运单全流程在独占临界区内串行；读数被拒必须返回类型化错误
// 红线: 策略缺失时读数以 UNCLASSIFIED 入库，绝不丢弃
// ==========================================

use crate::config::PolicyConfigReader;
use crate::domain::reading::{NewReading, Reading};
use crate::domain::types::ClassificationLevel;
use crate::engine::classifier::AlertClassifier;
use crate::engine::classifier_core::ClassifierCore;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::locks::ShipmentLocks;
use crate::engine::policy::RangePolicyResolver;
use crate::engine::stats::StatsEngine;
use crate::repository::reading_repo::ReadingRepository;
use crate::repository::shipment_repo::ShipmentRepository;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ==========================================
// ReadingIngestor - 读数入库引擎
// ==========================================
pub struct ReadingIngestor<C>
where
    C: PolicyConfigReader,
{
    shipment_repo: Arc<ShipmentRepository>,
    reading_repo: Arc<ReadingRepository>,
    resolver: Arc<RangePolicyResolver<C>>,
    classifier: Arc<AlertClassifier>,
    stats: Arc<StatsEngine>,
    locks: Arc<ShipmentLocks>,
}

impl<C> ReadingIngestor<C>
where
    C: PolicyConfigReader,
{
    /// 创建新的 ReadingIngestor 实例
    pub fn new(
        shipment_repo: Arc<ShipmentRepository>,
        reading_repo: Arc<ReadingRepository>,
        resolver: Arc<RangePolicyResolver<C>>,
        classifier: Arc<AlertClassifier>,
        stats: Arc<StatsEngine>,
        locks: Arc<ShipmentLocks>,
    ) -> Self {
        Self {
            shipment_repo,
            reading_repo,
            resolver,
            classifier,
            stats,
            locks,
        }
    }

    // ==========================================
    // 输入校验
    // ==========================================

    /// 读数输入校验
    ///
    /// # 规则
    /// - 温度必须为有限数
    /// - 湿度（如有）必须为 [0, 100] 内的有限数
    fn validate(input: &NewReading) -> EngineResult<()> {
        if !input.temperature.is_finite() {
            return Err(EngineError::InvalidReading(format!(
                "温度必须为有限数: {}",
                input.temperature
            )));
        }

        if let Some(h) = input.humidity {
            if !h.is_finite() || !(0.0..=100.0).contains(&h) {
                return Err(EngineError::InvalidReading(format!(
                    "湿度必须在 [0, 100] 区间内: {}",
                    h
                )));
            }
        }

        if input.shipment_id.trim().is_empty() {
            return Err(EngineError::InvalidReading("运单 ID 不能为空".to_string()));
        }

        Ok(())
    }

    // ==========================================
    // 核心操作
    // ==========================================

    /// 提交读数
    ///
    /// # 流程
    /// 1. 输入校验（无锁，纯计算）
    /// 2. 进入运单临界区
    /// 3. 运单存在性 + 终态检查
    /// 4. 幂等去重（设备重传返回已存读数，不新建）
    /// 5. 策略解析 → 判级（策略缺失则 UNCLASSIFIED）
    /// 6. 落库 → 增量统计 → 同步告警生命周期
    ///
    /// # 返回
    /// - Ok(Reading): 已接收读数（含判级），重传时为已存读数
    /// - Err(InvalidReading / ShipmentNotFound / ShipmentTerminal / PersistenceTimeout)
    pub async fn submit(&self, input: NewReading) -> EngineResult<Reading> {
        let (reading, _duplicate) = self.submit_with_outcome(input).await?;
        Ok(reading)
    }

    /// 提交读数并返回是否命中幂等键（批量导入需区分新入库与重传）
    pub async fn submit_with_outcome(
        &self,
        input: NewReading,
    ) -> EngineResult<(Reading, bool)> {
        Self::validate(&input)?;

        // === 运单临界区 ===
        let _guard = self.locks.acquire(&input.shipment_id).await?;

        let shipment = self
            .shipment_repo
            .find_by_id(&input.shipment_id)?
            .ok_or_else(|| EngineError::ShipmentNotFound {
                shipment_id: input.shipment_id.clone(),
            })?;

        if shipment.status.is_terminal() {
            return Err(EngineError::ShipmentTerminal {
                shipment_id: shipment.shipment_id,
            });
        }

        let now = Utc::now();
        let recorded_at = input.recorded_at.unwrap_or(now);

        // === 幂等去重 ===
        if let Some(existing) = self.reading_repo.find_duplicate(
            &input.shipment_id,
            input.device_id.as_deref(),
            recorded_at,
            input.temperature,
            input.humidity,
        )? {
            debug!(
                shipment_id = %input.shipment_id,
                reading_id = %existing.reading_id,
                "重复提交命中幂等键，返回已存读数"
            );
            return Ok((existing, true));
        }

        // === 策略解析与判级 ===
        let policy = match self.resolver.resolve(&shipment).await {
            Ok(p) => Some(p),
            Err(EngineError::PolicyNotFound { cargo_type }) => {
                warn!(
                    shipment_id = %shipment.shipment_id,
                    cargo_type = %cargo_type,
                    "策略缺失，读数以 UNCLASSIFIED 入库待补判级"
                );
                None
            }
            Err(e) => return Err(e),
        };

        let classification = match &policy {
            Some(p) => {
                let (overall, _) = ClassifierCore::assess(p, input.temperature, input.humidity);
                overall
            }
            None => ClassificationLevel::Unclassified,
        };

        let reading = Reading {
            reading_id: Uuid::new_v4().to_string(),
            shipment_id: shipment.shipment_id.clone(),
            temperature: input.temperature,
            humidity: input.humidity,
            recorded_at,
            source: input.source,
            device_id: input.device_id,
            notes: input.notes,
            classification,
            ingested_at: now,
        };

        // === 落库（先读数，后统计，再告警）===
        self.reading_repo.insert(&reading)?;
        self.stats.apply_reading(&reading)?;

        if let Some(p) = &policy {
            self.classifier.apply(&shipment, p, &reading).await?;
        }

        info!(
            shipment_id = %reading.shipment_id,
            reading_id = %reading.reading_id,
            temperature = reading.temperature,
            classification = %reading.classification,
            "读数接收"
        );

        Ok((reading, false))
    }

    /// 补判级：策略缺口修复后重放待分类读数
    ///
    /// # 说明
    /// - 按采样时间顺序重放，告警生命周期与正常入库一致
    /// - 统计快照只补 alert_reading_count（count/sum/min/max 入库时已计入）
    ///
    /// # 返回
    /// - Ok(usize): 补判级的读数条数
    /// - Err(PolicyNotFound): 策略仍缺失
    pub async fn reclassify_pending(&self, shipment_id: &str) -> EngineResult<usize> {
        let _guard = self.locks.acquire(shipment_id).await?;

        let shipment = self
            .shipment_repo
            .find_by_id(shipment_id)?
            .ok_or_else(|| EngineError::ShipmentNotFound {
                shipment_id: shipment_id.to_string(),
            })?;

        let policy = self.resolver.resolve(&shipment).await?;
        let pending = self.reading_repo.list_unclassified(shipment_id)?;
        let total = pending.len();

        for mut reading in pending {
            let (overall, _) =
                ClassifierCore::assess(&policy, reading.temperature, reading.humidity);
            self.reading_repo
                .update_classification(&reading.reading_id, overall)?;
            self.stats
                .apply_reclassification(shipment_id, overall.is_breach())?;

            reading.classification = overall;

            // 告警转移依赖运单当前状态，逐条重放前刷新
            let current = self
                .shipment_repo
                .find_by_id(shipment_id)?
                .ok_or_else(|| EngineError::ShipmentNotFound {
                    shipment_id: shipment_id.to_string(),
                })?;
            self.classifier.apply(&current, &policy, &reading).await?;
        }

        if total > 0 {
            info!(
                shipment_id = %shipment_id,
                count = total,
                "待分类读数补判级完成"
            );
        }

        Ok(total)
    }
}
