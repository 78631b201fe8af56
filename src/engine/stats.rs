// ==========================================
// 冷链运输监控系统 - 统计聚合引擎
// ==========================================
// 职责: 运单读数统计（min/avg/max、告警读数计数）
// 约束: 默认窗口走增量快照（O(1)/读数），显式窗口走有界重扫
// 规则: min/max 平局取最早采样时间的读数
// ==========================================

use crate::domain::reading::Reading;
use crate::engine::error::EngineResult;
use crate::repository::reading_repo::ReadingRepository;
use crate::repository::stats_repo::{ShipmentStatsRow, StatsRepository};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ==========================================
// StatsWindow - 统计时间窗口（闭区间，None 为开边界）
// ==========================================
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StatsWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

// ==========================================
// StatsSummary - 统计结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSummary {
    pub shipment_id: String,
    pub count: i64,

    // ===== 温度 =====
    pub temp_min: Option<f64>,
    pub temp_min_at: Option<DateTime<Utc>>,
    pub temp_max: Option<f64>,
    pub temp_max_at: Option<DateTime<Utc>>,
    pub temp_avg: Option<f64>,

    // ===== 湿度（可选采样值，单独计数求均）=====
    pub humidity_avg: Option<f64>,

    // ===== 告警读数（判级 WARNING/CRITICAL）=====
    pub alert_reading_count: i64,
}

// ==========================================
// StatsEngine - 统计聚合引擎
// ==========================================
pub struct StatsEngine {
    reading_repo: Arc<ReadingRepository>,
    stats_repo: Arc<StatsRepository>,
}

impl StatsEngine {
    /// 创建新的 StatsEngine 实例
    pub fn new(reading_repo: Arc<ReadingRepository>, stats_repo: Arc<StatsRepository>) -> Self {
        Self {
            reading_repo,
            stats_repo,
        }
    }

    // ==========================================
    // 增量维护（入库临界区内调用）
    // ==========================================

    /// 将新读数并入增量快照（O(1)）
    pub fn apply_reading(&self, reading: &Reading) -> EngineResult<()> {
        let now = Utc::now();
        let mut row = self
            .stats_repo
            .fetch(&reading.shipment_id)?
            .unwrap_or_else(|| ShipmentStatsRow::empty(&reading.shipment_id, now));

        Self::merge_reading(&mut row, reading);
        row.updated_at = now;
        self.stats_repo.upsert(&row)?;
        Ok(())
    }

    /// 待补分类读数补判级后修正告警读数计数
    ///
    /// # 说明
    /// - 读数入库时已计入 count/sum/min/max，此处只补 alert_reading_count
    pub fn apply_reclassification(&self, shipment_id: &str, is_breach: bool) -> EngineResult<()> {
        if !is_breach {
            return Ok(());
        }

        let now = Utc::now();
        let mut row = self
            .stats_repo
            .fetch(shipment_id)?
            .unwrap_or_else(|| ShipmentStatsRow::empty(shipment_id, now));
        row.alert_reading_count += 1;
        row.updated_at = now;
        self.stats_repo.upsert(&row)?;
        Ok(())
    }

    /// 纯合并规则（增量与重扫共用，保证两者一致）
    ///
    /// # 规则
    /// - min/max 平局保留采样时间更早的读数
    pub fn merge_reading(row: &mut ShipmentStatsRow, reading: &Reading) {
        row.reading_count += 1;
        row.temp_sum += reading.temperature;

        let replace_min = match (row.temp_min, row.temp_min_at) {
            (None, _) => true,
            (Some(cur), Some(cur_at)) => {
                reading.temperature < cur
                    || (reading.temperature == cur && reading.recorded_at < cur_at)
            }
            (Some(cur), None) => reading.temperature < cur,
        };
        if replace_min {
            row.temp_min = Some(reading.temperature);
            row.temp_min_at = Some(reading.recorded_at);
        }

        let replace_max = match (row.temp_max, row.temp_max_at) {
            (None, _) => true,
            (Some(cur), Some(cur_at)) => {
                reading.temperature > cur
                    || (reading.temperature == cur && reading.recorded_at < cur_at)
            }
            (Some(cur), None) => reading.temperature > cur,
        };
        if replace_max {
            row.temp_max = Some(reading.temperature);
            row.temp_max_at = Some(reading.recorded_at);
        }

        if let Some(h) = reading.humidity {
            row.humidity_count += 1;
            row.humidity_sum += h;
        }

        if reading.classification.is_breach() {
            row.alert_reading_count += 1;
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 运单统计
    ///
    /// # 参数
    /// - window: None 取全部读数（增量快照）；Some 取窗口内读数（有界重扫）
    pub fn stats(
        &self,
        shipment_id: &str,
        window: Option<StatsWindow>,
    ) -> EngineResult<StatsSummary> {
        match window {
            None => {
                let row = self
                    .stats_repo
                    .fetch(shipment_id)?
                    .unwrap_or_else(|| ShipmentStatsRow::empty(shipment_id, Utc::now()));
                Ok(Self::summary_from_row(&row))
            }
            Some(w) => {
                let readings = self.reading_repo.list_window(shipment_id, w.from, w.to)?;
                Ok(Self::compute_from_readings(shipment_id, &readings))
            }
        }
    }

    /// 全量重扫计算（窗口查询与一致性校验共用）
    pub fn compute_from_readings(shipment_id: &str, readings: &[Reading]) -> StatsSummary {
        let mut row = ShipmentStatsRow::empty(shipment_id, Utc::now());
        for reading in readings {
            Self::merge_reading(&mut row, reading);
        }
        Self::summary_from_row(&row)
    }

    /// 快照行转统计结果
    fn summary_from_row(row: &ShipmentStatsRow) -> StatsSummary {
        let temp_avg = if row.reading_count > 0 {
            Some(row.temp_sum / row.reading_count as f64)
        } else {
            None
        };
        let humidity_avg = if row.humidity_count > 0 {
            Some(row.humidity_sum / row.humidity_count as f64)
        } else {
            None
        };

        StatsSummary {
            shipment_id: row.shipment_id.clone(),
            count: row.reading_count,
            temp_min: row.temp_min,
            temp_min_at: row.temp_min_at,
            temp_max: row.temp_max,
            temp_max_at: row.temp_max_at,
            temp_avg,
            humidity_avg,
            alert_reading_count: row.alert_reading_count,
        }
    }
}
