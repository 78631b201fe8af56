// ==========================================
// 冷链运输监控系统 - 查询投影 API
// ==========================================
// 职责: 只读视图（读数分页/时间线/打开告警/统计）
// 红线: 绝不变更状态；只见已提交数据，同进程内无最终一致性延迟
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::alert::Alert;
use crate::domain::reading::Reading;
use crate::domain::shipment::Shipment;
use crate::domain::timeline::TimelineEvent;
use crate::engine::stats::{StatsEngine, StatsSummary, StatsWindow};
use crate::repository::alert_repo::AlertRepository;
use crate::repository::reading_repo::ReadingRepository;
use crate::repository::shipment_repo::ShipmentRepository;
use crate::repository::timeline_repo::TimelineRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 分页上限
const MAX_PAGE_SIZE: i64 = 500;

// ==========================================
// ReadingPage - 读数分页结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingPage {
    pub items: Vec<Reading>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
}

// ==========================================
// QueryApi - 查询投影 API
// ==========================================
pub struct QueryApi {
    shipment_repo: Arc<ShipmentRepository>,
    reading_repo: Arc<ReadingRepository>,
    alert_repo: Arc<AlertRepository>,
    timeline_repo: Arc<TimelineRepository>,
    stats: Arc<StatsEngine>,
}

impl QueryApi {
    /// 创建新的 QueryApi 实例
    pub fn new(
        shipment_repo: Arc<ShipmentRepository>,
        reading_repo: Arc<ReadingRepository>,
        alert_repo: Arc<AlertRepository>,
        timeline_repo: Arc<TimelineRepository>,
        stats: Arc<StatsEngine>,
    ) -> Self {
        Self {
            shipment_repo,
            reading_repo,
            alert_repo,
            timeline_repo,
            stats,
        }
    }

    /// 运单存在性检查
    fn require_shipment(&self, shipment_id: &str) -> ApiResult<Shipment> {
        self.shipment_repo
            .find_by_id(shipment_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Shipment(id={})不存在", shipment_id)))
    }

    /// 查询运单详情
    pub fn get_shipment(&self, shipment_id: &str) -> ApiResult<Option<Shipment>> {
        Ok(self.shipment_repo.find_by_id(shipment_id)?)
    }

    /// 分页查询运单读数（时间序，稳定分页）
    ///
    /// # 参数
    /// - page: 页码（从 1 开始）
    /// - page_size: 每页条数（1..=500）
    pub fn list_readings(
        &self,
        shipment_id: &str,
        page: i64,
        page_size: i64,
    ) -> ApiResult<ReadingPage> {
        if page < 1 {
            return Err(ApiError::InvalidInput(format!("页码必须 >= 1: {}", page)));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ApiError::InvalidInput(format!(
                "每页条数必须在 [1, {}] 区间内: {}",
                MAX_PAGE_SIZE, page_size
            )));
        }

        self.require_shipment(shipment_id)?;

        let items = self.reading_repo.list_paged(shipment_id, page, page_size)?;
        let total = self.reading_repo.count_for(shipment_id)?;

        Ok(ReadingPage {
            items,
            page,
            page_size,
            total,
        })
    }

    /// 查询运单时间线（序号全序）
    pub fn list_timeline(&self, shipment_id: &str) -> ApiResult<Vec<TimelineEvent>> {
        self.require_shipment(shipment_id)?;
        Ok(self.timeline_repo.list_by_shipment(shipment_id)?)
    }

    /// 查询打开告警
    ///
    /// # 参数
    /// - shipment_id: Some 限定运单；None 返回全局打开告警
    pub fn list_open_alerts(&self, shipment_id: Option<&str>) -> ApiResult<Vec<Alert>> {
        match shipment_id {
            Some(id) => {
                self.require_shipment(id)?;
                Ok(self.alert_repo.list_open_by_shipment(id)?)
            }
            None => Ok(self.alert_repo.list_open_all()?),
        }
    }

    /// 查询运单全部告警（含已解除）
    pub fn list_alerts(&self, shipment_id: &str) -> ApiResult<Vec<Alert>> {
        self.require_shipment(shipment_id)?;
        Ok(self.alert_repo.list_by_shipment(shipment_id)?)
    }

    /// 查询运单统计
    ///
    /// # 参数
    /// - window: None 为全量（增量快照）；Some 为窗口重扫
    pub fn get_stats(
        &self,
        shipment_id: &str,
        window: Option<StatsWindow>,
    ) -> ApiResult<StatsSummary> {
        self.require_shipment(shipment_id)?;
        Ok(self.stats.stats(shipment_id, window)?)
    }
}
