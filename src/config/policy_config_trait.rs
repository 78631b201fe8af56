// ==========================================
// 冷链运输监控系统 - 策略配置读取 Trait
// ==========================================
// 职责: 定义策略解析所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::shipment::RangePolicy;
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// PolicyConfigReader Trait
// ==========================================
// 用途: 按货物类型读取默认温湿度策略
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait PolicyConfigReader: Send + Sync {
    /// 获取货物类型的默认策略
    ///
    /// # 参数
    /// - cargo_type: 货物类型（如 FROZEN_FOOD / PHARMA / FRESH_PRODUCE）
    ///
    /// # 返回
    /// - Some(RangePolicy): 已配置默认策略
    /// - None: 该货物类型无默认策略（由调用方决定回退或拒绝）
    async fn get_default_policy(
        &self,
        cargo_type: &str,
    ) -> Result<Option<RangePolicy>, Box<dyn Error>>;

    /// 获取全局默认严重裕度
    ///
    /// # 说明
    /// - 策略配置省略 critical_margin 字段时的回退值
    ///
    /// # 默认值
    /// - 2.0（°C / %）
    async fn get_default_critical_margin(&self) -> Result<f64, Box<dyn Error>>;
}
