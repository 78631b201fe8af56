// ==========================================
// 冷链运输监控系统 - 策略解析引擎
// ==========================================
// 职责: 解析运单适用的温湿度策略
// 解析顺序: 运单固化策略 → 货物类型默认策略 → PolicyNotFound
// 红线: 只读，无副作用
// ==========================================

use crate::config::PolicyConfigReader;
use crate::domain::shipment::{RangePolicy, Shipment};
use crate::engine::error::{EngineError, EngineResult};
use std::sync::Arc;

// ==========================================
// RangePolicyResolver - 策略解析器
// ==========================================
pub struct RangePolicyResolver<C>
where
    C: PolicyConfigReader,
{
    config: Arc<C>,
}

impl<C> RangePolicyResolver<C>
where
    C: PolicyConfigReader,
{
    /// 创建新的 RangePolicyResolver 实例
    ///
    /// # 参数
    /// - config: 配置读取器
    pub fn new(config: Arc<C>) -> Self {
        Self { config }
    }

    /// 解析运单适用策略
    ///
    /// # 返回
    /// - Ok(RangePolicy): 运单固化策略或货物类型默认策略
    /// - Err(PolicyNotFound): 两者皆无，调用方须补策略或拒绝入库
    pub async fn resolve(&self, shipment: &Shipment) -> EngineResult<RangePolicy> {
        if let Some(policy) = shipment.policy {
            return Ok(policy);
        }

        let default = self
            .config
            .get_default_policy(&shipment.cargo_type)
            .await
            .map_err(|e| EngineError::Configuration(e.to_string()))?;

        default.ok_or_else(|| EngineError::PolicyNotFound {
            cargo_type: shipment.cargo_type.clone(),
        })
    }

    /// 注册期解析：覆盖策略优先，否则取货物类型默认策略
    ///
    /// # 参数
    /// - cargo_type: 货物类型
    /// - policy_override: 人工覆盖策略
    ///
    /// # 返回
    /// - Ok(Some): 解析成功，注册时固化
    /// - Ok(None): 无覆盖且无默认（允许注册，读数在策略补齐前入库为 UNCLASSIFIED）
    /// - Err(InvalidPolicy): 覆盖策略自检失败
    pub async fn resolve_for_registration(
        &self,
        cargo_type: &str,
        policy_override: Option<RangePolicy>,
    ) -> EngineResult<Option<RangePolicy>> {
        if let Some(policy) = policy_override {
            if !policy.is_valid() {
                return Err(EngineError::InvalidPolicy(format!(
                    "策略区间非法: temp=[{}, {}], margin={}",
                    policy.temp_min, policy.temp_max, policy.critical_margin
                )));
            }
            return Ok(Some(policy));
        }

        self.config
            .get_default_policy(cargo_type)
            .await
            .map_err(|e| EngineError::Configuration(e.to_string()))
    }
}
