// ==========================================
// 冷链运输监控系统 - 判级核心（纯函数）
// ==========================================
// 职责: 读数相对策略区间的判级计算
// 红线: 不读库不写库，无副作用；告警生命周期在 AlertClassifier
// ==========================================

use crate::domain::shipment::RangePolicy;
use crate::domain::types::{ClassificationLevel, MetricKind};

// ==========================================
// MetricAssessment - 单指标判级结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricAssessment {
    pub metric: MetricKind,
    pub level: ClassificationLevel,
    /// 出区间幅度（区间内为 0）
    pub deviation: f64,
}

// ==========================================
// ClassifierCore - 判级核心
// ==========================================
pub struct ClassifierCore;

impl ClassifierCore {
    /// 区间判级
    ///
    /// # 规则
    /// - 区间内 → NORMAL
    /// - 出区间且幅度达到严重裕度 → CRITICAL
    /// - 出区间但幅度未达裕度 → WARNING
    ///
    /// 幅度恰好等于裕度时判 CRITICAL（裕度是警告档的开区间上界）
    fn classify_deviation(deviation: f64, critical_margin: f64) -> ClassificationLevel {
        if deviation <= 0.0 {
            ClassificationLevel::Normal
        } else if deviation >= critical_margin {
            ClassificationLevel::Critical
        } else {
            ClassificationLevel::Warning
        }
    }

    /// 温度判级
    pub fn assess_temperature(policy: &RangePolicy, temperature: f64) -> MetricAssessment {
        let deviation = if temperature < policy.temp_min {
            policy.temp_min - temperature
        } else if temperature > policy.temp_max {
            temperature - policy.temp_max
        } else {
            0.0
        };

        MetricAssessment {
            metric: MetricKind::Temperature,
            level: Self::classify_deviation(deviation, policy.critical_margin),
            deviation,
        }
    }

    /// 湿度判级
    ///
    /// # 说明
    /// - 策略未定义湿度界限的一侧不参与判级
    /// - 策略完全无湿度界限时恒为 NORMAL
    pub fn assess_humidity(policy: &RangePolicy, humidity: f64) -> MetricAssessment {
        let mut deviation = 0.0;

        if let Some(min) = policy.humidity_min {
            if humidity < min {
                deviation = min - humidity;
            }
        }
        if let Some(max) = policy.humidity_max {
            if humidity > max {
                deviation = humidity - max;
            }
        }

        MetricAssessment {
            metric: MetricKind::Humidity,
            level: Self::classify_deviation(deviation, policy.critical_margin),
            deviation,
        }
    }

    /// 读数整体判级（取两个指标中的较差者）
    pub fn assess(
        policy: &RangePolicy,
        temperature: f64,
        humidity: Option<f64>,
    ) -> (ClassificationLevel, Vec<MetricAssessment>) {
        let mut assessments = vec![Self::assess_temperature(policy, temperature)];

        if let Some(h) = humidity {
            assessments.push(Self::assess_humidity(policy, h));
        }

        let overall = assessments
            .iter()
            .map(|a| a.level)
            .max()
            .unwrap_or(ClassificationLevel::Normal);

        (overall, assessments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frozen_policy() -> RangePolicy {
        RangePolicy {
            temp_min: -20.0,
            temp_max: -18.0,
            humidity_min: Some(30.0),
            humidity_max: Some(60.0),
            critical_margin: 2.0,
        }
    }

    #[test]
    fn test_temperature_in_range_is_normal() {
        let policy = frozen_policy();

        for t in [-20.0, -19.0, -18.0] {
            let a = ClassifierCore::assess_temperature(&policy, t);
            assert_eq!(a.level, ClassificationLevel::Normal, "t={}", t);
            assert_eq!(a.deviation, 0.0);
        }
    }

    #[test]
    fn test_temperature_within_margin_is_warning() {
        let policy = frozen_policy();

        // 超上限 0.5°C，未达裕度 2°C
        let a = ClassifierCore::assess_temperature(&policy, -17.5);
        assert_eq!(a.level, ClassificationLevel::Warning);
        assert!((a.deviation - 0.5).abs() < 1e-9);

        // 超下限同理
        let a = ClassifierCore::assess_temperature(&policy, -21.0);
        assert_eq!(a.level, ClassificationLevel::Warning);
    }

    #[test]
    fn test_temperature_at_or_beyond_margin_is_critical() {
        let policy = frozen_policy();

        // 恰好达到裕度
        let a = ClassifierCore::assess_temperature(&policy, -16.0);
        assert_eq!(a.level, ClassificationLevel::Critical);

        // 远超裕度
        let a = ClassifierCore::assess_temperature(&policy, -10.0);
        assert_eq!(a.level, ClassificationLevel::Critical);

        let a = ClassifierCore::assess_temperature(&policy, -25.0);
        assert_eq!(a.level, ClassificationLevel::Critical);
    }

    #[test]
    fn test_humidity_without_bounds_is_normal() {
        let mut policy = frozen_policy();
        policy.humidity_min = None;
        policy.humidity_max = None;

        let a = ClassifierCore::assess_humidity(&policy, 95.0);
        assert_eq!(a.level, ClassificationLevel::Normal);
    }

    #[test]
    fn test_humidity_breach() {
        let policy = frozen_policy();

        let a = ClassifierCore::assess_humidity(&policy, 61.0);
        assert_eq!(a.level, ClassificationLevel::Warning);

        let a = ClassifierCore::assess_humidity(&policy, 70.0);
        assert_eq!(a.level, ClassificationLevel::Critical);

        let a = ClassifierCore::assess_humidity(&policy, 29.5);
        assert_eq!(a.level, ClassificationLevel::Warning);
    }

    #[test]
    fn test_overall_takes_worse_metric() {
        let policy = frozen_policy();

        // 温度正常 + 湿度严重 → 整体严重
        let (overall, assessments) = ClassifierCore::assess(&policy, -19.0, Some(70.0));
        assert_eq!(overall, ClassificationLevel::Critical);
        assert_eq!(assessments.len(), 2);

        // 无湿度采样 → 只评温度
        let (overall, assessments) = ClassifierCore::assess(&policy, -19.0, None);
        assert_eq!(overall, ClassificationLevel::Normal);
        assert_eq!(assessments.len(), 1);
    }

    #[test]
    fn test_zero_margin_breach_is_critical() {
        let mut policy = frozen_policy();
        policy.critical_margin = 0.0;

        // 裕度为 0 时任何越界即严重
        let a = ClassifierCore::assess_temperature(&policy, -17.9);
        assert_eq!(a.level, ClassificationLevel::Critical);
    }
}
