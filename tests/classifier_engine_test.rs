// ==========================================
// 告警分类引擎集成测试
// ==========================================
// 测试范围:
// 1. 出区间读数的告警打开/合并/升级/解除全生命周期
// 2. 严重告警触发风险子状态及恢复
// 3. 温度/湿度独立告警序列
// ==========================================

mod test_helpers;

use cold_chain_monitor::domain::types::{
    AlertSeverity, AlertStatus, ClassificationLevel, MetricKind, ShipmentStatus,
};
use test_helpers::{
    advance_to_in_transit, create_test_state, device_reading, device_reading_with_humidity,
    register_frozen_shipment, register_shipment_with_policy,
};

// ==========================================
// 告警全生命周期（打开 → 升级 → 解除）
// ==========================================
// 场景: 区间 [-20, -18]，裕度 2°C
// 读数: -19.0 正常 → -17.5 警告开告警 → -16.0 升级并转入风险
//       → -19.0 解除并回到在途
// 期望: 全程只有一条告警记录
#[tokio::test]
async fn test_alert_lifecycle_warning_escalate_resolve() {
    let (_tmp, state) = create_test_state();
    let shipment = register_frozen_shipment(&state).await;
    advance_to_in_transit(&state, &shipment.shipment_id).await;

    // 正常读数：无告警
    let r = state
        .monitor_api
        .submit_reading(device_reading(&shipment.shipment_id, -19.0, 0))
        .await
        .unwrap();
    assert_eq!(r.classification, ClassificationLevel::Normal);
    assert!(state
        .query_api
        .list_open_alerts(Some(&shipment.shipment_id))
        .unwrap()
        .is_empty());

    // 警告读数：打开告警
    let r = state
        .monitor_api
        .submit_reading(device_reading(&shipment.shipment_id, -17.5, 10))
        .await
        .unwrap();
    assert_eq!(r.classification, ClassificationLevel::Warning);

    let open = state
        .query_api
        .list_open_alerts(Some(&shipment.shipment_id))
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].severity, AlertSeverity::Warning);
    assert_eq!(open[0].metric, MetricKind::Temperature);
    let alert_id = open[0].alert_id.clone();

    // 严重读数：就地升级 + 运单转入风险
    let r = state
        .monitor_api
        .submit_reading(device_reading(&shipment.shipment_id, -16.0, 20))
        .await
        .unwrap();
    assert_eq!(r.classification, ClassificationLevel::Critical);

    let open = state
        .query_api
        .list_open_alerts(Some(&shipment.shipment_id))
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].alert_id, alert_id, "升级必须保持同一告警身份");
    assert_eq!(open[0].severity, AlertSeverity::Critical);
    assert!(open[0].escalated_at.is_some());

    let current = state
        .query_api
        .get_shipment(&shipment.shipment_id)
        .unwrap()
        .unwrap();
    assert_eq!(current.status, ShipmentStatus::AtRisk);

    // 回归区间：解除告警 + 运单回到在途
    let r = state
        .monitor_api
        .submit_reading(device_reading(&shipment.shipment_id, -19.0, 30))
        .await
        .unwrap();
    assert_eq!(r.classification, ClassificationLevel::Normal);

    assert!(state
        .query_api
        .list_open_alerts(Some(&shipment.shipment_id))
        .unwrap()
        .is_empty());

    let current = state
        .query_api
        .get_shipment(&shipment.shipment_id)
        .unwrap()
        .unwrap();
    assert_eq!(current.status, ShipmentStatus::InTransit);

    // 全程只有一条告警记录，严重度历史 warning → critical → resolved
    let all = state.query_api.list_alerts(&shipment.shipment_id).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].alert_id, alert_id);
    assert_eq!(all[0].status, AlertStatus::Resolved);
    assert_eq!(all[0].severity, AlertSeverity::Critical);
    assert!(all[0].escalated_at.is_some());
    assert!(all[0].resolved_at.is_some());
    assert!(all[0].resolved_at.unwrap() >= all[0].opened_at);
}

// ==========================================
// 同档重复越界合并（不新建）
// ==========================================
#[tokio::test]
async fn test_repeated_warning_coalesces_into_one_alert() {
    let (_tmp, state) = create_test_state();
    let shipment = register_frozen_shipment(&state).await;
    advance_to_in_transit(&state, &shipment.shipment_id).await;

    for minutes in [0, 5, 10, 15] {
        state
            .monitor_api
            .submit_reading(device_reading(&shipment.shipment_id, -17.5, minutes))
            .await
            .unwrap();
    }

    let open = state
        .query_api
        .list_open_alerts(Some(&shipment.shipment_id))
        .unwrap();
    assert_eq!(open.len(), 1, "同运单同指标同档不允许出现第二条打开告警");

    // last_seen 推进到最后一条越界读数
    assert_eq!(open[0].last_seen_at, test_helpers::minutes_after(15));
    assert_eq!(open[0].opened_at, test_helpers::minutes_after(0));
}

// ==========================================
// 严重档不降级（后续警告读数仅合并）
// ==========================================
#[tokio::test]
async fn test_critical_alert_does_not_deescalate() {
    let (_tmp, state) = create_test_state();
    let shipment = register_frozen_shipment(&state).await;
    advance_to_in_transit(&state, &shipment.shipment_id).await;

    // 直接严重
    state
        .monitor_api
        .submit_reading(device_reading(&shipment.shipment_id, -15.0, 0))
        .await
        .unwrap();

    // 之后仅警告档越界
    state
        .monitor_api
        .submit_reading(device_reading(&shipment.shipment_id, -17.5, 10))
        .await
        .unwrap();

    let open = state
        .query_api
        .list_open_alerts(Some(&shipment.shipment_id))
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].severity, AlertSeverity::Critical);
    assert_eq!(open[0].last_seen_at, test_helpers::minutes_after(10));
}

// ==========================================
// 温度/湿度独立告警序列
// ==========================================
#[tokio::test]
async fn test_temperature_and_humidity_tracks_are_independent() {
    let (_tmp, state) = create_test_state();
    let shipment = register_shipment_with_policy(
        &state,
        Some(test_helpers::frozen_policy_with_humidity()),
    )
    .await;
    advance_to_in_transit(&state, &shipment.shipment_id).await;

    // 温度警告 + 湿度警告 → 两条独立告警
    state
        .monitor_api
        .submit_reading(device_reading_with_humidity(
            &shipment.shipment_id,
            -17.5,
            61.0,
            0,
        ))
        .await
        .unwrap();

    let open = state
        .query_api
        .list_open_alerts(Some(&shipment.shipment_id))
        .unwrap();
    assert_eq!(open.len(), 2);
    let metrics: Vec<MetricKind> = open.iter().map(|a| a.metric).collect();
    assert!(metrics.contains(&MetricKind::Temperature));
    assert!(metrics.contains(&MetricKind::Humidity));

    // 温度回归、湿度仍越界 → 只解除温度告警
    state
        .monitor_api
        .submit_reading(device_reading_with_humidity(
            &shipment.shipment_id,
            -19.0,
            61.0,
            10,
        ))
        .await
        .unwrap();

    let open = state
        .query_api
        .list_open_alerts(Some(&shipment.shipment_id))
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].metric, MetricKind::Humidity);

    // 不带湿度的正常读数不能作为湿度清除信号
    state
        .monitor_api
        .submit_reading(device_reading(&shipment.shipment_id, -19.0, 20))
        .await
        .unwrap();

    let open = state
        .query_api
        .list_open_alerts(Some(&shipment.shipment_id))
        .unwrap();
    assert_eq!(open.len(), 1, "未采样湿度的读数不解除湿度告警");

    // 带湿度的正常读数解除
    state
        .monitor_api
        .submit_reading(device_reading_with_humidity(
            &shipment.shipment_id,
            -19.0,
            50.0,
            30,
        ))
        .await
        .unwrap();
    assert!(state
        .query_api
        .list_open_alerts(Some(&shipment.shipment_id))
        .unwrap()
        .is_empty());
}

// ==========================================
// 非在途运单的严重告警：只开告警不转移
// ==========================================
#[tokio::test]
async fn test_critical_before_transit_opens_alert_without_transition() {
    let (_tmp, state) = create_test_state();
    let shipment = register_frozen_shipment(&state).await;

    // 运单仍为 CREATED（预冷阶段录入）
    state
        .monitor_api
        .submit_reading(device_reading(&shipment.shipment_id, -10.0, 0))
        .await
        .unwrap();

    let open = state
        .query_api
        .list_open_alerts(Some(&shipment.shipment_id))
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].severity, AlertSeverity::Critical);

    let current = state
        .query_api
        .get_shipment(&shipment.shipment_id)
        .unwrap()
        .unwrap();
    assert_eq!(
        current.status,
        ShipmentStatus::Created,
        "AT_RISK 只能从 IN_TRANSIT 进入"
    );
}
