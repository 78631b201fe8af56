// ==========================================
// 查询投影 API 测试
// ==========================================
// 测试范围:
// 1. 稳定分页（时间序，跨页不重不漏）
// 2. 参数校验与未知运单
// 3. 查询只读（重复调用结果一致，不产生副作用）
// ==========================================

mod test_helpers;

use cold_chain_monitor::api::ApiError;
use test_helpers::{create_test_state, device_reading, register_frozen_shipment};

// ==========================================
// 稳定分页
// ==========================================
#[tokio::test]
async fn test_paginated_readings_stable_order() {
    let (_tmp, state) = create_test_state();
    let shipment = register_frozen_shipment(&state).await;
    let id = &shipment.shipment_id;

    // 25 条读数，乱序提交（倒序采样时间）
    for i in (0..25i64).rev() {
        state
            .monitor_api
            .submit_reading(device_reading(id, -19.0 - (i as f64) * 0.01, i))
            .await
            .unwrap();
    }

    let page1 = state.query_api.list_readings(id, 1, 10).unwrap();
    let page2 = state.query_api.list_readings(id, 2, 10).unwrap();
    let page3 = state.query_api.list_readings(id, 3, 10).unwrap();

    assert_eq!(page1.total, 25);
    assert_eq!(page1.items.len(), 10);
    assert_eq!(page2.items.len(), 10);
    assert_eq!(page3.items.len(), 5);

    // 跨页拼接后仍是时间全序，不重不漏
    let mut all: Vec<_> = Vec::new();
    all.extend(page1.items.iter().cloned());
    all.extend(page2.items.iter().cloned());
    all.extend(page3.items.iter().cloned());

    assert_eq!(all.len(), 25);
    for pair in all.windows(2) {
        assert!(pair[0].recorded_at <= pair[1].recorded_at);
    }

    let mut ids: Vec<_> = all.iter().map(|r| r.reading_id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 25, "跨页不允许重复");
}

// ==========================================
// 参数校验
// ==========================================
#[tokio::test]
async fn test_pagination_parameter_validation() {
    let (_tmp, state) = create_test_state();
    let shipment = register_frozen_shipment(&state).await;
    let id = &shipment.shipment_id;

    let err = state.query_api.list_readings(id, 0, 10).unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    let err = state.query_api.list_readings(id, 1, 0).unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    let err = state.query_api.list_readings(id, 1, 10_000).unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[tokio::test]
async fn test_queries_on_unknown_shipment() {
    let (_tmp, state) = create_test_state();

    let err = state
        .query_api
        .list_readings("no-such-shipment", 1, 10)
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let err = state.query_api.list_timeline("no-such-shipment").unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let err = state
        .query_api
        .get_stats("no-such-shipment", None)
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    assert!(state
        .query_api
        .get_shipment("no-such-shipment")
        .unwrap()
        .is_none());
}

// ==========================================
// 全局/运单打开告警视图
// ==========================================
#[tokio::test]
async fn test_open_alert_views() {
    let (_tmp, state) = create_test_state();
    let s1 = register_frozen_shipment(&state).await;
    let s2 = register_frozen_shipment(&state).await;

    // s1 越界，s2 正常
    state
        .monitor_api
        .submit_reading(device_reading(&s1.shipment_id, -17.5, 0))
        .await
        .unwrap();
    state
        .monitor_api
        .submit_reading(device_reading(&s2.shipment_id, -19.0, 0))
        .await
        .unwrap();

    let global = state.query_api.list_open_alerts(None).unwrap();
    assert_eq!(global.len(), 1);
    assert_eq!(global[0].shipment_id, s1.shipment_id);

    assert_eq!(
        state
            .query_api
            .list_open_alerts(Some(&s1.shipment_id))
            .unwrap()
            .len(),
        1
    );
    assert!(state
        .query_api
        .list_open_alerts(Some(&s2.shipment_id))
        .unwrap()
        .is_empty());
}

// ==========================================
// 查询只读
// ==========================================
#[tokio::test]
async fn test_queries_are_read_only() {
    let (_tmp, state) = create_test_state();
    let shipment = register_frozen_shipment(&state).await;
    let id = &shipment.shipment_id;

    state
        .monitor_api
        .submit_reading(device_reading(id, -17.5, 0))
        .await
        .unwrap();

    // 重复查询结果一致
    let stats1 = state.query_api.get_stats(id, None).unwrap();
    let stats2 = state.query_api.get_stats(id, None).unwrap();
    assert_eq!(stats1.count, stats2.count);
    assert_eq!(stats1.alert_reading_count, stats2.alert_reading_count);

    let alerts1 = state.query_api.list_open_alerts(Some(id)).unwrap();
    let alerts2 = state.query_api.list_open_alerts(Some(id)).unwrap();
    assert_eq!(alerts1.len(), alerts2.len());
    assert_eq!(alerts1[0].last_seen_at, alerts2[0].last_seen_at);

    let timeline1 = state.query_api.list_timeline(id).unwrap();
    let timeline2 = state.query_api.list_timeline(id).unwrap();
    assert_eq!(timeline1.len(), timeline2.len());
}
