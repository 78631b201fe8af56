// ==========================================
// 统计聚合引擎测试
// ==========================================
// 测试范围:
// 1. 增量快照与全量重扫结果一致（任意到达顺序）
// 2. min/max 平局取最早采样时间
// 3. 窗口统计
// ==========================================

mod test_helpers;

use cold_chain_monitor::engine::{StatsEngine, StatsWindow};
use test_helpers::{
    advance_to_in_transit, create_test_state, device_reading, minutes_after,
    register_frozen_shipment,
};

// ==========================================
// 增量 ≡ 重扫
// ==========================================
#[tokio::test]
async fn test_incremental_equals_rescan() {
    let (_tmp, state) = create_test_state();
    let shipment = register_frozen_shipment(&state).await;
    let id = &shipment.shipment_id;
    advance_to_in_transit(&state, id).await;

    // 乱序到达的读数（含越界）
    for (temp, minutes) in [
        (-19.0, 30),
        (-18.5, 10),
        (-17.5, 50), // 警告
        (-20.0, 20),
        (-16.0, 40), // 严重
        (-19.5, 0),
    ] {
        state
            .monitor_api
            .submit_reading(device_reading(id, temp, minutes))
            .await
            .unwrap();
    }

    // 增量快照
    let incremental = state.query_api.get_stats(id, None).unwrap();

    // 全量重扫（开边界窗口走重扫路径）
    let rescan = state
        .query_api
        .get_stats(id, Some(StatsWindow::default()))
        .unwrap();

    assert_eq!(incremental.count, rescan.count);
    assert_eq!(incremental.temp_min, rescan.temp_min);
    assert_eq!(incremental.temp_min_at, rescan.temp_min_at);
    assert_eq!(incremental.temp_max, rescan.temp_max);
    assert_eq!(incremental.temp_max_at, rescan.temp_max_at);
    assert_eq!(incremental.alert_reading_count, rescan.alert_reading_count);
    assert!((incremental.temp_avg.unwrap() - rescan.temp_avg.unwrap()).abs() < 1e-9);

    // 数值断言
    assert_eq!(incremental.count, 6);
    assert_eq!(incremental.temp_min, Some(-20.0));
    assert_eq!(incremental.temp_max, Some(-16.0));
    assert_eq!(incremental.alert_reading_count, 2);

    // 从读数列表重算作为第三重校验
    let page = state.query_api.list_readings(id, 1, 100).unwrap();
    let recomputed = StatsEngine::compute_from_readings(id, &page.items);
    assert_eq!(recomputed.count, incremental.count);
    assert_eq!(recomputed.temp_min, incremental.temp_min);
    assert_eq!(recomputed.temp_max, incremental.temp_max);
    assert_eq!(recomputed.alert_reading_count, incremental.alert_reading_count);
}

// ==========================================
// min/max 平局取最早采样时间
// ==========================================
#[tokio::test]
async fn test_min_tie_resolves_to_earliest_reading() {
    let (_tmp, state) = create_test_state();
    let shipment = register_frozen_shipment(&state).await;
    let id = &shipment.shipment_id;

    // 最低温 -20.0 出现两次：晚读数先到
    state
        .monitor_api
        .submit_reading(device_reading(id, -20.0, 40))
        .await
        .unwrap();
    state
        .monitor_api
        .submit_reading(device_reading(id, -19.0, 20))
        .await
        .unwrap();
    // 乱序到达的更早的同值读数
    state
        .monitor_api
        .submit_reading(device_reading(id, -20.0, 5))
        .await
        .unwrap();

    let stats = state.query_api.get_stats(id, None).unwrap();
    assert_eq!(stats.temp_min, Some(-20.0));
    assert_eq!(stats.temp_min_at, Some(minutes_after(5)), "平局必须取最早采样时间");
}

// ==========================================
// 窗口统计
// ==========================================
#[tokio::test]
async fn test_windowed_stats() {
    let (_tmp, state) = create_test_state();
    let shipment = register_frozen_shipment(&state).await;
    let id = &shipment.shipment_id;

    for (temp, minutes) in [(-19.0, 0), (-17.5, 10), (-20.0, 20), (-18.0, 30)] {
        state
            .monitor_api
            .submit_reading(device_reading(id, temp, minutes))
            .await
            .unwrap();
    }

    // 窗口 [10, 20]：只含 -17.5 与 -20.0
    let window = StatsWindow {
        from: Some(minutes_after(10)),
        to: Some(minutes_after(20)),
    };
    let stats = state.query_api.get_stats(id, Some(window)).unwrap();

    assert_eq!(stats.count, 2);
    assert_eq!(stats.temp_min, Some(-20.0));
    assert_eq!(stats.temp_max, Some(-17.5));
    assert_eq!(stats.alert_reading_count, 1);

    // 半开窗口 [25, ∞)
    let window = StatsWindow {
        from: Some(minutes_after(25)),
        to: None,
    };
    let stats = state.query_api.get_stats(id, Some(window)).unwrap();
    assert_eq!(stats.count, 1);
    assert_eq!(stats.temp_min, Some(-18.0));
}

// ==========================================
// 空统计
// ==========================================
#[tokio::test]
async fn test_stats_without_readings() {
    let (_tmp, state) = create_test_state();
    let shipment = register_frozen_shipment(&state).await;

    let stats = state
        .query_api
        .get_stats(&shipment.shipment_id, None)
        .unwrap();
    assert_eq!(stats.count, 0);
    assert!(stats.temp_min.is_none());
    assert!(stats.temp_avg.is_none());
    assert_eq!(stats.alert_reading_count, 0);
}

// ==========================================
// 湿度均值（单独计数）
// ==========================================
#[tokio::test]
async fn test_humidity_average_counts_only_sampled() {
    let (_tmp, state) = create_test_state();
    let shipment = register_frozen_shipment(&state).await;
    let id = &shipment.shipment_id;

    state
        .monitor_api
        .submit_reading(test_helpers::device_reading_with_humidity(id, -19.0, 40.0, 0))
        .await
        .unwrap();
    state
        .monitor_api
        .submit_reading(device_reading(id, -19.0, 10)) // 无湿度
        .await
        .unwrap();
    state
        .monitor_api
        .submit_reading(test_helpers::device_reading_with_humidity(id, -19.0, 60.0, 20))
        .await
        .unwrap();

    let stats = state.query_api.get_stats(id, None).unwrap();
    assert_eq!(stats.count, 3);
    assert!((stats.humidity_avg.unwrap() - 50.0).abs() < 1e-9);
}
