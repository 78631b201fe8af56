// ==========================================
// 时间线状态机测试
// ==========================================
// 测试范围:
// 1. 合法转移路径与非法转移拒绝
// 2. 终态后一律拒绝（事件与读数）
// 3. 序号严格递增且全序
// ==========================================

mod test_helpers;

use cold_chain_monitor::api::ApiError;
use cold_chain_monitor::domain::timeline::AdvanceRequest;
use cold_chain_monitor::domain::types::ShipmentStatus;
use test_helpers::{
    advance_to_in_transit, create_test_state, device_reading, register_frozen_shipment,
};

/// 推进辅助
async fn advance(
    state: &cold_chain_monitor::app::ServiceState,
    shipment_id: &str,
    status: ShipmentStatus,
    location: &str,
) -> Result<cold_chain_monitor::domain::timeline::TimelineEvent, ApiError> {
    state
        .monitor_api
        .advance_shipment(AdvanceRequest {
            shipment_id: shipment_id.to_string(),
            new_status: status,
            location: location.to_string(),
            occurred_at: None,
            note: None,
        })
        .await
}

// ==========================================
// 完整正向路径 + 序号严格递增
// ==========================================
#[tokio::test]
async fn test_forward_path_with_increasing_seq() {
    let (_tmp, state) = create_test_state();
    let shipment = register_frozen_shipment(&state).await;
    let id = &shipment.shipment_id;

    advance(&state, id, ShipmentStatus::Processing, "上海冷库").await.unwrap();
    advance(&state, id, ShipmentStatus::PickedUp, "上海冷库").await.unwrap();
    advance(&state, id, ShipmentStatus::InTransit, "G2 高速").await.unwrap();
    // 在途位置更新可重复
    advance(&state, id, ShipmentStatus::InTransit, "济南服务区").await.unwrap();
    advance(&state, id, ShipmentStatus::Delivered, "北京配送中心").await.unwrap();

    let timeline = state.query_api.list_timeline(id).unwrap();
    // 注册事件(CREATED) + 5 次推进
    assert_eq!(timeline.len(), 6);

    // 序号严格递增
    for pair in timeline.windows(2) {
        assert!(pair[1].seq > pair[0].seq, "seq 必须严格递增");
    }
    assert_eq!(timeline[0].status, ShipmentStatus::Created);
    assert_eq!(timeline[5].status, ShipmentStatus::Delivered);

    let current = state.query_api.get_shipment(id).unwrap().unwrap();
    assert_eq!(current.status, ShipmentStatus::Delivered);
}

// ==========================================
// 非法转移拒绝
// ==========================================
#[tokio::test]
async fn test_illegal_transitions_rejected() {
    let (_tmp, state) = create_test_state();
    let shipment = register_frozen_shipment(&state).await;
    let id = &shipment.shipment_id;

    // CREATED 不能直接在途/送达
    for target in [ShipmentStatus::InTransit, ShipmentStatus::Delivered, ShipmentStatus::AtRisk] {
        let err = advance(&state, id, target, "上海").await.unwrap_err();
        assert!(
            matches!(err, ApiError::IllegalTransition { .. }),
            "期望 IllegalTransition，实际 {:?}",
            err
        );
    }

    // 非法转移不产生事件
    let timeline = state.query_api.list_timeline(id).unwrap();
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].status, ShipmentStatus::Created);
}

// ==========================================
// 终态后拒绝一切事件与读数
// ==========================================
#[tokio::test]
async fn test_terminal_rejects_events_and_readings() {
    let (_tmp, state) = create_test_state();
    let shipment = register_frozen_shipment(&state).await;
    let id = &shipment.shipment_id;

    advance_to_in_transit(&state, id).await;
    advance(&state, id, ShipmentStatus::Delivered, "北京配送中心").await.unwrap();

    // 终态后推进 → ShipmentTerminal
    let err = advance(&state, id, ShipmentStatus::InTransit, "北京").await.unwrap_err();
    assert!(matches!(err, ApiError::ShipmentTerminal(_)));

    let err = advance(&state, id, ShipmentStatus::Cancelled, "北京").await.unwrap_err();
    assert!(matches!(err, ApiError::ShipmentTerminal(_)));

    // 终态后读数 → ShipmentTerminal
    let err = state
        .monitor_api
        .submit_reading(device_reading(id, -19.0, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ShipmentTerminal(_)));
}

// ==========================================
// 取消可从任何非终态进入
// ==========================================
#[tokio::test]
async fn test_cancel_from_any_nonterminal_state() {
    // 刚注册即取消
    let (_tmp, state) = create_test_state();
    let shipment = register_frozen_shipment(&state).await;
    advance(&state, &shipment.shipment_id, ShipmentStatus::Cancelled, "上海").await.unwrap();

    let current = state
        .query_api
        .get_shipment(&shipment.shipment_id)
        .unwrap()
        .unwrap();
    assert_eq!(current.status, ShipmentStatus::Cancelled);

    // 在途取消
    let shipment2 = register_frozen_shipment(&state).await;
    advance_to_in_transit(&state, &shipment2.shipment_id).await;
    advance(&state, &shipment2.shipment_id, ShipmentStatus::Cancelled, "济南").await.unwrap();

    let current = state
        .query_api
        .get_shipment(&shipment2.shipment_id)
        .unwrap()
        .unwrap();
    assert_eq!(current.status, ShipmentStatus::Cancelled);
}

// ==========================================
// 提货直达（PICKED_UP → DELIVERED 短驳场景）
// ==========================================
#[tokio::test]
async fn test_delivered_directly_from_picked_up() {
    let (_tmp, state) = create_test_state();
    let shipment = register_frozen_shipment(&state).await;
    let id = &shipment.shipment_id;

    advance(&state, id, ShipmentStatus::Processing, "上海冷库").await.unwrap();
    advance(&state, id, ShipmentStatus::PickedUp, "上海冷库").await.unwrap();
    advance(&state, id, ShipmentStatus::Delivered, "同城仓").await.unwrap();

    let current = state.query_api.get_shipment(id).unwrap().unwrap();
    assert_eq!(current.status, ShipmentStatus::Delivered);
}

// ==========================================
// 不存在的运单
// ==========================================
#[tokio::test]
async fn test_advance_unknown_shipment() {
    let (_tmp, state) = create_test_state();

    let err = advance(&state, "no-such-shipment", ShipmentStatus::Processing, "上海")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}
