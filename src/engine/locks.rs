// ==========================================
// 冷链运输监控系统 - 运单级互斥锁
// ==========================================
// 职责: 同一运单的全部变更（入库/判级/状态推进/统计）串行化
// 说明: 不同运单完全并行；读操作不走锁，只见已提交数据
// ==========================================

use crate::engine::error::{EngineError, EngineResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

// ==========================================
// ShipmentLocks - 运单锁注册表
// ==========================================
// 临界区覆盖 await 点，因此用 tokio::sync::Mutex
#[derive(Default)]
pub struct ShipmentLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ShipmentLocks {
    /// 创建新的锁注册表
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// 获取运单独占临界区（持有返回的 guard 期间该运单串行）
    pub async fn acquire(&self, shipment_id: &str) -> EngineResult<OwnedMutexGuard<()>> {
        let lock = {
            let mut map = self
                .inner
                .lock()
                .map_err(|e| EngineError::Internal(format!("锁注册表获取失败: {}", e)))?;
            map.entry(shipment_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        Ok(lock.lock_owned().await)
    }
}
