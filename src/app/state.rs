// ==========================================
// 冷链运输监控系统 - 服务状态
// ==========================================
// 职责: 管理服务级别的共享状态和API实例
// 说明: 存储为显式注入的进程内状态，不使用模块级单例
// ==========================================

use std::error::Error;
use std::sync::{Arc, Mutex};

use crate::api::{MonitorApi, QueryApi};
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection_with_timeout, DEFAULT_BUSY_TIMEOUT_MS};
use crate::engine::{
    AlertClassifier, MonitorEventPublisher, OptionalEventPublisher, RangePolicyResolver,
    ReadingIngestor, ShipmentLocks, StatsEngine, TimelineEngine,
};
use crate::importer::DeviceLogImporter;
use crate::repository::{
    AlertRepository, ReadingRepository, ShipmentRepository, StatsRepository, TimelineRepository,
};

/// 服务状态
///
/// 包含所有API实例和共享资源
pub struct ServiceState {
    /// 数据库路径
    pub db_path: String,

    /// 监控写入 API
    pub monitor_api: Arc<MonitorApi<ConfigManager>>,

    /// 查询投影 API
    pub query_api: Arc<QueryApi>,

    /// 设备日志导入器
    pub importer: Arc<DeviceLogImporter<ConfigManager>>,

    /// 配置管理器
    pub config: Arc<ConfigManager>,
}

impl ServiceState {
    /// 创建服务状态（默认写入等待上限，无事件发布者）
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        Self::with_options(db_path, DEFAULT_BUSY_TIMEOUT_MS, None)
    }

    /// 创建服务状态（接入通知系统）
    pub fn with_event_publisher(
        db_path: &str,
        publisher: Arc<dyn MonitorEventPublisher>,
    ) -> Result<Self, Box<dyn Error>> {
        Self::with_options(db_path, DEFAULT_BUSY_TIMEOUT_MS, Some(publisher))
    }

    /// 创建服务状态
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    /// - busy_timeout_ms: 写入等待上限（到期返回 PersistenceTimeout）
    /// - publisher: 监控事件发布者（通知系统适配器）
    pub fn with_options(
        db_path: &str,
        busy_timeout_ms: u64,
        publisher: Option<Arc<dyn MonitorEventPublisher>>,
    ) -> Result<Self, Box<dyn Error>> {
        // === 共享连接与 schema 初始化 ===
        let conn = open_sqlite_connection_with_timeout(db_path, busy_timeout_ms)?;
        init_schema(&conn)?;
        let conn = Arc::new(Mutex::new(conn));

        // === 仓储层 ===
        let shipment_repo = Arc::new(ShipmentRepository::from_connection(conn.clone()));
        let reading_repo = Arc::new(ReadingRepository::from_connection(conn.clone()));
        let alert_repo = Arc::new(AlertRepository::from_connection(conn.clone()));
        let timeline_repo = Arc::new(TimelineRepository::from_connection(conn.clone()));
        let stats_repo = Arc::new(StatsRepository::from_connection(conn.clone()));

        // === 配置层 ===
        let config = Arc::new(ConfigManager::from_connection(conn)?);

        // === 事件发布 ===
        let events = match publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };

        // === 引擎层 ===
        let locks = Arc::new(ShipmentLocks::new());
        let resolver = Arc::new(RangePolicyResolver::new(config.clone()));
        let timeline = Arc::new(TimelineEngine::new(
            shipment_repo.clone(),
            timeline_repo.clone(),
            events.clone(),
        ));
        let classifier = Arc::new(AlertClassifier::new(
            alert_repo.clone(),
            timeline_repo.clone(),
            timeline.clone(),
            events,
        ));
        let stats = Arc::new(StatsEngine::new(reading_repo.clone(), stats_repo));
        let ingestor = Arc::new(ReadingIngestor::new(
            shipment_repo.clone(),
            reading_repo.clone(),
            resolver.clone(),
            classifier,
            stats.clone(),
            locks.clone(),
        ));

        // === API 层 ===
        let monitor_api = Arc::new(MonitorApi::new(
            shipment_repo.clone(),
            timeline_repo.clone(),
            resolver,
            ingestor.clone(),
            timeline,
            locks,
        ));
        let query_api = Arc::new(QueryApi::new(
            shipment_repo,
            reading_repo,
            alert_repo,
            timeline_repo,
            stats,
        ));
        let importer = Arc::new(DeviceLogImporter::new(ingestor));

        Ok(Self {
            db_path: db_path.to_string(),
            monitor_api,
            query_api,
            importer,
            config,
        })
    }
}

/// 默认数据库路径（用户数据目录下）
pub fn get_default_db_path() -> String {
    let base = dirs::data_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
    base.join("cold-chain-monitor")
        .join("monitor.db")
        .to_string_lossy()
        .to_string()
}
