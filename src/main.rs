// ==========================================
// 冷链运输监控系统 - 命令行入口
// ==========================================
// 用途: 数据库初始化 / 设备日志导入 / 运单状态查看
// 技术栈: Rust + SQLite
// ==========================================

use cold_chain_monitor::app::{get_default_db_path, ServiceState};
use cold_chain_monitor::logging;
use std::path::Path;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", cold_chain_monitor::APP_NAME);
    tracing::info!("系统版本: {}", cold_chain_monitor::VERSION);
    tracing::info!("==================================================");

    let args: Vec<String> = std::env::args().collect();
    let db_path = std::env::var("MONITOR_DB_PATH").unwrap_or_else(|_| get_default_db_path());

    if let Some(parent) = Path::new(&db_path).parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::error!("数据目录创建失败: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let state = match ServiceState::new(&db_path) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("服务初始化失败: {}", e);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("使用数据库: {}", db_path);

    match args.get(1).map(|s| s.as_str()) {
        Some("init") => {
            // ServiceState::new 已完成 schema 初始化
            tracing::info!("数据库初始化完成");
            ExitCode::SUCCESS
        }
        Some("import") => {
            let Some(file) = args.get(2) else {
                eprintln!("用法: cold-chain-monitor import <设备日志文件> [运单ID]");
                return ExitCode::FAILURE;
            };
            let default_shipment = args.get(3).map(|s| s.as_str());

            match state
                .importer
                .import_file(Path::new(file), default_shipment)
                .await
            {
                Ok(report) => {
                    tracing::info!(
                        "导入完成: 总行数={}, 新入库={}, 重传去重={}, 拒绝={}",
                        report.total_rows,
                        report.imported_rows,
                        report.duplicate_rows,
                        report.rejected_rows
                    );
                    for err in &report.errors {
                        tracing::warn!("行 {}: {}", err.row_number, err.message);
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    tracing::error!("导入失败: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Some("status") => {
            let Some(shipment_id) = args.get(2) else {
                eprintln!("用法: cold-chain-monitor status <运单ID>");
                return ExitCode::FAILURE;
            };

            match show_status(&state, shipment_id) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    tracing::error!("查询失败: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        _ => {
            println!("用法: cold-chain-monitor <命令>");
            println!();
            println!("命令:");
            println!("  init                      初始化数据库");
            println!("  import <文件> [运单ID]    导入设备日志 (.csv/.xlsx)");
            println!("  status <运单ID>           查看运单状态/统计/打开告警");
            println!();
            println!("环境变量:");
            println!("  MONITOR_DB_PATH           数据库文件路径（默认: 用户数据目录）");
            ExitCode::SUCCESS
        }
    }
}

/// 打印运单概览
fn show_status(
    state: &ServiceState,
    shipment_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(shipment) = state.query_api.get_shipment(shipment_id)? else {
        println!("运单不存在: {}", shipment_id);
        return Ok(());
    };

    println!("运单 {}", shipment.shipment_id);
    println!("  货物类型: {}", shipment.cargo_type);
    println!("  当前状态: {}", shipment.status);
    println!("  路线: {} → {}", shipment.origin, shipment.destination);

    let stats = state.query_api.get_stats(shipment_id, None)?;
    println!(
        "  读数: {} 条 (min={:?} avg={:?} max={:?}, 告警读数 {})",
        stats.count, stats.temp_min, stats.temp_avg, stats.temp_max, stats.alert_reading_count
    );

    let alerts = state.query_api.list_open_alerts(Some(shipment_id))?;
    println!("  打开告警: {} 条", alerts.len());
    for alert in alerts {
        println!(
            "    [{}] {} opened_at={} last_seen={}",
            alert.severity, alert.metric, alert.opened_at, alert.last_seen_at
        );
    }

    Ok(())
}
