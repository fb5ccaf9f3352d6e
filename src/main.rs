// ==========================================
// 注塑排产管理系统 - 运维入口
// ==========================================
// 用法:
//   injection-molding-aps init
//   injection-molding-aps import-calendar <节假日文件.csv|.json>
//   injection-molding-aps timeline <生产区域> <起始日期> <结束日期>
// 数据库路径: INJECTION_APS_DB_PATH 环境变量或用户数据目录
// ==========================================

use injection_molding_aps::api::smart_schedule_api::AreaTimelineRequest;
use injection_molding_aps::app::{get_default_db_path, AppState};

fn main() {
    injection_molding_aps::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", injection_molding_aps::APP_NAME);
    tracing::info!("系统版本: {}", injection_molding_aps::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let state = match AppState::new(db_path) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("AppState初始化失败: {}", e);
            std::process::exit(1);
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let exit_code = match args.first().map(String::as_str) {
        None | Some("init") => {
            // AppState::new 已完成建表
            tracing::info!("数据库结构就绪");
            0
        }
        Some("import-calendar") => match args.get(1) {
            Some(file_path) => match state.calendar_api.import_holidays(file_path, "cli") {
                Ok(result) => {
                    tracing::info!(
                        imported = result.imported,
                        skipped = result.skipped,
                        "{}",
                        result.message
                    );
                    0
                }
                Err(e) => {
                    tracing::error!("导入失败: {}", e);
                    1
                }
            },
            None => {
                tracing::error!("缺少参数: import-calendar <节假日文件>");
                2
            }
        },
        Some("timeline") => match (args.get(1), args.get(2), args.get(3)) {
            (Some(area), Some(from), Some(to)) => {
                let request = AreaTimelineRequest {
                    production_area: area.clone(),
                    date_from: from.clone(),
                    date_to: to.clone(),
                };
                match state.smart_schedule_api.get_area_timeline(request) {
                    Ok(timelines) => {
                        match serde_json::to_string_pretty(&timelines) {
                            Ok(json) => println!("{}", json),
                            Err(e) => tracing::error!("序列化失败: {}", e),
                        }
                        0
                    }
                    Err(e) => {
                        tracing::error!("查询失败: {}", e);
                        1
                    }
                }
            }
            _ => {
                tracing::error!("缺少参数: timeline <生产区域> <起始日期> <结束日期>");
                2
            }
        },
        Some(other) => {
            tracing::error!("未知命令: {}", other);
            2
        }
    };

    std::process::exit(exit_code);
}
