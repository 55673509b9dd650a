// ==========================================
// 商品批量导入 - 命令行入口
// ==========================================
// 用法:
//   catalog-bulk-import template <create|edit> [列...]
//   catalog-bulk-import check <create|edit> <file.csv>
//   catalog-bulk-import run <create|edit> <file.csv>
// Ctrl-C: 协作式取消当前运行（已提交行保留结果）
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use catalog_bulk_import::config::{ConfigManager, ImportConfigReader};
use catalog_bulk_import::importer::{BulkImporter, ImportError, ParsedFile};
use catalog_bulk_import::{i18n, logging, HttpCatalogClient, ImportMode, ProductColumn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

fn print_usage() {
    println!("{} {}", catalog_bulk_import::APP_NAME, catalog_bulk_import::VERSION);
    println!();
    println!("用法:");
    println!("  catalog-bulk-import template <create|edit> [列...]   生成导入模板");
    println!("  catalog-bulk-import check <create|edit> <file.csv>   仅校验，不提交");
    println!("  catalog-bulk-import run <create|edit> <file.csv>     校验并提交");
    println!();
    println!("配置: $CATALOG_IMPORT_CONFIG 或 <config_dir>/catalog-bulk-import/config.toml");
}

fn parse_mode(arg: Option<&String>) -> Result<ImportMode> {
    let raw = arg.ok_or_else(|| anyhow!("缺少导入模式（create/edit）"))?;
    raw.parse::<ImportMode>().map_err(|e| anyhow!(e))
}

fn parse_columns(args: &[String]) -> Result<Vec<ProductColumn>> {
    args.iter()
        .map(|key| ProductColumn::from_key(key).ok_or_else(|| anyhow!("未知列: {}", key)))
        .collect()
}

/// 文件级错误以本地化文本呈现
fn file_error(err: ImportError) -> anyhow::Error {
    anyhow!(err.user_message())
}

fn print_preview(parsed: &ParsedFile) {
    println!(
        "模式: {} | 有效行: {} | 无效行: {} | 带警告行: {}",
        parsed.mode,
        parsed.valid_count(),
        parsed.invalid_count(),
        parsed.warning_count()
    );
    if !parsed.unknown_columns.is_empty() {
        println!("忽略的未知列: {}", parsed.unknown_columns.join(", "));
    }
    for row in parsed.invalid_rows() {
        println!("  [行 {}] {}", row.row_number, row.errors.join("; "));
    }
    for row in parsed.rows.iter().filter(|r| !r.warnings.is_empty()) {
        println!("  [行 {}] 警告: {}", row.row_number, row.warnings.join("; "));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        print_usage();
        return Ok(());
    };
    if matches!(command.as_str(), "-h" | "--help" | "help") {
        print_usage();
        return Ok(());
    }

    let config = ConfigManager::load().context("加载配置失败")?;
    i18n::set_locale(&config.get_locale());

    let client = Arc::new(HttpCatalogClient::from_config(&config));
    let importer = Arc::new(BulkImporter::new(client.clone(), client, &config));

    match command.as_str() {
        "template" => {
            let mode = parse_mode(args.get(1))?;
            let columns = parse_columns(args.get(2..).unwrap_or_default())?;
            let path = match mode {
                ImportMode::Create => importer.write_create_template(&columns)?,
                ImportMode::Edit => importer.download_edit_template(&columns).await?,
            };
            println!("模板已生成: {}", path.display());
        }

        "check" => {
            let mode = parse_mode(args.get(1))?;
            let file = args.get(2).map(PathBuf::from).ok_or_else(|| anyhow!("缺少 CSV 文件路径"))?;
            let parsed = importer.parse_file(mode, &file).await.map_err(file_error)?;
            print_preview(&parsed);
        }

        "run" => {
            let mode = parse_mode(args.get(1))?;
            let file = args.get(2).map(PathBuf::from).ok_or_else(|| anyhow!("缺少 CSV 文件路径"))?;
            let parsed = importer.parse_file(mode, &file).await.map_err(file_error)?;
            print_preview(&parsed);

            // Ctrl-C → 取消
            let control = importer.control();
            let interrupt = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("收到中断信号，正在取消导入");
                    control.cancel();
                }
            });

            // 进度输出
            let observer = Arc::clone(&importer);
            let ticker = tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(2));
                loop {
                    interval.tick().await;
                    let state = observer.progress();
                    if state.is_processing {
                        info!(
                            processed = state.processing_index,
                            valid = state.valid_row_count,
                            percent = state.progress_percent(),
                            "导入进度"
                        );
                    }
                }
            });

            let outcome = importer.start_processing().await;
            interrupt.abort();
            ticker.abort();
            outcome?;

            let summary = importer.summary();
            println!(
                "合计: {} | 创建: {} | 更新: {} | 失败: {} | 跳过: {}",
                summary.total, summary.created, summary.updated, summary.errors, summary.skipped
            );
            if importer.progress().is_cancelled {
                println!("导入已取消，未处理的行不计入结果");
            }
            if let Some(path) = importer.write_error_report()? {
                println!("错误报告: {}", path.display());
            }
        }

        other => {
            print_usage();
            bail!("未知命令: {}", other);
        }
    }

    Ok(())
}
