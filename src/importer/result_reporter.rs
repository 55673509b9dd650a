// ==========================================
// 商品批量导入 - 结果汇总与报表
// ==========================================
// 职责:
//   - 汇总: 每次按结果列表现算，不单独计数
//   - 错误报告: 仅失败行，列 {row, name, sku, status, error}；无失败时不产出
//   - create 模板: 选定列（必填列必含）+ 两行示例
//   - 文件写出: UTF-8 BOM + 带日期的文件名
// ==========================================

use crate::domain::column::{ProductColumn, COLUMN_CATALOG};
use crate::domain::product::{ImportSummary, ProcessingResult};
use crate::domain::types::{ImportMode, RowAction};
use crate::i18n::t;
use crate::importer::csv_codec::generate;
use crate::importer::error::ImportResult;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::info;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 汇总
///
/// errors 只计未跳过的失败行，保证 total == created + updated + errors + skipped
pub fn summarize(results: &[ProcessingResult]) -> ImportSummary {
    let mut summary = ImportSummary {
        total: results.len(),
        ..ImportSummary::default()
    };
    for r in results {
        match (r.success, r.action) {
            (_, RowAction::Skipped) => summary.skipped += 1,
            (true, RowAction::Created) => summary.created += 1,
            (true, RowAction::Updated) => summary.updated += 1,
            (false, _) => summary.errors += 1,
        }
    }
    summary
}

/// 失败行（含跳过行）
pub fn failed_results(results: &[ProcessingResult]) -> Vec<&ProcessingResult> {
    results.iter().filter(|r| !r.success).collect()
}

/// 错误报告 CSV
///
/// # 返回
/// - Ok(None): 无失败行
pub fn error_report_csv(results: &[ProcessingResult]) -> ImportResult<Option<String>> {
    let failed = failed_results(results);
    if failed.is_empty() {
        return Ok(None);
    }

    let headers = [
        t("report.header_row"),
        t("report.header_name"),
        t("report.header_sku"),
        t("report.header_status"),
        t("report.header_error"),
    ];
    let rows: Vec<Vec<String>> = failed
        .iter()
        .map(|r| {
            let status = if r.action == RowAction::Skipped {
                t("report.status_skipped")
            } else {
                t("report.status_error")
            };
            vec![
                r.row_number.to_string(),
                r.product_name.clone(),
                r.sku.clone(),
                status,
                r.error.clone().unwrap_or_default(),
            ]
        })
        .collect();

    generate(&headers, &rows).map(Some)
}

/// create 模板的实际列: 选定列 ∪ 必填列，目录顺序，排除 edit 专用列
pub fn template_columns(mode: ImportMode, selected: &[ProductColumn]) -> Vec<ProductColumn> {
    COLUMN_CATALOG
        .iter()
        .filter(|d| mode == ImportMode::Edit || !d.edit_only)
        .filter(|d| d.required || selected.contains(&d.column) || (d.edit_only && mode == ImportMode::Edit))
        .map(|d| d.column)
        .collect()
}

/// create 模板 CSV（表头 + 两行示例）
pub fn create_template_csv(selected: &[ProductColumn]) -> ImportResult<String> {
    let columns = template_columns(ImportMode::Create, selected);
    let headers: Vec<&str> = columns.iter().map(|c| c.key()).collect();
    let rows: Vec<Vec<String>> = (0..2)
        .map(|i| columns.iter().map(|c| c.sample_values()[i].to_string()).collect())
        .collect();

    generate(&headers, &rows)
}

pub fn template_file_name(mode: ImportMode, date: NaiveDate) -> String {
    let label = match mode {
        ImportMode::Create => "crear",
        ImportMode::Edit => "editar",
    };
    format!("plantilla_productos_{}_{}.csv", label, date.format("%Y-%m-%d"))
}

pub fn error_report_file_name(date: NaiveDate) -> String {
    format!("errores_importacion_{}.csv", date.format("%Y-%m-%d"))
}

/// 写出文件，开头补 UTF-8 BOM（已有则不重复）
pub fn write_with_bom(path: &Path, content: &[u8]) -> ImportResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut bytes = Vec::with_capacity(content.len() + UTF8_BOM.len());
    if !content.starts_with(UTF8_BOM) {
        bytes.extend_from_slice(UTF8_BOM);
    }
    bytes.extend_from_slice(content);
    std::fs::write(path, bytes)?;

    info!(path = %path.display(), bytes = content.len(), "文件已写出");
    Ok(())
}

/// 写出错误报告
///
/// # 返回
/// - Ok(None): 无失败行，不写文件
pub fn write_error_report(
    results: &[ProcessingResult],
    output_dir: &Path,
    date: NaiveDate,
) -> ImportResult<Option<PathBuf>> {
    let Some(csv) = error_report_csv(results)? else {
        return Ok(None);
    };
    let path = output_dir.join(error_report_file_name(date));
    write_with_bom(&path, csv.as_bytes())?;
    Ok(Some(path))
}
