// ==========================================
// 商品批量导入 - 商品领域模型
// ==========================================
// 职责: 导入管道的中间产物与结果
// 流程: 原始行 → ParsedRow（含 ProductPayload）→ ProcessingResult → ImportSummary
// ==========================================

use crate::domain::types::{ImportMode, RowAction, RunPhase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 原始 CSV 行（表头 → 去空白后的值）
pub type RawRow = HashMap<String, String>;

// ==========================================
// ProductPayload - 已校验的商品字段记录
// ==========================================
// 用途: 直接序列化为远端 create/update 请求体
// 红线: 价格只会写入 price / price_without_tax 其中之一
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPayload {
    // ===== 标识（不进入请求体，用于 update 路径）=====
    #[serde(skip)]
    pub id: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,

    // ===== 价格 =====
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_without_tax: Option<f64>,

    // ===== 库存 =====
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlimited_stock: Option<bool>,

    // ===== 内容 =====
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_short: Option<String>,

    // ===== 分类 =====
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gamma_id: Option<i64>,

    // ===== 状态 =====
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,

    // ===== SEO =====
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    // ===== 尺寸 =====
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions_unit: Option<String>,
}

// ==========================================
// ParsedRow - 单行校验/映射结果
// ==========================================
// 不变式: is_valid ⇔ errors.is_empty()
// 生命周期: 由 RowMapper 产出一次，之后只读
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedRow {
    pub row_number: usize, // 文件行号（数据行从 2 开始，第 1 行为表头）
    pub raw: RawRow,
    pub mapped: ProductPayload,
    pub errors: Vec<String>,   // 阻断错误
    pub warnings: Vec<String>, // 引用解析警告（不阻断）
    pub is_valid: bool,
}

impl ParsedRow {
    pub fn new(
        row_number: usize,
        raw: RawRow,
        mapped: ProductPayload,
        errors: Vec<String>,
        warnings: Vec<String>,
    ) -> Self {
        let is_valid = errors.is_empty();
        Self {
            row_number,
            raw,
            mapped,
            errors,
            warnings,
            is_valid,
        }
    }

    /// 原始 SKU（报告用）
    pub fn raw_sku(&self) -> String {
        self.raw.get("sku").cloned().unwrap_or_default()
    }

    /// 原始商品名（报告用）
    pub fn raw_name(&self) -> String {
        self.raw.get("nombre").cloned().unwrap_or_default()
    }
}

// ==========================================
// ProcessingResult - 单行处理结果
// ==========================================
// 每个已尝试或被跳过的行恰好产生一条
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub row_number: usize,
    pub sku: String,
    pub product_name: String,
    pub success: bool,
    pub action: RowAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessingResult {
    /// 远端成功
    pub fn succeeded(row: &ParsedRow, action: RowAction, product_id: Option<i64>) -> Self {
        Self {
            row_number: row.row_number,
            sku: row.raw_sku(),
            product_name: row.raw_name(),
            success: true,
            action,
            product_id,
            error: None,
        }
    }

    /// 远端失败（重试耗尽或被拒绝）
    pub fn failed(row: &ParsedRow, action: RowAction, error: String) -> Self {
        Self {
            row_number: row.row_number,
            sku: row.raw_sku(),
            product_name: row.raw_name(),
            success: false,
            action,
            product_id: None,
            error: Some(error),
        }
    }

    /// 未发起远端调用即跳过
    pub fn skipped(row: &ParsedRow, error: String) -> Self {
        Self::failed(row, RowAction::Skipped, error)
    }
}

// ==========================================
// ImportSummary - 导入汇总（派生，不独立存储）
// ==========================================
// 不变式: total == created + updated + errors + skipped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub errors: usize,
    pub skipped: usize,
}

// ==========================================
// RunState - 执行器运行状态快照
// ==========================================
// 写入者: 仅 BatchExecutor；观察者只能拿到快照副本
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: Option<String>,
    pub mode: Option<ImportMode>,
    pub phase: RunPhase,
    pub is_processing: bool,
    pub is_paused: bool,
    pub is_cancelled: bool,
    pub processing_index: usize, // 已开始处理的有效行数
    pub valid_row_count: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunState {
    /// 进度百分比（无有效行时为 0）
    pub fn progress_percent(&self) -> u32 {
        if self.valid_row_count == 0 {
            return 0;
        }
        ((self.processing_index as f64 / self.valid_row_count as f64) * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_row_validity_follows_errors() {
        let ok = ParsedRow::new(2, RawRow::new(), ProductPayload::default(), vec![], vec!["w".into()]);
        assert!(ok.is_valid);

        let bad = ParsedRow::new(3, RawRow::new(), ProductPayload::default(), vec!["e".into()], vec![]);
        assert!(!bad.is_valid);
    }

    #[test]
    fn test_payload_serializes_only_present_fields() {
        let payload = ProductPayload {
            id: Some(9),
            sku: Some("ABC-1".to_string()),
            price_without_tax: Some(49.9),
            ..Default::default()
        };
        let json = serde_json::to_value(&payload).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj.len(), 2);
        assert_eq!(obj["sku"], "ABC-1");
        assert_eq!(obj["price_without_tax"], 49.9);
        assert!(!obj.contains_key("price"));
        assert!(!obj.contains_key("id"));
    }

    #[test]
    fn test_progress_percent() {
        let mut state = RunState::default();
        assert_eq!(state.progress_percent(), 0);

        state.valid_row_count = 3;
        state.processing_index = 2;
        assert_eq!(state.progress_percent(), 67);
    }
}
