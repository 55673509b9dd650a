// ==========================================
// 商品批量导入 - 行校验 / 映射
// ==========================================
// 流程:
//   1. 文件级预检（一次）: create 必填列齐全；edit 至少有 id 或 sku
//   2. 逐行: 按列目录顺序处理已知列 → ProductPayload
//   3. 产品线在品牌之后解析
//   4. create 模式 SKU 去重（大小写不敏感，首行不报错）
// 红线: 单次纯映射，不重试、不回写；行级问题只记录不抛出
// ==========================================

use crate::domain::column::{required_columns, ColumnType, ProductColumn};
use crate::domain::product::{ParsedRow, ProductPayload, RawRow};
use crate::domain::types::{ImportMode, PricingMode};
use crate::i18n::{t, t_with_args};
use crate::importer::csv_codec::CsvTable;
use crate::importer::data_cleaner::{normalize_unit, parse_flag, parse_id, parse_number, UnitKind};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::reference_resolver::ReferenceIndices;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

/// 文件级预检
///
/// # 返回
/// - Err(MissingRequiredColumns): create 模式缺必填列（列出全部缺失列）
/// - Err(MissingIdentifierColumn): edit 模式既无 id 也无 sku
pub fn precheck_headers(headers: &[String], mode: ImportMode) -> ImportResult<()> {
    let has = |key: &str| headers.iter().any(|h| h == key);

    match mode {
        ImportMode::Create => {
            let missing: Vec<String> = required_columns()
                .into_iter()
                .map(ProductColumn::key)
                .filter(|key| !has(*key))
                .map(str::to_string)
                .collect();
            if !missing.is_empty() {
                return Err(ImportError::MissingRequiredColumns(missing));
            }
        }
        ImportMode::Edit => {
            if !has(ProductColumn::Id.key()) && !has(ProductColumn::Sku.key()) {
                return Err(ImportError::MissingIdentifierColumn);
            }
        }
    }
    Ok(())
}

// ==========================================
// ParsedFile - 预检通过后的解析结果（上传后预览）
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct ParsedFile {
    pub mode: ImportMode,
    pub headers: Vec<String>,
    pub unknown_columns: Vec<String>, // 不在列目录中的表头（被忽略）
    pub rows: Vec<ParsedRow>,
}

impl ParsedFile {
    pub fn valid_rows(&self) -> impl Iterator<Item = &ParsedRow> {
        self.rows.iter().filter(|r| r.is_valid)
    }

    pub fn invalid_rows(&self) -> impl Iterator<Item = &ParsedRow> {
        self.rows.iter().filter(|r| !r.is_valid)
    }

    pub fn valid_count(&self) -> usize {
        self.valid_rows().count()
    }

    pub fn invalid_count(&self) -> usize {
        self.invalid_rows().count()
    }

    /// 带警告的行数
    pub fn warning_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.warnings.is_empty()).count()
    }
}

// ==========================================
// RowMapper - 单行映射器
// ==========================================
// 持有同一文件内的 SKU 去重集合，须按文件行序调用
pub struct RowMapper<'a> {
    mode: ImportMode,
    indices: &'a ReferenceIndices,
    columns: Vec<ProductColumn>, // 表头中出现的已知列（目录顺序）
    seen_skus: HashSet<String>,
}

impl<'a> RowMapper<'a> {
    pub fn new(mode: ImportMode, indices: &'a ReferenceIndices, headers: &[String]) -> Self {
        let mut columns: Vec<ProductColumn> = headers
            .iter()
            .filter_map(|h| ProductColumn::from_key(h))
            // create 模式下 id 列忽略
            .filter(|c| mode == ImportMode::Edit || !c.definition().edit_only)
            .collect();
        columns.sort();
        columns.dedup();

        Self {
            mode,
            indices,
            columns,
            seen_skus: HashSet::new(),
        }
    }

    /// 映射一行
    ///
    /// # 参数
    /// - index: 数据行下标（0 起）；行号 = index + 2
    pub fn map_row(&mut self, index: usize, raw: RawRow) -> ParsedRow {
        let mut payload = ProductPayload::default();
        let mut errors: Vec<String> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        let mut gamma_name: Option<String> = None;

        for &column in &self.columns {
            let def = column.definition();
            let value = raw.get(def.key).map(|v| v.trim()).unwrap_or("");

            if value.is_empty() {
                if self.mode == ImportMode::Create && def.required {
                    errors.push(t_with_args("row.required", &[("label", def.label)]));
                }
                continue;
            }

            match column {
                ProductColumn::Price => match parse_number(value) {
                    None => errors.push(t_with_args("row.not_a_number", &[("label", def.label)])),
                    Some(n) if n < 0.0 => {
                        errors.push(t_with_args("row.negative_price", &[("label", def.label)]))
                    }
                    Some(n) => match self.indices.pricing_mode() {
                        PricingMode::WithTax => payload.price = Some(n),
                        PricingMode::WithoutTax => payload.price_without_tax = Some(n),
                    },
                },
                ProductColumn::Categories => {
                    let resolved = self.indices.resolve_categories(value);
                    if !resolved.ids.is_empty() {
                        payload.categories = Some(resolved.ids);
                    }
                    warnings.extend(resolved.warnings);
                }
                ProductColumn::Brand => {
                    let resolved = self.indices.resolve_brand(value);
                    payload.brand_id = resolved.id;
                    warnings.extend(resolved.warning);
                }
                ProductColumn::Gamma => gamma_name = Some(value.to_string()),
                ProductColumn::Id => match parse_id(value) {
                    Some(id) => payload.id = Some(id),
                    None => errors.push(t("row.invalid_id")),
                },
                ProductColumn::WeightUnit => match normalize_unit(value, UnitKind::Weight) {
                    Some(unit) => payload.weight_unit = Some(unit.to_string()),
                    None => errors.push(t_with_args(
                        "row.invalid_weight_unit",
                        &[("value", value), ("accepted", &UnitKind::Weight.accepted())],
                    )),
                },
                ProductColumn::DimensionsUnit => match normalize_unit(value, UnitKind::Dimension) {
                    Some(unit) => payload.dimensions_unit = Some(unit.to_string()),
                    None => errors.push(t_with_args(
                        "row.invalid_dimensions_unit",
                        &[("value", value), ("accepted", &UnitKind::Dimension.accepted())],
                    )),
                },
                _ => match def.column_type {
                    ColumnType::Number => match parse_number(value) {
                        Some(n) => {
                            if let Some(slot) = number_field(&mut payload, column) {
                                *slot = Some(n);
                            }
                        }
                        None => {
                            errors.push(t_with_args("row.not_a_number", &[("label", def.label)]))
                        }
                    },
                    ColumnType::Boolean => {
                        if let Some(slot) = flag_field(&mut payload, column) {
                            *slot = Some(parse_flag(value));
                        }
                    }
                    ColumnType::String => {
                        if let Some(slot) = text_field(&mut payload, column) {
                            *slot = Some(value.to_string());
                        }
                    }
                },
            }
        }

        // 产品线依赖同一行的品牌结果
        if let Some(name) = gamma_name {
            match payload.brand_id {
                Some(brand_id) => {
                    let resolved = self.indices.resolve_gamma(&name, Some(brand_id));
                    payload.gamma_id = resolved.id;
                    warnings.extend(resolved.warning);
                }
                None => warnings.push(t_with_args("reference.gamma_ignored", &[("name", &name)])),
            }
        }

        if self.mode == ImportMode::Create {
            if let Some(sku) = payload.sku.as_deref() {
                if !self.seen_skus.insert(sku.to_lowercase()) {
                    errors.push(t_with_args("row.duplicate_sku", &[("sku", sku)]));
                }
            }
        }

        let row = ParsedRow::new(index + 2, raw, payload, errors, warnings);
        if !row.is_valid {
            debug!(row_number = row.row_number, errors = ?row.errors, "行校验未通过");
        }
        row
    }
}

fn number_field(payload: &mut ProductPayload, column: ProductColumn) -> Option<&mut Option<f64>> {
    match column {
        ProductColumn::Stock => Some(&mut payload.stock),
        ProductColumn::Order => Some(&mut payload.order),
        ProductColumn::Weight => Some(&mut payload.weight),
        ProductColumn::Height => Some(&mut payload.height),
        ProductColumn::Width => Some(&mut payload.width),
        ProductColumn::Length => Some(&mut payload.length),
        _ => None,
    }
}

fn flag_field(payload: &mut ProductPayload, column: ProductColumn) -> Option<&mut Option<bool>> {
    match column {
        ProductColumn::UnlimitedStock => Some(&mut payload.unlimited_stock),
        ProductColumn::Published => Some(&mut payload.published),
        _ => None,
    }
}

fn text_field(payload: &mut ProductPayload, column: ProductColumn) -> Option<&mut Option<String>> {
    match column {
        ProductColumn::Name => Some(&mut payload.name),
        ProductColumn::Sku => Some(&mut payload.sku),
        ProductColumn::Barcode => Some(&mut payload.barcode),
        ProductColumn::Description => Some(&mut payload.description),
        ProductColumn::DescriptionShort => Some(&mut payload.description_short),
        ProductColumn::MetaTitle => Some(&mut payload.meta_title),
        ProductColumn::MetaDescription => Some(&mut payload.meta_description),
        ProductColumn::Slug => Some(&mut payload.slug),
        _ => None,
    }
}

/// 预检 + 逐行映射
pub fn map_table(table: CsvTable, mode: ImportMode, indices: &ReferenceIndices) -> ImportResult<ParsedFile> {
    precheck_headers(&table.headers, mode)?;

    let unknown_columns: Vec<String> = table
        .headers
        .iter()
        .filter(|h| !h.is_empty() && ProductColumn::from_key(h).is_none())
        .cloned()
        .collect();

    let mut mapper = RowMapper::new(mode, indices, &table.headers);
    let rows: Vec<ParsedRow> = table
        .rows
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| mapper.map_row(idx, raw))
        .collect();

    let parsed = ParsedFile {
        mode,
        headers: table.headers,
        unknown_columns,
        rows,
    };
    info!(
        mode = %mode,
        total = parsed.rows.len(),
        valid = parsed.valid_count(),
        invalid = parsed.invalid_count(),
        unknown_columns = ?parsed.unknown_columns,
        "CSV 校验完成"
    );
    Ok(parsed)
}
