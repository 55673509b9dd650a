// ==========================================
// 商品批量导入 - CSV 列目录
// ==========================================
// 职责: 固定列目录（封闭枚举 + 静态定义表）
// 用途: 表头匹配、必填校验、类型转换、模板生成
// ==========================================

use crate::domain::types::ImportMode;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 列值类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Number,
    Boolean,
}

// ==========================================
// 列语义分组
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnGroup {
    Identification,
    Pricing,
    Inventory,
    Content,
    Classification,
    Status,
    Seo,
    Dimensions,
}

impl fmt::Display for ColumnGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnGroup::Identification => "Identificacion",
            ColumnGroup::Pricing => "Precios",
            ColumnGroup::Inventory => "Inventario",
            ColumnGroup::Content => "Contenido",
            ColumnGroup::Classification => "Clasificacion",
            ColumnGroup::Status => "Estado",
            ColumnGroup::Seo => "SEO",
            ColumnGroup::Dimensions => "Dimensiones",
        };
        write!(f, "{}", name)
    }
}

// ==========================================
// ProductColumn - 已知列（封闭枚举）
// ==========================================
// 未在此枚举中的表头一律视为未知列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductColumn {
    Id,
    Name,
    Sku,
    Barcode,
    Price,
    Stock,
    UnlimitedStock,
    Description,
    DescriptionShort,
    Categories,
    Brand,
    Gamma,
    Published,
    Order,
    MetaTitle,
    MetaDescription,
    Slug,
    Weight,
    WeightUnit,
    Height,
    Width,
    Length,
    DimensionsUnit,
}

// ==========================================
// ColumnDefinition - 列定义
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub column: ProductColumn,
    pub key: &'static str,       // CSV 表头（小写）
    pub api_field: &'static str, // 远端 API 字段名
    pub label: &'static str,     // 展示名（错误信息使用）
    pub required: bool,          // create 模式必填
    pub column_type: ColumnType,
    pub group: ColumnGroup,
    pub edit_only: bool,         // 仅 edit 模式可用
}

#[allow(clippy::too_many_arguments)]
const fn def(
    column: ProductColumn,
    key: &'static str,
    api_field: &'static str,
    label: &'static str,
    required: bool,
    column_type: ColumnType,
    group: ColumnGroup,
    edit_only: bool,
) -> ColumnDefinition {
    ColumnDefinition {
        column,
        key,
        api_field,
        label,
        required,
        column_type,
        group,
        edit_only,
    }
}

use ColumnGroup as G;
use ColumnType as T;
use ProductColumn as C;

/// 列目录（顺序即模板列顺序）
pub static COLUMN_CATALOG: [ColumnDefinition; 23] = [
    // 标识
    def(C::Id, "id", "_id", "ID", false, T::Number, G::Identification, true),
    def(C::Name, "nombre", "name", "Nombre", true, T::String, G::Identification, false),
    def(C::Sku, "sku", "sku", "SKU", true, T::String, G::Identification, false),
    def(C::Barcode, "codigo_barras", "barcode", "Codigo de Barras", false, T::String, G::Identification, false),
    // 价格（api_field 按计价模式动态切换，见 row_mapper）
    def(C::Price, "precio", "price", "Precio", true, T::Number, G::Pricing, false),
    // 库存
    def(C::Stock, "stock", "stock", "Stock", true, T::Number, G::Inventory, false),
    def(C::UnlimitedStock, "stock_ilimitado", "unlimited_stock", "Stock Ilimitado (0/1)", false, T::Boolean, G::Inventory, false),
    // 内容
    def(C::Description, "descripcion", "description", "Descripcion", false, T::String, G::Content, false),
    def(C::DescriptionShort, "descripcion_corta", "description_short", "Descripcion Corta", false, T::String, G::Content, false),
    // 分类
    def(C::Categories, "categorias", "categories", "Categorias", false, T::String, G::Classification, false),
    def(C::Brand, "marca", "brand_id", "Marca", false, T::String, G::Classification, false),
    def(C::Gamma, "gamma", "gamma_id", "Gamma", false, T::String, G::Classification, false),
    // 状态
    def(C::Published, "publicado", "published", "Publicado (0/1)", false, T::Boolean, G::Status, false),
    def(C::Order, "orden", "order", "Orden", false, T::Number, G::Status, false),
    // SEO
    def(C::MetaTitle, "meta_titulo", "meta_title", "Meta Titulo", false, T::String, G::Seo, false),
    def(C::MetaDescription, "meta_descripcion", "meta_description", "Meta Descripcion", false, T::String, G::Seo, false),
    def(C::Slug, "slug", "slug", "Slug", false, T::String, G::Seo, false),
    // 尺寸
    def(C::Weight, "peso", "weight", "Peso", false, T::Number, G::Dimensions, false),
    def(C::WeightUnit, "unidad_peso", "weight_unit", "Unidad Peso", false, T::String, G::Dimensions, false),
    def(C::Height, "alto", "height", "Alto", false, T::Number, G::Dimensions, false),
    def(C::Width, "ancho", "width", "Ancho", false, T::Number, G::Dimensions, false),
    def(C::Length, "largo", "length", "Largo", false, T::Number, G::Dimensions, false),
    def(C::DimensionsUnit, "unidad_dimensiones", "dimensions_unit", "Unidad Dimensiones", false, T::String, G::Dimensions, false),
];

impl ProductColumn {
    /// 按表头匹配列（大小写不敏感，忽略首尾空白）
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_lowercase();
        COLUMN_CATALOG
            .iter()
            .find(|d| d.key == key)
            .map(|d| d.column)
    }

    /// 获取列定义
    pub fn definition(self) -> &'static ColumnDefinition {
        // 目录与枚举一一对应，顺序一致
        &COLUMN_CATALOG[self as usize]
    }

    pub fn key(self) -> &'static str {
        self.definition().key
    }

    pub fn label(self) -> &'static str {
        self.definition().label
    }

    /// 模板示例值（两行）
    pub fn sample_values(self) -> [&'static str; 2] {
        match self {
            C::Id => ["", ""],
            C::Name => ["Camiseta Basica Blanca", "Pantalon Jean Azul"],
            C::Sku => ["CAM-BAS-001", "PAN-JEA-001"],
            C::Barcode => ["7501234567890", "7501234567891"],
            C::Price => ["49.90", "129.90"],
            C::Stock => ["100", "50"],
            C::UnlimitedStock => ["0", "0"],
            C::Description => ["Camiseta de algodon 100%", "Jean clasico corte recto"],
            C::DescriptionShort => ["Camiseta basica", "Jean clasico"],
            C::Categories => ["Hombre > Ropa > Camisetas", "Hombre > Ropa > Pantalones"],
            C::Brand => ["Mi Marca", "Mi Marca"],
            C::Gamma => ["Linea Casual", "Linea Clasica"],
            C::Published => ["1", "1"],
            C::Order => ["1", "2"],
            C::MetaTitle => ["Camiseta Basica", "Pantalon Jean"],
            C::MetaDescription => ["Compra camiseta basica", "Compra pantalon jean"],
            C::Slug => ["camiseta-basica-blanca", "pantalon-jean-azul"],
            C::Weight => ["0.2", "0.5"],
            C::WeightUnit => ["kilogramos", "kilogramos"],
            C::Height => ["5", "10"],
            C::Width => ["30", "35"],
            C::Length => ["40", "100"],
            C::DimensionsUnit => ["centimetros", "centimetros"],
        }
    }
}

/// create 模式必填列
pub fn required_columns() -> Vec<ProductColumn> {
    COLUMN_CATALOG
        .iter()
        .filter(|d| d.required)
        .map(|d| d.column)
        .collect()
}

/// 某模式下可用的列
pub fn columns_for_mode(mode: ImportMode) -> Vec<&'static ColumnDefinition> {
    COLUMN_CATALOG
        .iter()
        .filter(|d| mode == ImportMode::Edit || !d.edit_only)
        .collect()
}

/// 按语义分组列出列（保持目录顺序）
pub fn column_groups(mode: ImportMode) -> Vec<(ColumnGroup, Vec<&'static ColumnDefinition>)> {
    let mut groups: Vec<(ColumnGroup, Vec<&'static ColumnDefinition>)> = Vec::new();
    for column in columns_for_mode(mode) {
        match groups.iter_mut().find(|(g, _)| *g == column.group) {
            Some((_, list)) => list.push(column),
            None => groups.push((column.group, vec![column])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_matches_enum_order() {
        for (idx, d) in COLUMN_CATALOG.iter().enumerate() {
            assert_eq!(d.column as usize, idx, "列 {} 顺序错位", d.key);
            assert_eq!(d.column.definition().key, d.key);
        }
    }

    #[test]
    fn test_from_key_case_insensitive() {
        assert_eq!(ProductColumn::from_key(" SKU "), Some(ProductColumn::Sku));
        assert_eq!(ProductColumn::from_key("Unidad_Peso"), Some(ProductColumn::WeightUnit));
        assert_eq!(ProductColumn::from_key("precio_oferta"), None);
    }

    #[test]
    fn test_required_columns() {
        assert_eq!(
            required_columns(),
            vec![
                ProductColumn::Name,
                ProductColumn::Sku,
                ProductColumn::Price,
                ProductColumn::Stock
            ]
        );
    }

    #[test]
    fn test_column_groups_create_hides_edit_only() {
        let create = column_groups(ImportMode::Create);
        assert!(create
            .iter()
            .all(|(_, cols)| cols.iter().all(|c| c.column != ProductColumn::Id)));

        let edit = column_groups(ImportMode::Edit);
        assert_eq!(edit[0].0, ColumnGroup::Identification);
        assert_eq!(edit[0].1[0].column, ProductColumn::Id);
        assert_eq!(edit.len(), 8);
    }
}
