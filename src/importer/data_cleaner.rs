// ==========================================
// 商品批量导入 - 单元格清洗
// ==========================================
// 职责: 数值 / 布尔 / 单位别名的标准化
// 红线: 纯函数，不产生错误文本（由 row_mapper 组装）
// ==========================================

/// 单位类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Weight,
    Dimension,
}

const WEIGHT_UNITS: &[(&str, &str)] = &[
    ("kilogramos", "kilogramos"),
    ("kg", "kilogramos"),
    ("gramos", "gramos"),
    ("g", "gramos"),
    ("libras", "libras"),
    ("lb", "libras"),
];

const DIMENSION_UNITS: &[(&str, &str)] = &[
    ("centimetros", "centimetros"),
    ("cm", "centimetros"),
    ("metros", "metros"),
    ("m", "metros"),
    ("pulgadas", "pulgadas"),
    ("in", "pulgadas"),
];

impl UnitKind {
    fn aliases(self) -> &'static [(&'static str, &'static str)] {
        match self {
            UnitKind::Weight => WEIGHT_UNITS,
            UnitKind::Dimension => DIMENSION_UNITS,
        }
    }

    /// 可接受的标准单位（错误提示用）
    pub fn accepted(self) -> String {
        let mut names: Vec<&str> = Vec::new();
        for (_, canonical) in self.aliases() {
            if !names.contains(canonical) {
                names.push(canonical);
            }
        }
        names.join(", ")
    }
}

/// 单位别名 → 标准单位（去空白、大小写不敏感）
pub fn normalize_unit(value: &str, kind: UnitKind) -> Option<&'static str> {
    let key = value.trim().to_lowercase();
    kind.aliases()
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canonical)| *canonical)
}

/// 布尔单元格: "1" 或 "true"（大小写不敏感）为真，其余为假
pub fn parse_flag(value: &str) -> bool {
    let v = value.trim();
    v == "1" || v.eq_ignore_ascii_case("true")
}

/// 严格数值解析（整格必须是有限数字）
pub fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// 严格整数 id 解析
pub fn parse_id(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}
