// ==========================================
// 商品批量导入 - 领域模型层
// ==========================================
// 职责: 定义列目录、行模型、处理结果、运行状态、参考数据
// 红线: 不含远端访问逻辑,不含执行逻辑
// ==========================================

pub mod column;
pub mod product;
pub mod reference;
pub mod types;

// 重导出核心类型
pub use column::{
    column_groups, columns_for_mode, required_columns, ColumnDefinition, ColumnGroup, ColumnType,
    ProductColumn, COLUMN_CATALOG,
};
pub use product::{
    ImportSummary, ParsedRow, ProcessingResult, ProductPayload, RawRow, RunState,
};
pub use reference::{Brand, CategoryNode, Gamma, ProductAck};
pub use types::{ImportMode, PricingMode, RowAction, RunPhase};
