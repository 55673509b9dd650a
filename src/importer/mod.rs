// ==========================================
// 商品批量导入 - 导入层
// ==========================================
// 职责: CSV → 校验映射 → 远端提交 → 汇总报告
// 阶段: csv_codec → reference_resolver + row_mapper → batch_executor → result_reporter
// ==========================================

// 模块声明
pub mod batch_executor;
pub mod bulk_importer;
pub mod csv_codec;
pub mod data_cleaner;
pub mod error;
pub mod reference_resolver;
pub mod result_reporter;
pub mod row_mapper;

// 重导出核心类型
pub use batch_executor::{BatchExecutor, RetryPolicy, RunControl, RunSignal};
pub use bulk_importer::BulkImporter;
pub use csv_codec::CsvTable;
pub use data_cleaner::UnitKind;
pub use error::{ImportError, ImportResult};
pub use reference_resolver::{ReferenceDataResolver, ReferenceIndices};
pub use result_reporter::{error_report_csv, summarize};
pub use row_mapper::{map_table, precheck_headers, ParsedFile, RowMapper};
