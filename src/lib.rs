// ==========================================
// 商品批量导入 - 核心库
// ==========================================
// 职责: 店铺后台的 CSV 商品批量创建 / 编辑管道
// 技术栈: Tokio + reqwest + csv
// 远端: 商品服务（创建 / 更新 / 导出 + 参考数据）
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "es");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 列目录、行模型、运行状态
pub mod domain;

// 远端仓储层 - 商品服务访问
pub mod repository;

// 导入层 - 解析、校验、执行、报告
pub mod importer;

// 配置层
pub mod config;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ImportMode, PricingMode, RowAction, RunPhase};

// 领域实体
pub use domain::{
    ColumnDefinition, ColumnGroup, ImportSummary, ParsedRow, ProcessingResult, ProductColumn,
    ProductPayload, RunState,
};

// 导入
pub use importer::{BulkImporter, ImportError, ImportResult, ParsedFile, RunControl};

// 仓储
pub use repository::{CatalogReferenceRepository, HttpCatalogClient, ProductRepository, RemoteError};

// ==========================================
// 常量定义
// ==========================================

// 版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 名称
pub const APP_NAME: &str = "catalog-bulk-import";
