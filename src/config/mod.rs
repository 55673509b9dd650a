// ==========================================
// 商品批量导入 - 配置层
// ==========================================
// 职责: 远端连接、重试策略、语言、输出目录
// 存储: TOML 文件 + 环境变量覆写
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, ImportSettings};
pub use import_config_trait::ImportConfigReader;
