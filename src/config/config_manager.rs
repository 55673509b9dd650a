// ==========================================
// 商品批量导入 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、环境变量覆写
// 存储: config.toml（缺失时全部取默认值）
// 优先级: 环境变量 > 配置文件 > 默认值
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

// ==========================================
// ConfigError - 配置加载错误
// ==========================================
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败 {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("配置文件解析失败 {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// ==========================================
// ImportSettings - 配置文件结构
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub max_attempts: u32,
    pub backoff_step_ms: u64,
    pub locale: String,
    pub output_dir: Option<PathBuf>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api".to_string(),
            api_token: None,
            request_timeout_ms: None,
            max_attempts: 3,
            backoff_step_ms: 1000,
            locale: "es".to_string(),
            output_dir: None,
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    settings: ImportSettings,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// 按默认路径加载配置并应用环境变量覆写
    ///
    /// # 路径
    /// 1. $CATALOG_IMPORT_CONFIG
    /// 2. <config_dir>/catalog-bulk-import/config.toml
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(config_keys::ENV_CONFIG_PATH)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .or_else(Self::default_config_path);

        let mut manager = match path {
            Some(p) => Self::from_path(&p)?,
            None => Self::default(),
        };
        manager.apply_overrides(|key| std::env::var(key).ok());

        info!(
            source = ?manager.source,
            base_url = %manager.settings.api_base_url,
            max_attempts = manager.settings.max_attempts,
            "配置加载完成"
        );
        Ok(manager)
    }

    /// 从指定文件加载（文件不存在时返回默认配置）
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "配置文件不存在，使用默认值");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: ImportSettings = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            settings,
            source: Some(path.to_path_buf()),
        })
    }

    /// 从已有配置创建（测试与嵌入调用使用）
    pub fn from_settings(settings: ImportSettings) -> Self {
        Self {
            settings,
            source: None,
        }
    }

    /// 默认配置文件路径
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("catalog-bulk-import").join("config.toml"))
    }

    /// 应用覆写
    ///
    /// # 参数
    /// - lookup: 变量查询函数（生产环境为 std::env::var）
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(config_keys::ENV_API_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.settings.api_base_url = url.trim().to_string();
        }
        if let Some(token) = lookup(config_keys::ENV_API_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.settings.api_token = Some(token.trim().to_string());
        }
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

impl ImportConfigReader for ConfigManager {
    fn get_api_base_url(&self) -> String {
        self.settings.api_base_url.trim_end_matches('/').to_string()
    }

    fn get_api_token(&self) -> Option<String> {
        self.settings.api_token.clone()
    }

    fn get_request_timeout(&self) -> Option<Duration> {
        self.settings
            .request_timeout_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }

    fn get_max_attempts(&self) -> u32 {
        // 至少尝试一次
        self.settings.max_attempts.max(1)
    }

    fn get_backoff_step(&self) -> Duration {
        Duration::from_millis(self.settings.backoff_step_ms)
    }

    fn get_locale(&self) -> String {
        self.settings.locale.clone()
    }

    fn get_output_dir(&self) -> PathBuf {
        self.settings
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const ENV_CONFIG_PATH: &str = "CATALOG_IMPORT_CONFIG";
    pub const ENV_API_BASE_URL: &str = "CATALOG_IMPORT_API_BASE_URL";
    pub const ENV_API_TOKEN: &str = "CATALOG_IMPORT_API_TOKEN";
}
