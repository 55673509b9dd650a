// ==========================================
// 商品批量导入 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 行级问题不走 Err，记录在 ParsedRow / ProcessingResult 中
// ==========================================

use crate::i18n::{t, t_with_args};
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("CSV 文件为空（无数据行）")]
    EmptyFile,

    #[error("缺少必填列: {}", .0.join(", "))]
    MissingRequiredColumns(Vec<String>),

    #[error("缺少标识列: edit 模式需要 id 或 sku 列")]
    MissingIdentifierColumn,

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    // ===== 远端相关错误 =====
    #[error("参考数据加载失败: {0}")]
    ReferenceLoadError(String),

    #[error("模板导出失败: {0}")]
    TemplateExportError(String),

    // ===== 运行控制错误 =====
    #[error("已有导入任务在运行: run_id={0}")]
    RunInProgress(String),

    #[error("尚未解析 CSV 文件")]
    NoParsedFile,

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 面向店铺用户的本地化文本（文件级错误）
    ///
    /// 其余错误返回 Display 文本
    pub fn user_message(&self) -> String {
        match self {
            ImportError::EmptyFile => t("file.empty"),
            ImportError::MissingRequiredColumns(columns) => {
                t_with_args("file.missing_columns", &[("columns", &columns.join(", "))])
            }
            ImportError::MissingIdentifierColumn => t("file.missing_identifier"),
            ImportError::FileReadError(detail) | ImportError::CsvParseError(detail) => {
                t_with_args("file.read_error", &[("detail", detail)])
            }
            other => other.to_string(),
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_display_lists_all() {
        let err = ImportError::MissingRequiredColumns(vec!["sku".into(), "precio".into()]);
        assert!(err.to_string().contains("sku, precio"));
        assert!(err.user_message().contains("sku, precio"));
    }

    #[test]
    fn test_io_error_maps_to_file_read() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: ImportError = io.into();
        assert!(matches!(err, ImportError::FileReadError(ref m) if m.contains("missing.csv")));
    }
}
