// ==========================================
// 商品批量导入 - 导入门面
// ==========================================
// 职责: 串联各阶段，对外提供一次导入会话的完整操作
// 流程: 加载参考数据 → 解析 CSV → 预览 → 执行 → 汇总 / 错误报告
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::column::ProductColumn;
use crate::domain::product::{ImportSummary, ProcessingResult, RunState};
use crate::domain::types::ImportMode;
use crate::importer::batch_executor::{BatchExecutor, RetryPolicy, RunControl};
use crate::importer::csv_codec::CsvTable;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::reference_resolver::{ReferenceDataResolver, ReferenceIndices};
use crate::importer::result_reporter::{self, template_columns};
use crate::importer::row_mapper::{map_table, ParsedFile};
use crate::repository::catalog_reference_repo::CatalogReferenceRepository;
use crate::repository::product_repo::ProductRepository;
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{info, instrument};

// ==========================================
// BulkImporter - 导入会话
// ==========================================
pub struct BulkImporter {
    products: Arc<dyn ProductRepository>,
    resolver: ReferenceDataResolver,
    executor: BatchExecutor,
    parsed: RwLock<Option<ParsedFile>>,
    output_dir: PathBuf,
}

impl BulkImporter {
    /// 创建导入会话
    ///
    /// # 参数
    /// - products: 商品写入仓储
    /// - references: 参考数据仓储
    /// - config: 重试策略与输出目录
    pub fn new(
        products: Arc<dyn ProductRepository>,
        references: Arc<dyn CatalogReferenceRepository>,
        config: &dyn ImportConfigReader,
    ) -> Self {
        Self {
            executor: BatchExecutor::new(Arc::clone(&products), RetryPolicy::from_config(config)),
            products,
            resolver: ReferenceDataResolver::new(references),
            parsed: RwLock::new(None),
            output_dir: config.get_output_dir(),
        }
    }

    /// 加载参考数据（幂等）
    pub async fn load_reference_data(&self) -> ImportResult<Arc<ReferenceIndices>> {
        self.resolver.load().await
    }

    /// 解析 CSV 文本并校验（首次调用时加载参考数据）
    ///
    /// # 返回
    /// - Ok(ParsedFile): 预览结果（有效 / 无效 / 未知列 / 警告）
    /// - Err: 文件级错误（空文件、缺列、参考数据加载失败）
    #[instrument(skip(self, text), fields(mode = %mode, bytes = text.len()))]
    pub async fn parse_text(&self, mode: ImportMode, text: &str) -> ImportResult<ParsedFile> {
        let table = CsvTable::parse(text)?;
        let indices = self.load_reference_data().await?;
        let parsed = map_table(table, mode, &indices)?;

        *self.parsed.write().unwrap_or_else(|e| e.into_inner()) = Some(parsed.clone());
        Ok(parsed)
    }

    /// 读取并解析 CSV 文件
    pub async fn parse_file(&self, mode: ImportMode, path: &Path) -> ImportResult<ParsedFile> {
        let bytes = tokio::fs::read(path).await?;
        let text = String::from_utf8(bytes).map_err(|e| ImportError::FileReadError(e.to_string()))?;
        self.parse_text(mode, &text).await
    }

    /// 当前已解析文件
    pub fn parsed_file(&self) -> Option<ParsedFile> {
        self.parsed.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// 执行导入（提交全部有效行）
    pub async fn start_processing(&self) -> ImportResult<Vec<ProcessingResult>> {
        let parsed = self.parsed_file().ok_or(ImportError::NoParsedFile)?;
        self.executor.run(parsed.mode, &parsed.rows).await
    }

    /// 暂停 / 恢复 / 取消句柄
    pub fn control(&self) -> RunControl {
        self.executor.control()
    }

    pub fn progress(&self) -> RunState {
        self.executor.snapshot()
    }

    pub fn results(&self) -> Vec<ProcessingResult> {
        self.executor.results_snapshot()
    }

    pub fn summary(&self) -> ImportSummary {
        result_reporter::summarize(&self.results())
    }

    /// 写出错误报告（无失败行时不写）
    pub fn write_error_report(&self) -> ImportResult<Option<PathBuf>> {
        result_reporter::write_error_report(&self.results(), &self.output_dir, today())
    }

    /// 写出 create 模板
    pub fn write_create_template(&self, selected: &[ProductColumn]) -> ImportResult<PathBuf> {
        let csv = result_reporter::create_template_csv(selected)?;
        let path = self
            .output_dir
            .join(result_reporter::template_file_name(ImportMode::Create, today()));
        result_reporter::write_with_bom(&path, csv.as_bytes())?;
        Ok(path)
    }

    /// 导出 edit 模板（由商品服务生成当前数据）
    pub async fn download_edit_template(&self, selected: &[ProductColumn]) -> ImportResult<PathBuf> {
        let columns: Vec<String> = template_columns(ImportMode::Edit, selected)
            .into_iter()
            .map(|c| c.key().to_string())
            .collect();

        let bytes = self
            .products
            .export_bulk(&columns)
            .await
            .map_err(|e| ImportError::TemplateExportError(e.to_string()))?;

        let path = self
            .output_dir
            .join(result_reporter::template_file_name(ImportMode::Edit, today()));
        result_reporter::write_with_bom(&path, &bytes)?;
        info!(columns = columns.len(), path = %path.display(), "edit 模板已导出");
        Ok(path)
    }

    /// 清空已解析文件、结果与运行状态（运行中拒绝）
    pub fn reset(&self) -> ImportResult<()> {
        self.executor.reset()?;
        *self.parsed.write().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
