// ==========================================
// 商品批量导入 - CSV 编解码
// ==========================================
// 方言: UTF-8（可带 BOM）/ 逗号分隔 / 双引号转义（"" → "）
// 解析: 表头小写去空白，值去空白，整行空白的行静默丢弃
// 生成: 仅在字段含逗号、引号、换行时加引号
// ==========================================

use crate::domain::product::RawRow;
use crate::importer::error::{ImportError, ImportResult};
use csv::{QuoteStyle, ReaderBuilder, Terminator, Trim, WriterBuilder};

const UTF8_BOM: char = '\u{feff}';

/// 解析后的 CSV 表
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl CsvTable {
    /// 解析 CSV 文本
    ///
    /// # 返回
    /// - Ok(CsvTable): 至少一行数据
    /// - Err(EmptyFile): 无表头或无数据行
    /// - Err(CsvParseError): 结构性错误（如非法 UTF-8）
    pub fn parse(text: &str) -> ImportResult<Self> {
        let cleaned = strip_bom(text);

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .trim(Trim::All)
            .from_reader(cleaned.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::EmptyFile);
        }

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;

            // 跳过完全空白的行
            if record.iter().all(|v| v.trim().is_empty()) {
                continue;
            }

            // 短行补空，长行截断
            let row: RawRow = headers
                .iter()
                .enumerate()
                .map(|(idx, header)| {
                    let value = record.get(idx).unwrap_or("").trim().to_string();
                    (header.clone(), value)
                })
                .collect();
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(ImportError::EmptyFile);
        }

        Ok(Self { headers, rows })
    }

    /// 按表头顺序输出各行的值
    pub fn records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                self.headers
                    .iter()
                    .map(|h| row.get(h).cloned().unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

/// 生成 CSV 文本（不含 BOM，BOM 在写文件时添加）
///
/// # 参数
/// - headers: 表头
/// - rows: 数据行（每行长度须与表头一致）
pub fn generate<H: AsRef<str>>(headers: &[H], rows: &[Vec<String>]) -> ImportResult<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(headers.iter().map(|h| h.as_ref()))?;
    for row in rows {
        writer.write_record(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ImportError::CsvParseError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ImportError::CsvParseError(e.to_string()))
}

/// 去掉文本开头的 BOM（若有）
pub fn strip_bom(text: &str) -> &str {
    text.trim_start_matches(UTF8_BOM)
}
