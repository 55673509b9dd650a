// ==========================================
// 商品批量导入 - 商品 Repository Trait
// ==========================================
// 职责: 定义商品写入与批量导出接口（不包含业务逻辑）
// 红线: 不做重试，不做校验；只把远端结果翻译为 Ok / RemoteError
// ==========================================

use crate::domain::product::ProductPayload;
use crate::domain::reference::ProductAck;
use crate::repository::error::RemoteResult;
use async_trait::async_trait;

// ==========================================
// ProductRepository Trait
// ==========================================
// 实现者: HttpCatalogClient（reqwest）
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// 创建商品
    ///
    /// # 返回
    /// - Ok(ProductAck): 远端确认（可能带新 id）
    /// - Err(Rejected): 远端拒绝，附带汇总后的错误信息
    /// - Err(Transport): 未收到响应
    async fn create_product(&self, payload: &ProductPayload) -> RemoteResult<ProductAck>;

    /// 按 id 更新商品（部分更新，仅发送 payload 中存在的字段）
    async fn update_product(&self, id: i64, payload: &ProductPayload) -> RemoteResult<ProductAck>;

    /// 导出现有商品为 CSV（edit 模板）
    ///
    /// # 参数
    /// - columns: 列 key 列表（已保证包含必填列）
    ///
    /// # 返回
    /// - CSV 原始字节
    async fn export_bulk(&self, columns: &[String]) -> RemoteResult<Vec<u8>>;
}
