// ==========================================
// 商品批量导入 - 目录参考数据 Repository Trait
// ==========================================
// 职责: 读取分类树 / 品牌 / 产品线 / 店铺计价模式
// 红线: 只读
// ==========================================

use crate::domain::reference::{Brand, CategoryNode, Gamma};
use crate::domain::types::PricingMode;
use crate::repository::error::RemoteResult;
use async_trait::async_trait;

// ==========================================
// CatalogReferenceRepository Trait
// ==========================================
// 实现者: HttpCatalogClient（reqwest）
#[async_trait]
pub trait CatalogReferenceRepository: Send + Sync {
    /// 分类树（根节点列表）
    async fn fetch_categories(&self) -> RemoteResult<Vec<CategoryNode>>;

    async fn fetch_brands(&self) -> RemoteResult<Vec<Brand>>;

    async fn fetch_gammas(&self) -> RemoteResult<Vec<Gamma>>;

    /// 店铺计价模式（含税 / 不含税）
    async fn fetch_pricing_mode(&self) -> RemoteResult<PricingMode>;
}
