// ==========================================
// 商品批量导入 - 远端仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供商品服务访问接口,屏蔽 HTTP 细节
// ==========================================

pub mod catalog_reference_repo;
pub mod error;
pub mod http_client;
pub mod product_repo;

// 重导出核心仓储
pub use catalog_reference_repo::CatalogReferenceRepository;
pub use error::{RemoteError, RemoteResult};
pub use http_client::HttpCatalogClient;
pub use product_repo::ProductRepository;
