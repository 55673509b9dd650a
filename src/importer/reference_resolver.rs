// ==========================================
// 商品批量导入 - 参考数据解析器
// ==========================================
// 职责: 一次性加载分类树 / 品牌 / 产品线 / 计价模式，构建查找索引
// 索引:
//   - 分类路径 → 分类 id（"a > b > c" 小写，含所有中间节点）
//   - 品牌名（小写）→ 品牌 id
//   - 品牌 id → 该品牌下的产品线
// 红线: 索引构建后只读，整个运行期共享
// ==========================================

use crate::domain::reference::{Brand, CategoryNode, Gamma};
use crate::domain::types::PricingMode;
use crate::i18n::t_with_args;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::catalog_reference_repo::CatalogReferenceRepository;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, instrument};

const PATH_SEPARATOR: &str = " > ";

/// 单值解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub id: Option<i64>,
    pub warning: Option<String>,
}

/// 分类列解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryResolution {
    pub ids: Vec<i64>,
    pub warnings: Vec<String>,
}

/// 规范化分类路径: 每段去空白，以 " > " 连接，小写
pub fn normalize_category_path(path: &str) -> String {
    path.split('>')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(PATH_SEPARATOR)
        .to_lowercase()
}

/// 构建分类路径索引（显式栈深度优先，先序）
///
/// 重名路径以先序遍历中后出现的节点为准
pub fn build_category_path_map(roots: &[CategoryNode]) -> HashMap<String, i64> {
    let mut map = HashMap::new();
    let mut stack: Vec<(&CategoryNode, String)> =
        roots.iter().rev().map(|node| (node, String::new())).collect();

    while let Some((node, parent_path)) = stack.pop() {
        let path = if parent_path.is_empty() {
            node.name.trim().to_string()
        } else {
            format!("{}{}{}", parent_path, PATH_SEPARATOR, node.name.trim())
        };

        map.insert(normalize_category_path(&path), node.id);

        for child in node.children.iter().rev() {
            stack.push((child, path.clone()));
        }
    }

    map
}

// ==========================================
// ReferenceIndices - 只读查找索引
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndices {
    category_paths: HashMap<String, i64>,
    brands: HashMap<String, i64>,
    gammas_by_brand: HashMap<i64, Vec<(i64, String)>>,
    pricing_mode: PricingMode,
}

impl ReferenceIndices {
    pub fn build(
        categories: &[CategoryNode],
        brands: &[Brand],
        gammas: &[Gamma],
        pricing_mode: PricingMode,
    ) -> Self {
        let brands = brands
            .iter()
            .map(|b| (b.name.trim().to_lowercase(), b.id))
            .collect();

        let mut gammas_by_brand: HashMap<i64, Vec<(i64, String)>> = HashMap::new();
        for gamma in gammas {
            gammas_by_brand
                .entry(gamma.brand_id)
                .or_default()
                .push((gamma.id, gamma.name.trim().to_lowercase()));
        }

        Self {
            category_paths: build_category_path_map(categories),
            brands,
            gammas_by_brand,
            pricing_mode,
        }
    }

    pub fn pricing_mode(&self) -> PricingMode {
        self.pricing_mode
    }

    pub fn category_count(&self) -> usize {
        self.category_paths.len()
    }

    /// 逗号分隔的多个分类路径 → 分类 id 列表 + 未找到的警告
    pub fn resolve_categories(&self, csv_value: &str) -> CategoryResolution {
        let mut resolution = CategoryResolution::default();

        for path in csv_value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match self.category_paths.get(&normalize_category_path(path)) {
                Some(&id) => resolution.ids.push(id),
                None => resolution
                    .warnings
                    .push(t_with_args("reference.category_not_found", &[("path", path)])),
            }
        }

        resolution
    }

    /// 品牌名精确匹配（大小写不敏感）
    pub fn resolve_brand(&self, name: &str) -> Resolution {
        let name = name.trim();
        if name.is_empty() {
            return Resolution::default();
        }

        match self.brands.get(&name.to_lowercase()) {
            Some(&id) => Resolution {
                id: Some(id),
                warning: None,
            },
            None => Resolution {
                id: None,
                warning: Some(t_with_args("reference.brand_not_found", &[("name", name)])),
            },
        }
    }

    /// 在指定品牌下查找产品线
    ///
    /// # 参数
    /// - brand_id: 同一行已解析出的品牌；None 时直接返回警告
    pub fn resolve_gamma(&self, name: &str, brand_id: Option<i64>) -> Resolution {
        let name = name.trim();
        if name.is_empty() {
            return Resolution::default();
        }

        let Some(brand_id) = brand_id else {
            return Resolution {
                id: None,
                warning: Some(t_with_args("reference.gamma_requires_brand", &[("name", name)])),
            };
        };

        let key = name.to_lowercase();
        let found = self
            .gammas_by_brand
            .get(&brand_id)
            .and_then(|list| list.iter().find(|(_, gamma_name)| *gamma_name == key))
            .map(|(id, _)| *id);

        match found {
            Some(id) => Resolution {
                id: Some(id),
                warning: None,
            },
            None => Resolution {
                id: None,
                warning: Some(t_with_args("reference.gamma_not_found", &[("name", name)])),
            },
        }
    }
}

// ==========================================
// ReferenceDataResolver - 参考数据加载器
// ==========================================
// 幂等: 并发调用共享同一次加载；成功后再调用为空操作；失败后可重试
pub struct ReferenceDataResolver {
    repo: Arc<dyn CatalogReferenceRepository>,
    indices: OnceCell<Arc<ReferenceIndices>>,
}

impl ReferenceDataResolver {
    pub fn new(repo: Arc<dyn CatalogReferenceRepository>) -> Self {
        Self {
            repo,
            indices: OnceCell::new(),
        }
    }

    /// 加载参考数据（四个请求并发）
    #[instrument(skip(self))]
    pub async fn load(&self) -> ImportResult<Arc<ReferenceIndices>> {
        let indices = self
            .indices
            .get_or_try_init(|| async {
                let (categories, brands, gammas, pricing_mode) = futures::try_join!(
                    self.repo.fetch_categories(),
                    self.repo.fetch_brands(),
                    self.repo.fetch_gammas(),
                    self.repo.fetch_pricing_mode(),
                )
                .map_err(|e| ImportError::ReferenceLoadError(e.to_string()))?;

                let indices = ReferenceIndices::build(&categories, &brands, &gammas, pricing_mode);
                info!(
                    categories = indices.category_count(),
                    brands = brands.len(),
                    gammas = gammas.len(),
                    pricing_mode = %pricing_mode,
                    "参考数据加载完成"
                );
                Ok::<_, ImportError>(Arc::new(indices))
            })
            .await?;

        Ok(Arc::clone(indices))
    }

    /// 已加载的索引（未加载时为 None）
    pub fn indices(&self) -> Option<Arc<ReferenceIndices>> {
        self.indices.get().cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.indices.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::error::RemoteResult;

    fn sample_tree() -> Vec<CategoryNode> {
        vec![
            CategoryNode::with_children(
                1,
                "Hombre",
                vec![CategoryNode::with_children(
                    2,
                    " Ropa ",
                    vec![CategoryNode::leaf(3, "Camisetas"), CategoryNode::leaf(4, "Pantalones")],
                )],
            ),
            CategoryNode::leaf(5, "Ofertas"),
        ]
    }

    fn sample_indices(pricing_mode: PricingMode) -> ReferenceIndices {
        ReferenceIndices::build(
            &sample_tree(),
            &[
                Brand { id: 10, name: "Mi Marca".into() },
                Brand { id: 11, name: "Otra".into() },
            ],
            &[
                Gamma { id: 100, brand_id: 10, name: "Linea Casual".into() },
                Gamma { id: 101, brand_id: 11, name: "Linea Sport".into() },
            ],
            pricing_mode,
        )
    }

    #[test]
    fn test_category_path_map_includes_intermediate_nodes() {
        let map = build_category_path_map(&sample_tree());

        assert_eq!(map.len(), 5);
        assert_eq!(map["hombre"], 1);
        assert_eq!(map["hombre > ropa"], 2);
        assert_eq!(map["hombre > ropa > camisetas"], 3);
        assert_eq!(map["ofertas"], 5);
    }

    #[test]
    fn test_category_path_map_handles_deep_tree() {
        // 深层链路不依赖递归
        let mut node = CategoryNode::leaf(2000, "n2000");
        for id in (0..2000).rev() {
            node = CategoryNode::with_children(id, &format!("n{}", id), vec![node]);
        }
        let map = build_category_path_map(&[node]);
        assert_eq!(map.len(), 2001);
    }

    #[test]
    fn test_resolve_categories_mixed() {
        let idx = sample_indices(PricingMode::WithTax);
        let res = idx.resolve_categories("HOMBRE>Ropa > camisetas, Mujer > Ropa, ,Ofertas");

        assert_eq!(res.ids, vec![3, 5]);
        assert_eq!(res.warnings.len(), 1);
        assert!(res.warnings[0].contains("\"Mujer > Ropa\""));
    }

    #[test]
    fn test_resolve_brand() {
        let idx = sample_indices(PricingMode::WithTax);
        assert_eq!(idx.resolve_brand(" mi marca ").id, Some(10));
        assert_eq!(idx.resolve_brand("").warning, None);

        let missing = idx.resolve_brand("Marca X");
        assert_eq!(missing.id, None);
        assert!(missing.warning.unwrap().contains("\"Marca X\""));
    }

    #[test]
    fn test_resolve_gamma_scoped_to_brand() {
        let idx = sample_indices(PricingMode::WithTax);

        assert_eq!(idx.resolve_gamma("linea casual", Some(10)).id, Some(100));
        // 其他品牌的产品线不可见
        let other = idx.resolve_gamma("Linea Sport", Some(10));
        assert_eq!(other.id, None);
        assert!(other.warning.is_some());

        let no_brand = idx.resolve_gamma("Linea Casual", None);
        assert_eq!(no_brand.id, None);
        assert!(no_brand.warning.unwrap().contains("\"Linea Casual\""));
    }

    struct StaticReferences {
        fetches: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CatalogReferenceRepository for StaticReferences {
        async fn fetch_categories(&self) -> RemoteResult<Vec<CategoryNode>> {
            self.fetches.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(sample_tree())
        }

        async fn fetch_brands(&self) -> RemoteResult<Vec<Brand>> {
            Ok(vec![Brand { id: 10, name: "Mi Marca".into() }])
        }

        async fn fetch_gammas(&self) -> RemoteResult<Vec<Gamma>> {
            Ok(Vec::new())
        }

        async fn fetch_pricing_mode(&self) -> RemoteResult<PricingMode> {
            Ok(PricingMode::WithoutTax)
        }
    }

    #[tokio::test]
    async fn test_resolver_loads_once() {
        let repo = Arc::new(StaticReferences {
            fetches: std::sync::atomic::AtomicUsize::new(0),
        });
        let resolver = ReferenceDataResolver::new(repo.clone());
        assert!(!resolver.is_loaded());
        assert!(resolver.indices().is_none());

        let first = resolver.load().await.unwrap();
        let second = resolver.load().await.unwrap();

        assert!(resolver.is_loaded());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.pricing_mode(), PricingMode::WithoutTax);
        assert_eq!(repo.fetches.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
