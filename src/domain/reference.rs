// ==========================================
// 商品批量导入 - 目录参考数据
// ==========================================
// 职责: 分类树 / 品牌 / 产品线（gamma）的领域表示
// 来源: 商品服务参考接口（一次性加载）
// ==========================================

use serde::{Deserialize, Serialize};

/// 分类树节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    pub fn leaf(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            children: Vec::new(),
        }
    }

    pub fn with_children(id: i64, name: &str, children: Vec<CategoryNode>) -> Self {
        Self {
            id,
            name: name.to_string(),
            children,
        }
    }
}

/// 品牌
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    pub id: i64,
    pub name: String,
}

/// 产品线（隶属于单个品牌）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gamma {
    pub id: i64,
    pub brand_id: i64,
    pub name: String,
}

/// 远端创建/更新成功后的确认
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductAck {
    pub id: Option<i64>,
}
