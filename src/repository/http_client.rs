// ==========================================
// 商品批量导入 - HTTP 仓储实现
// ==========================================
// 工具: reqwest（JSON）
// 实现: ProductRepository + CatalogReferenceRepository
// 响应约定: { success, data, message, messages }
//   - 2xx 且 success != false → 成功
//   - 2xx 且 success == false → Rejected(message)
//   - 非 2xx → Rejected(messages 汇总 / message)
//   - 无响应 → Transport
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::product::ProductPayload;
use crate::domain::reference::{Brand, CategoryNode, Gamma, ProductAck};
use crate::domain::types::PricingMode;
use crate::i18n::t;
use crate::repository::catalog_reference_repo::CatalogReferenceRepository;
use crate::repository::error::{RemoteError, RemoteResult};
use crate::repository::product_repo::ProductRepository;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::{debug, warn};

// ==========================================
// 响应 DTO
// ==========================================

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    success: Option<bool>,
    data: Option<T>,
    message: Option<String>,
}

/// 远端 id 可能是数字或数字字符串
#[derive(Deserialize)]
#[serde(untagged)]
enum FlexibleId {
    Int(i64),
    Float(f64),
    Text(String),
}

fn flexible_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match FlexibleId::deserialize(deserializer)? {
        FlexibleId::Int(v) => Ok(v),
        FlexibleId::Float(v) if v.fract() == 0.0 => Ok(v as i64),
        FlexibleId::Float(v) => Err(serde::de::Error::custom(format!("非整数 id: {}", v))),
        FlexibleId::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| serde::de::Error::custom(format!("非法 id: {}", s))),
    }
}

fn optional_flexible_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "flexible_id")] i64);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|w| w.0))
}

#[derive(Debug, Deserialize)]
struct CategoryDto {
    #[serde(alias = "tiendacategoria_id", deserialize_with = "flexible_id")]
    id: i64,
    #[serde(alias = "tiendacategoria_nombre")]
    name: String,
    #[serde(default, alias = "children")]
    sub: Option<Vec<CategoryDto>>,
}

impl From<CategoryDto> for CategoryNode {
    fn from(dto: CategoryDto) -> Self {
        CategoryNode {
            id: dto.id,
            name: dto.name,
            children: dto
                .sub
                .unwrap_or_default()
                .into_iter()
                .map(CategoryNode::from)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BrandDto {
    #[serde(alias = "tiendamarca_id", deserialize_with = "flexible_id")]
    id: i64,
    #[serde(alias = "tiendamarca_nombre")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct GammaDto {
    #[serde(rename = "tiendagamma_id", alias = "id", deserialize_with = "flexible_id")]
    id: i64,
    #[serde(rename = "tiendamarca_id", alias = "brand_id", deserialize_with = "flexible_id")]
    brand_id: i64,
    #[serde(rename = "tiendagamma_nombre", alias = "name")]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPreferencesDto {
    #[serde(default)]
    pricing_mode: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct ProductAckDto {
    #[serde(default, deserialize_with = "optional_flexible_id")]
    id: Option<i64>,
}

// ==========================================
// 响应解析（纯函数，便于单测）
// ==========================================

/// 汇总错误响应体中的错误信息
///
/// # 规则
/// 1. messages 为对象: 所有值展平（字符串或字符串数组），以 "; " 连接
/// 2. 否则取 message
/// 3. 都没有则返回 None
pub fn consolidate_error_body(body: &Value) -> Option<String> {
    if let Some(messages) = body.get("messages") {
        let mut parts = Vec::new();
        collect_messages(messages, &mut parts);
        if !parts.is_empty() {
            return Some(parts.join("; "));
        }
    }

    body.get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

fn collect_messages(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) if !s.trim().is_empty() => out.push(s.trim().to_string()),
        Value::Array(items) => items.iter().for_each(|v| collect_messages(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_messages(v, out)),
        Value::Number(n) => out.push(n.to_string()),
        _ => {}
    }
}

/// 把一次已收到的响应翻译为写入结果
///
/// # 参数
/// - success_status: HTTP 状态是否为 2xx
/// - body: 响应体（非 JSON 时为 Value::Null）
pub fn interpret_write_response(success_status: bool, body: &Value) -> RemoteResult<ProductAck> {
    if !success_status {
        return Err(RemoteError::Rejected(
            consolidate_error_body(body).unwrap_or_else(|| t("run.unknown_error")),
        ));
    }

    if body.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(RemoteError::Rejected(
            consolidate_error_body(body).unwrap_or_else(|| t("run.unknown_error")),
        ));
    }

    let ack = body
        .get("data")
        .cloned()
        .and_then(|data| serde_json::from_value::<ProductAckDto>(data).ok())
        .unwrap_or_default();
    Ok(ProductAck { id: ack.id })
}

/// 构造 update 请求体: 布尔字段转为 0/1
pub fn update_body(payload: &ProductPayload) -> Value {
    let mut body = match serde_json::to_value(payload) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    for key in ["published", "unlimited_stock"] {
        if let Some(flag) = body.get(key).and_then(Value::as_bool) {
            body.insert(key.to_string(), Value::from(if flag { 1 } else { 0 }));
        }
    }
    Value::Object(body)
}

fn decode_envelope<T: DeserializeOwned>(body: Value) -> RemoteResult<T> {
    let envelope: ApiEnvelope<T> = serde_json::from_value(body)
        .map_err(|e| RemoteError::Rejected(format!("响应格式错误: {}", e)))?;

    if envelope.success == Some(false) {
        return Err(RemoteError::Rejected(
            envelope.message.unwrap_or_else(|| t("run.unknown_error")),
        ));
    }
    envelope
        .data
        .ok_or_else(|| RemoteError::Rejected("响应缺少 data 字段".to_string()))
}

// ==========================================
// HttpCatalogClient
// ==========================================
pub struct HttpCatalogClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpCatalogClient {
    /// 按配置创建客户端
    pub fn from_config(config: &dyn ImportConfigReader) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.get_request_timeout() {
            builder = builder.timeout(timeout);
        }
        Self {
            client: builder.build().unwrap_or_else(|_| reqwest::Client::new()),
            base_url: config.get_api_base_url(),
            token: config.get_api_token(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// 发送请求；未收到响应 → Transport
    async fn send(&self, request: reqwest::RequestBuilder) -> RemoteResult<reqwest::Response> {
        self.authorize(request).send().await.map_err(|e| {
            warn!(error = %e, "请求未收到响应");
            RemoteError::Transport(if e.is_timeout() || e.is_connect() {
                t("run.connection_error")
            } else {
                e.to_string()
            })
        })
    }

    /// 读取 JSON 响应体（非 JSON 视为空体）
    async fn read_body(response: reqwest::Response) -> (bool, Value) {
        let ok = response.status().is_success();
        let status = response.status();
        let body = match response.text().await {
            Ok(text) => serde_json::from_str(&text).unwrap_or(Value::Null),
            Err(_) => Value::Null,
        };
        debug!(status = %status, "收到响应");
        (ok, body)
    }

    async fn get_reference<T: DeserializeOwned>(&self, path: &str) -> RemoteResult<T> {
        let response = self.send(self.client.get(self.url(path))).await?;
        let (ok, body) = Self::read_body(response).await;
        if !ok {
            return Err(RemoteError::Rejected(
                consolidate_error_body(&body).unwrap_or_else(|| format!("GET {} 失败", path)),
            ));
        }
        decode_envelope(body)
    }
}

#[async_trait]
impl ProductRepository for HttpCatalogClient {
    async fn create_product(&self, payload: &ProductPayload) -> RemoteResult<ProductAck> {
        let response = self
            .send(self.client.post(self.url("products")).json(payload))
            .await?;
        let (ok, body) = Self::read_body(response).await;
        interpret_write_response(ok, &body)
    }

    async fn update_product(&self, id: i64, payload: &ProductPayload) -> RemoteResult<ProductAck> {
        let response = self
            .send(
                self.client
                    .put(self.url(&format!("products/{}", id)))
                    .json(&update_body(payload)),
            )
            .await?;
        let (ok, body) = Self::read_body(response).await;
        // update 接口不一定回传 id，以请求 id 为准
        interpret_write_response(ok, &body).map(|ack| ProductAck {
            id: ack.id.or(Some(id)),
        })
    }

    async fn export_bulk(&self, columns: &[String]) -> RemoteResult<Vec<u8>> {
        let request = self
            .client
            .get(self.url("products/export-bulk"))
            .query(&[("columns", columns.join(","))]);
        let response = self.send(request).await?;

        if !response.status().is_success() {
            let (_, body) = Self::read_body(response).await;
            return Err(RemoteError::Rejected(
                consolidate_error_body(&body).unwrap_or_else(|| t("run.unknown_error")),
            ));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| RemoteError::Transport(e.to_string()))
    }
}

#[async_trait]
impl CatalogReferenceRepository for HttpCatalogClient {
    async fn fetch_categories(&self) -> RemoteResult<Vec<CategoryNode>> {
        let dtos: Vec<CategoryDto> = self.get_reference("categories").await?;
        Ok(dtos.into_iter().map(CategoryNode::from).collect())
    }

    async fn fetch_brands(&self) -> RemoteResult<Vec<Brand>> {
        let dtos: Vec<BrandDto> = self.get_reference("brands").await?;
        Ok(dtos
            .into_iter()
            .map(|b| Brand {
                id: b.id,
                name: b.name,
            })
            .collect())
    }

    async fn fetch_gammas(&self) -> RemoteResult<Vec<Gamma>> {
        let dtos: Vec<GammaDto> = self.get_reference("gammas").await?;
        Ok(dtos
            .into_iter()
            .map(|g| Gamma {
                id: g.id,
                brand_id: g.brand_id,
                name: g.name,
            })
            .collect())
    }

    async fn fetch_pricing_mode(&self) -> RemoteResult<PricingMode> {
        let prefs: CatalogPreferencesDto = self
            .get_reference("appearance/catalog-preferences")
            .await?;
        Ok(PricingMode::from_flag(prefs.pricing_mode.unwrap_or(0)))
    }
}
