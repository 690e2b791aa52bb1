//! 电商平台 REST 客户端
//!
//! 通过 `CommercePlatform` trait 抽象平台的读写调用，便于测试时注入 mock 实现。
//! `BigCommerceClient` 是基于 reqwest 的实现，认证信息放在默认请求头中。

use std::time::Duration;

use async_trait::async_trait;
use order_shared::config::CommerceConfig;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::{debug, info, trace};

/// 电商平台调用错误
#[derive(Debug, thiserror::Error)]
pub enum CommerceError {
    #[error("客户端初始化失败: {0}")]
    Initialization(String),

    #[error("请求发送失败: {0}")]
    Request(String),

    #[error("平台返回错误 {status}: {message}")]
    Response { status: u16, message: String },

    #[error("响应解析失败: {0}")]
    Decode(String),
}

/// 电商平台读写接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommercePlatform: Send + Sync {
    /// GET 一个资源路径（如 `/orders/42/products`）
    async fn get(&self, resource: &str) -> Result<Value, CommerceError>;

    /// PUT 一个资源路径
    async fn put(&self, resource: &str, payload: &Value) -> Result<Value, CommerceError>;
}

/// BigCommerce REST 客户端
///
/// reqwest `Client` 内部带连接池，clone 是廉价操作。
#[derive(Clone)]
pub struct BigCommerceClient {
    client: Client,
    base_url: String,
}

impl BigCommerceClient {
    pub fn new(config: &CommerceConfig) -> Result<Self, CommerceError> {
        let mut headers = HeaderMap::with_capacity(4);
        headers.insert("X-Auth-Client", header_value(&config.client_id)?);
        headers.insert("X-Auth-Token", header_value(&config.access_token)?);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| CommerceError::Initialization(e.to_string()))?;

        let base_url = base_url(config);
        info!(base_url = %base_url, "电商平台客户端已初始化");

        Ok(Self { client, base_url })
    }

    pub fn url(&self, resource: &str) -> String {
        join_resource(&self.base_url, resource)
    }

    async fn send(
        &self,
        method: Method,
        resource: &str,
        body: Option<&Value>,
    ) -> Result<Value, CommerceError> {
        let url = self.url(resource);
        trace!(%method, %url, "发送电商平台请求");

        let mut req = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req
            .send()
            .await
            .map_err(|e| CommerceError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CommerceError::Response {
                status: status.as_u16(),
                message,
            });
        }

        // 空集合以 204 返回
        if status == StatusCode::NO_CONTENT {
            debug!(%method, resource, "平台返回 204，按空集合处理");
            return Ok(Value::Array(Vec::new()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| CommerceError::Request(e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(Value::Array(Vec::new()));
        }

        serde_json::from_str(&text).map_err(|e| CommerceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CommercePlatform for BigCommerceClient {
    async fn get(&self, resource: &str) -> Result<Value, CommerceError> {
        self.send(Method::GET, resource, None).await
    }

    async fn put(&self, resource: &str, payload: &Value) -> Result<Value, CommerceError> {
        self.send(Method::PUT, resource, Some(payload)).await
    }
}

fn header_value(value: &str) -> Result<HeaderValue, CommerceError> {
    let mut header =
        HeaderValue::from_str(value).map_err(|e| CommerceError::Initialization(e.to_string()))?;
    header.set_sensitive(true);
    Ok(header)
}

/// `{api_base_url}/stores/{store_hash}/{api_version}`
fn base_url(config: &CommerceConfig) -> String {
    format!(
        "{}/stores/{}/{}",
        config.api_base_url.trim_end_matches('/'),
        config.store_hash,
        config.api_version
    )
}

fn join_resource(base_url: &str, resource: &str) -> String {
    if resource.starts_with('/') {
        format!("{base_url}{resource}")
    } else {
        format!("{base_url}/{resource}")
    }
}
