//! 带重试的电商平台访问器
//!
//! 每次调用（每个子资源读取、每次状态写入）都持有独立的重试预算。

use std::sync::Arc;

use order_shared::retry::{RetryPolicy, retry_with_policy};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::commerce_client::{CommerceError, CommercePlatform};
use crate::error::ProcessingError;
use crate::models::{EnrichedOrder, Order};

#[derive(Clone)]
pub struct RetryingAccessor {
    client: Arc<dyn CommercePlatform>,
    policy: RetryPolicy,
}

impl RetryingAccessor {
    pub fn new(client: Arc<dyn CommercePlatform>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// 读取子资源集合
    ///
    /// 只重试请求本身，解析失败直接返回。
    pub async fn get_collection<T: DeserializeOwned>(
        &self,
        resource: &str,
    ) -> Result<Vec<T>, CommerceError> {
        let value = retry_with_policy(&self.policy, "get_collection", || {
            self.client.get(resource)
        })
        .await?;

        serde_json::from_value(value).map_err(|e| CommerceError::Decode(e.to_string()))
    }

    /// 更新订单状态：`PUT /orders/{id}`，请求体 `{"status_id": n}`
    pub async fn update_order_status(
        &self,
        order_id: u64,
        status_id: u32,
    ) -> Result<Value, CommerceError> {
        let resource = format!("/orders/{order_id}");
        let payload = json!({ "status_id": status_id });

        retry_with_policy(&self.policy, "update_order_status", || {
            self.client.put(&resource, &payload)
        })
        .await
    }

    /// 依次获取商品、收货地址、优惠券，返回补全后的订单
    pub async fn fetch_subresources(&self, order: &Order) -> Result<EnrichedOrder, ProcessingError> {
        let order_id = order.id;
        let fetch_failed = |resource: &str, err: CommerceError| {
            ProcessingError::SubresourceFetchFailed {
                order_id,
                resource: resource.to_string(),
                reason: err.to_string(),
            }
        };

        debug!(order_id, resource = %order.products.resource, "获取订单商品");
        let products = self
            .get_collection::<Value>(&order.products.resource)
            .await
            .map_err(|e| fetch_failed(&order.products.resource, e))?;

        debug!(order_id, resource = %order.shipping_addresses.resource, "获取收货地址");
        let shipping_addresses = self
            .get_collection::<Value>(&order.shipping_addresses.resource)
            .await
            .map_err(|e| fetch_failed(&order.shipping_addresses.resource, e))?;

        debug!(order_id, resource = %order.coupons.resource, "获取优惠券");
        let coupons = self
            .get_collection::<Value>(&order.coupons.resource)
            .await
            .map_err(|e| fetch_failed(&order.coupons.resource, e))?;

        info!(
            order_id,
            products = products.len(),
            shipping_addresses = shipping_addresses.len(),
            coupons = coupons.len(),
            "订单子资源获取完成"
        );

        Ok(order.clone().enrich(products, shipping_addresses, coupons))
    }
}
