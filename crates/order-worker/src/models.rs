//! 订单领域模型
//!
//! 队列中的订单只携带子资源（商品、收货地址、优惠券）的引用；
//! 持久化前必须把引用替换为实际内容。这里用两个类型区分两种状态：
//! `Order`（含引用）只能通过 [`Order::enrich`] 转换为 `EnrichedOrder`（含内容），
//! 写入存储的永远是后者。
//!
//! 除流程需要的字段外，订单字段和子资源内容都以原始 JSON 保存，
//! 归档的是平台返回的原样数据。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 子资源引用：`{"url": "...", "resource": "/orders/42/products"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubresourceRef {
    #[serde(default)]
    pub url: String,
    pub resource: String,
}

/// 队列中收到的订单（子资源为引用）
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Order {
    pub id: u64,
    #[serde(default)]
    pub order_is_digital: bool,
    pub products: SubresourceRef,
    pub shipping_addresses: SubresourceRef,
    pub coupons: SubresourceRef,
    /// status、payment_method、total_inc_tax 等其余字段
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Order {
    /// 从消息体解析订单
    pub fn parse(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }

    /// 用获取到的子资源内容替换引用
    pub fn enrich(
        self,
        products: Vec<Value>,
        shipping_addresses: Vec<Value>,
        coupons: Vec<Value>,
    ) -> EnrichedOrder {
        EnrichedOrder {
            id: self.id,
            order_is_digital: self.order_is_digital,
            products,
            shipping_addresses,
            coupons,
            extra: self.extra,
        }
    }
}

/// 已补全子资源的订单，即写入文档存储的内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedOrder {
    pub id: u64,
    pub order_is_digital: bool,
    pub products: Vec<Value>,
    pub shipping_addresses: Vec<Value>,
    pub coupons: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EnrichedOrder {
    /// 订单上的其他字段，如 `status`
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    /// 首个收货地址（通知中只展示第一个）
    pub fn primary_shipping_address(&self) -> Option<&Value> {
        self.shipping_addresses.first()
    }

    /// 序列化为存储文档
    pub fn to_document(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}
