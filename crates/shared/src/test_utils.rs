//! 测试工具模块
//!
//! 提供集成测试所需的内存实现（队列、文档存储、通知主题）和测试数据生成器，
//! 用于在无外部依赖的情况下验证订单处理流程。
//!
//! 所有内存实现可以共享同一个 `CallJournal`，按调用顺序记录外部调用，
//! 便于断言跨服务的执行顺序。

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::InfraError;
use crate::queue::{MessageQueue, QueueMessage};
use crate::store::DocumentStore;
use crate::topic::TopicPublisher;

// ==================== 调用日志 ====================

/// 外部调用日志
///
/// 条目格式为 `<service>.<operation>:<detail>`，例如 `store.put:42`。
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, entry: impl Into<String>) {
        self.entries.lock().await.push(entry.into());
    }

    pub async fn entries(&self) -> Vec<String> {
        self.entries.lock().await.clone()
    }

    /// 以指定前缀开头的条目
    pub async fn entries_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .lock()
            .await
            .iter()
            .filter(|e| e.starts_with(prefix))
            .cloned()
            .collect()
    }
}

// ==================== 内存队列 ====================

/// 内存消息队列
///
/// 拉取后的消息进入 in-flight 状态，只有被删除才真正移除。
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    visible: Mutex<VecDeque<QueueMessage>>,
    in_flight: Mutex<Vec<QueueMessage>>,
    deleted: Mutex<Vec<String>>,
    fail_deletes: bool,
    journal: CallJournal,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: CallJournal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    /// 所有删除操作都返回错误
    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub async fn push(&self, message: QueueMessage) {
        self.visible.lock().await.push_back(message);
    }

    /// 尚未被拉取的消息数
    pub async fn pending(&self) -> usize {
        self.visible.lock().await.len()
    }

    /// 已拉取但未删除的消息
    pub async fn in_flight(&self) -> Vec<QueueMessage> {
        self.in_flight.lock().await.clone()
    }

    /// 已删除消息的 receipt handle，按删除顺序
    pub async fn deleted(&self) -> Vec<String> {
        self.deleted.lock().await.clone()
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn receive(
        &self,
        max_messages: i32,
        _wait_time_seconds: i32,
    ) -> Result<Vec<QueueMessage>, InfraError> {
        let mut visible = self.visible.lock().await;
        let take = (max_messages.max(0) as usize).min(visible.len());
        let batch: Vec<QueueMessage> = visible.drain(..take).collect();
        self.in_flight.lock().await.extend(batch.iter().cloned());
        Ok(batch)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), InfraError> {
        self.journal.record(format!("queue.delete:{receipt_handle}")).await;
        if self.fail_deletes {
            return Err(InfraError::Queue(format!(
                "模拟删除失败: {receipt_handle}"
            )));
        }
        self.in_flight
            .lock()
            .await
            .retain(|m| m.receipt_handle != receipt_handle);
        self.deleted.lock().await.push(receipt_handle.to_string());
        Ok(())
    }
}

// ==================== 内存文档存储 ====================

/// 内存文档存储
///
/// 以 `id` 字段为主键，重复写入覆盖旧值。
#[derive(Debug)]
pub struct InMemoryDocumentStore {
    table: String,
    items: Mutex<Vec<Value>>,
    fail_all: bool,
    journal: CallJournal,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self {
            table: "orders".to_string(),
            items: Mutex::new(Vec::new()),
            fail_all: false,
            journal: CallJournal::default(),
        }
    }
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: CallJournal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    pub fn with_table(mut self, table: &str) -> Self {
        self.table = table.to_string();
        self
    }

    /// 所有写入都返回错误
    pub fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }

    pub async fn items(&self) -> Vec<Value> {
        self.items.lock().await.clone()
    }

    pub async fn get(&self, id: &Value) -> Option<Value> {
        self.items
            .lock()
            .await
            .iter()
            .find(|item| item.get("id") == Some(id))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn put_item(&self, item: &Value) -> Result<(), InfraError> {
        let key = item.get("id").cloned().unwrap_or(Value::Null);
        self.journal.record(format!("store.put:{key}")).await;

        if self.fail_all {
            return Err(InfraError::Store(format!("模拟写入失败: id={key}")));
        }
        if !item.is_object() {
            return Err(InfraError::Store("文档必须是 JSON 对象".to_string()));
        }

        let mut items = self.items.lock().await;
        items.retain(|existing| existing.get("id") != Some(&key));
        items.push(item.clone());
        Ok(())
    }

    fn table_name(&self) -> &str {
        &self.table
    }
}

// ==================== 通知主题 ====================

/// 已发布的通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedNotification {
    pub subject: String,
    pub message: String,
}

/// 记录型通知发布器
#[derive(Debug, Default)]
pub struct RecordingTopicPublisher {
    published: Mutex<Vec<PublishedNotification>>,
    fail_all: bool,
    journal: CallJournal,
}

impl RecordingTopicPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: CallJournal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    /// 所有发布都返回错误
    pub fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }

    pub async fn published(&self) -> Vec<PublishedNotification> {
        self.published.lock().await.clone()
    }
}

#[async_trait]
impl TopicPublisher for RecordingTopicPublisher {
    async fn publish(&self, subject: &str, message: &str) -> Result<String, InfraError> {
        self.journal.record(format!("topic.publish:{subject}")).await;
        if self.fail_all {
            return Err(InfraError::Topic(format!("模拟发布失败: {subject}")));
        }
        self.published.lock().await.push(PublishedNotification {
            subject: subject.to_string(),
            message: message.to_string(),
        });
        Ok(Uuid::new_v4().to_string())
    }
}

// ==================== 测试数据生成器 ====================

/// 测试数据生成器
///
/// 生成与电商平台订单 webhook / REST 响应结构一致的 JSON 数据
pub struct TestDataGenerator;

impl TestDataGenerator {
    /// 生成带子资源引用的订单 JSON
    pub fn order(id: u64, is_digital: bool) -> Value {
        json!({
            "id": id,
            "customer_id": 11,
            "date_created": Utc::now().to_rfc2822(),
            "status": "Awaiting Fulfillment",
            "status_id": 11,
            "payment_method": "Credit Card",
            "total_inc_tax": "109.9900",
            "customer_message": "Please gift wrap",
            "order_is_digital": is_digital,
            "products": Self::subresource_ref(id, "products"),
            "shipping_addresses": Self::subresource_ref(id, "shipping_addresses"),
            "coupons": Self::subresource_ref(id, "coupons"),
        })
    }

    /// 子资源引用对象
    pub fn subresource_ref(order_id: u64, name: &str) -> Value {
        json!({
            "url": format!("https://api.bigcommerce.com/stores/abc123/v2/orders/{order_id}/{name}"),
            "resource": format!("/orders/{order_id}/{name}"),
        })
    }

    /// 订单商品列表
    pub fn products(order_id: u64) -> Value {
        json!([
            {"id": 1, "order_id": order_id, "sku": "TSHIRT-BLK-M", "quantity": 2, "name": "Black T-Shirt"},
            {"id": 2, "order_id": order_id, "sku": "MUG-01", "quantity": 1, "name": "Coffee Mug"},
        ])
    }

    /// 收货地址列表
    pub fn shipping_addresses(order_id: u64) -> Value {
        json!([{
            "id": 7,
            "order_id": order_id,
            "first_name": "Ada",
            "last_name": "Lovelace",
            "company": "Analytical Engines Ltd",
            "street_1": "12 Marylebone Rd",
            "street_2": "Flat 3",
            "city": "London",
            "state": "Greater London",
            "zip": "NW1 5LR",
            "country": "United Kingdom",
            "shipping_method": "Royal Mail 1st Class",
        }])
    }

    /// 优惠券列表
    pub fn coupons(_order_id: u64) -> Value {
        json!([{"id": 3, "code": "WELCOME10", "amount": "10.0000", "type": 1}])
    }

    /// 将订单包装为队列消息
    pub fn order_message(id: u64, is_digital: bool) -> QueueMessage {
        QueueMessage::new(
            format!("msg-{id}"),
            format!("receipt-{id}"),
            Self::order(id, is_digital).to_string(),
        )
    }
}
