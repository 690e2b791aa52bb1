//! 订单批次处理器
//!
//! 严格按顺序逐条处理消息：解析订单、获取子资源、写入存储、更新平台状态、
//! 发布通知、确认消息。任一步骤失败即中止整批，剩余消息不再处理。

use std::sync::Arc;
use std::time::Instant;

use order_shared::queue::{MessageQueue, QueueMessage};
use order_shared::store::DocumentStore;
use order_shared::topic::TopicPublisher;
use tracing::{error, info, instrument};

use crate::accessor::RetryingAccessor;
use crate::error::ProcessingError;
use crate::models::Order;
use crate::notification::OrderNotification;
use crate::outcome::{BatchOutcome, BatchSummary};
use crate::status::StatusPolicy;

/// 批次在某条消息上失败时的上下文
struct BatchFailure<'a> {
    error: ProcessingError,
    processed: usize,
    message: &'a QueueMessage,
}

pub struct OrderBatchProcessor {
    accessor: RetryingAccessor,
    store: Arc<dyn DocumentStore>,
    publisher: Arc<dyn TopicPublisher>,
    queue: Arc<dyn MessageQueue>,
    status_policy: StatusPolicy,
}

impl OrderBatchProcessor {
    pub fn new(
        accessor: RetryingAccessor,
        store: Arc<dyn DocumentStore>,
        publisher: Arc<dyn TopicPublisher>,
        queue: Arc<dyn MessageQueue>,
        status_policy: StatusPolicy,
    ) -> Self {
        Self {
            accessor,
            store,
            publisher,
            queue,
            status_policy,
        }
    }

    /// 订单写入的目标表
    pub fn table_name(&self) -> &str {
        self.store.table_name()
    }

    /// 处理一个批次，返回首个错误
    pub async fn process_batch(
        &self,
        messages: &[QueueMessage],
    ) -> Result<BatchSummary, ProcessingError> {
        self.run(messages).await.map_err(|failure| failure.error)
    }

    /// 处理一个批次，成功与失败统一以 `BatchOutcome` 返回
    ///
    /// 失败时附带已完成的消息数与失败消息的 id，调用方据此判断哪些消息需要重新投递。
    pub async fn handle_batch(&self, messages: &[QueueMessage]) -> BatchOutcome {
        match self.run(messages).await {
            Ok(summary) => BatchOutcome::success(summary, self.table_name()),
            Err(failure) => BatchOutcome::failure(
                &failure.error,
                failure.processed,
                Some(failure.message.message_id.clone()),
            ),
        }
    }

    async fn run<'a>(
        &self,
        messages: &'a [QueueMessage],
    ) -> Result<BatchSummary, BatchFailure<'a>> {
        info!(batch_size = messages.len(), "开始处理订单批次");

        for (index, message) in messages.iter().enumerate() {
            let started = Instant::now();
            if let Err(error) = self.process_message(message).await {
                error!(
                    message_id = %message.message_id,
                    kind = %error.kind(),
                    processed = index,
                    error = %error,
                    "订单处理失败，中止当前批次"
                );
                metrics::counter!("order_processing_failures_total", "kind" => error.kind().as_str())
                    .increment(1);
                metrics::counter!("order_batches_total", "outcome" => "failure").increment(1);
                return Err(BatchFailure {
                    error,
                    processed: index,
                    message,
                });
            }
            metrics::counter!("orders_processed_total").increment(1);
            metrics::histogram!("order_processing_duration_seconds")
                .record(started.elapsed().as_secs_f64());
        }

        metrics::counter!("order_batches_total", "outcome" => "success").increment(1);
        info!(
            processed = messages.len(),
            table = %self.table_name(),
            "Successfully wrote {} orders to {}",
            messages.len(),
            self.table_name()
        );

        Ok(BatchSummary {
            processed: messages.len(),
        })
    }

    #[instrument(skip_all, fields(message_id = %message.message_id))]
    async fn process_message(&self, message: &QueueMessage) -> Result<(), ProcessingError> {
        let order = Order::parse(&message.body).map_err(|e| ProcessingError::MalformedMessage {
            message_id: message.message_id.clone(),
            reason: e.to_string(),
        })?;
        let order_id = order.id;

        info!(order_id, "获取订单子资源");
        let enriched = self.accessor.fetch_subresources(&order).await?;

        info!(order_id, table = %self.table_name(), "写入订单到存储");
        let document = enriched
            .to_document()
            .map_err(|e| ProcessingError::PersistenceFailed {
                order_id,
                reason: e.to_string(),
            })?;
        self.store
            .put_item(&document)
            .await
            .map_err(|e| ProcessingError::PersistenceFailed {
                order_id,
                reason: e.to_string(),
            })?;

        let status_id = self.status_policy.status_for(enriched.order_is_digital);
        info!(
            order_id,
            status_id,
            order_is_digital = enriched.order_is_digital,
            "更新订单状态"
        );
        self.accessor
            .update_order_status(order_id, status_id)
            .await
            .map_err(|e| ProcessingError::StatusUpdateFailed {
                order_id,
                status_id,
                reason: e.to_string(),
            })?;

        info!(order_id, "发送新订单通知");
        let notification = OrderNotification::render(&enriched);
        let published_id = self
            .publisher
            .publish(&notification.subject, &notification.message)
            .await
            .map_err(|e| ProcessingError::PublishFailed {
                order_id,
                reason: e.to_string(),
            })?;

        info!(order_id, published_id = %published_id, "删除队列消息");
        self.queue
            .delete(&message.receipt_handle)
            .await
            .map_err(|e| ProcessingError::AcknowledgeFailed {
                message_id: message.message_id.clone(),
                reason: e.to_string(),
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commerce_client::{CommerceError, MockCommercePlatform};
    use crate::error::ErrorKind;
    use order_shared::retry::RetryPolicy;
    use order_shared::test_utils::{
        InMemoryDocumentStore, InMemoryQueue, RecordingTopicPublisher, TestDataGenerator,
    };
    use serde_json::json;

    struct Harness {
        store: Arc<InMemoryDocumentStore>,
        publisher: Arc<RecordingTopicPublisher>,
        queue: Arc<InMemoryQueue>,
        processor: OrderBatchProcessor,
    }

    fn harness(mock: MockCommercePlatform) -> Harness {
        harness_with(
            mock,
            InMemoryDocumentStore::new(),
            RecordingTopicPublisher::new(),
        )
    }

    fn harness_with(
        mock: MockCommercePlatform,
        store: InMemoryDocumentStore,
        publisher: RecordingTopicPublisher,
    ) -> Harness {
        let store = Arc::new(store);
        let publisher = Arc::new(publisher);
        let queue = Arc::new(InMemoryQueue::new());
        let processor = OrderBatchProcessor::new(
            RetryingAccessor::new(Arc::new(mock), RetryPolicy::default()),
            store.clone(),
            publisher.clone(),
            queue.clone(),
            StatusPolicy::default(),
        );
        Harness {
            store,
            publisher,
            queue,
            processor,
        }
    }

    fn serving_subresources(mock: &mut MockCommercePlatform) {
        mock.expect_get().returning(|resource| {
            let id: u64 = resource
                .split('/')
                .nth(2)
                .and_then(|s| s.parse().ok())
                .unwrap_or_default();
            if resource.ends_with("/products") {
                Ok(TestDataGenerator::products(id))
            } else if resource.ends_with("/shipping_addresses") {
                Ok(TestDataGenerator::shipping_addresses(id))
            } else {
                Ok(TestDataGenerator::coupons(id))
            }
        });
    }

    #[tokio::test]
    async fn test_single_digital_order_succeeds() {
        let mut mock = MockCommercePlatform::new();
        serving_subresources(&mut mock);
        mock.expect_put()
            .withf(|resource, payload| {
                resource == "/orders/42" && *payload == json!({"status_id": 8})
            })
            .times(1)
            .returning(|_, _| Ok(json!({})));

        let h = harness(mock);
        let outcome = h
            .processor
            .handle_batch(&[TestDataGenerator::order_message(42, true)])
            .await;

        assert!(outcome.is_success());
        assert_eq!(
            outcome.to_response().body.message,
            "Successfully wrote 1 orders to orders"
        );

        let stored = h.store.get(&json!(42)).await.unwrap();
        assert_eq!(stored["products"][0]["sku"], "TSHIRT-BLK-M");
        assert_eq!(stored["shipping_addresses"][0]["zip"], "NW1 5LR");

        let published = h.publisher.published().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].subject, "New Order 42");

        assert_eq!(h.queue.deleted().await, vec!["receipt-42".to_string()]);
    }

    #[tokio::test]
    async fn test_success_message_names_store_table() {
        let mut mock = MockCommercePlatform::new();
        serving_subresources(&mut mock);
        mock.expect_put().times(1).returning(|_, _| Ok(json!({})));

        let h = harness_with(
            mock,
            InMemoryDocumentStore::new().with_table("archived-orders"),
            RecordingTopicPublisher::new(),
        );
        assert_eq!(h.processor.table_name(), "archived-orders");

        let outcome = h
            .processor
            .handle_batch(&[TestDataGenerator::order_message(5, false)])
            .await;

        assert_eq!(
            outcome.to_response().body.message,
            "Successfully wrote 1 orders to archived-orders"
        );
    }

    #[tokio::test]
    async fn test_physical_order_uses_physical_status() {
        let mut mock = MockCommercePlatform::new();
        serving_subresources(&mut mock);
        mock.expect_put()
            .withf(|_, payload| *payload == json!({"status_id": 9}))
            .times(1)
            .returning(|_, _| Ok(json!({})));

        let h = harness(mock);
        let summary = h
            .processor
            .process_batch(&[TestDataGenerator::order_message(7, false)])
            .await
            .unwrap();

        assert_eq!(summary.processed, 1);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let mut mock = MockCommercePlatform::new();
        mock.expect_get().never();
        mock.expect_put().never();

        let h = harness(mock);
        let summary = h.processor.process_batch(&[]).await.unwrap();

        assert_eq!(summary.processed, 0);
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_persistence_failure_stops_before_status_update() {
        let mut mock = MockCommercePlatform::new();
        serving_subresources(&mut mock);
        mock.expect_put().never();

        let h = harness_with(
            mock,
            InMemoryDocumentStore::new().failing(),
            RecordingTopicPublisher::new(),
        );
        let err = h
            .processor
            .process_batch(&[TestDataGenerator::order_message(1, false)])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PersistenceFailed);
        assert!(h.publisher.published().await.is_empty());
        assert!(h.queue.deleted().await.is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_not_retried_and_not_acknowledged() {
        let mut mock = MockCommercePlatform::new();
        serving_subresources(&mut mock);
        mock.expect_put().times(1).returning(|_, _| Ok(json!({})));

        let h = harness_with(
            mock,
            InMemoryDocumentStore::new(),
            RecordingTopicPublisher::new().failing(),
        );
        let outcome = h
            .processor
            .handle_batch(&[
                TestDataGenerator::order_message(1, false),
                TestDataGenerator::order_message(2, false),
            ])
            .await;

        match outcome {
            BatchOutcome::Failure {
                kind,
                processed,
                failed_message_id,
                ..
            } => {
                assert_eq!(kind, ErrorKind::PublishFailed);
                assert_eq!(processed, 0);
                assert_eq!(failed_message_id.as_deref(), Some("msg-1"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        // 订单已写入，但消息未确认
        assert_eq!(h.store.len().await, 1);
        assert!(h.queue.deleted().await.is_empty());
    }

    #[tokio::test]
    async fn test_status_update_failure_reports_status_id() {
        let mut mock = MockCommercePlatform::new();
        serving_subresources(&mut mock);
        mock.expect_put().times(3).returning(|_, _| {
            Err(CommerceError::Request("connection reset".to_string()))
        });

        let h = harness(mock);
        let err = h
            .processor
            .process_batch(&[TestDataGenerator::order_message(3, true)])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProcessingError::StatusUpdateFailed {
                order_id: 3,
                status_id: 8,
                ..
            }
        ));
    }
}
