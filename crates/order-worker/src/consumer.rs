//! 订单队列消费者
//!
//! 长轮询拉取订单消息批次，交给 `OrderBatchProcessor` 处理。
//! 批次失败时未确认的消息在可见性超时后由队列重新投递。

use std::sync::Arc;

use order_shared::config::QueueConfig;
use order_shared::queue::{MessageQueue, QueueConsumer};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::outcome::BatchOutcome;
use crate::processor::OrderBatchProcessor;

pub struct OrderQueueConsumer {
    consumer: QueueConsumer<dyn MessageQueue>,
    processor: Arc<OrderBatchProcessor>,
}

impl OrderQueueConsumer {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        config: &QueueConfig,
        processor: Arc<OrderBatchProcessor>,
    ) -> Self {
        Self {
            consumer: QueueConsumer::new(queue, config),
            processor,
        }
    }

    /// 启动消费循环，直到收到 shutdown 信号
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        info!(table = %self.processor.table_name(), "订单消费者已启动");

        let processor = &self.processor;
        self.consumer
            .start(shutdown, |messages| async move {
                match processor.handle_batch(&messages).await {
                    BatchOutcome::Success { count, .. } => {
                        info!(count, "订单批次处理完成");
                        Ok(())
                    }
                    BatchOutcome::Failure {
                        kind,
                        detail,
                        processed,
                        failed_message_id,
                    } => {
                        warn!(
                            processed,
                            remaining = messages.len() - processed,
                            failed_message_id = ?failed_message_id,
                            "批次中未完成的消息将由队列重新投递"
                        );
                        Err(format!("{kind}: {detail}"))
                    }
                }
            })
            .await;

        info!("订单消费者已停止");
    }
}
