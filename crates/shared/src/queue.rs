//! 订单队列基础设施封装
//!
//! 将队列服务（SQS）的底层 API 封装为业务友好的 `MessageQueue` 抽象，
//! 统一消息表示、错误映射和优雅关闭语义。
//! 处理成功的消息由业务方显式删除（确认）；未确认的消息在可见性超时后
//! 由队列服务重新投递或转入死信队列。

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_sqs::Client as SqsClient;
use aws_sdk_sqs::error::DisplayErrorContext;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::QueueConfig;
use crate::error::InfraError;

/// 拉取失败后的等待时间，避免队列服务不可用时空转
const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// QueueMessage
// ---------------------------------------------------------------------------

/// 队列消息的统一表示
///
/// 字段命名与队列触发事件中的记录一致（`messageId`、`receiptHandle`、`body`），
/// 因此既能由拉取结果构造，也能直接从触发事件 JSON 反序列化。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessage {
    pub message_id: String,
    /// 确认（删除）消息时使用的不透明凭据
    pub receipt_handle: String,
    #[serde(default)]
    pub body: String,
}

impl QueueMessage {
    pub fn new(
        message_id: impl Into<String>,
        receipt_handle: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            receipt_handle: receipt_handle.into(),
            body: body.into(),
        }
    }
}

/// 队列触发事件：`{"Records": [...]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<QueueMessage>,
}

// ---------------------------------------------------------------------------
// MessageQueue trait
// ---------------------------------------------------------------------------

/// 消息队列抽象，便于测试时注入内存实现
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// 拉取一批消息（长轮询）
    async fn receive(
        &self,
        max_messages: i32,
        wait_time_seconds: i32,
    ) -> Result<Vec<QueueMessage>, InfraError>;

    /// 按确认凭据删除消息
    async fn delete(&self, receipt_handle: &str) -> Result<(), InfraError>;
}

// ---------------------------------------------------------------------------
// SqsQueue
// ---------------------------------------------------------------------------

/// 基于 SQS 的消息队列
///
/// `SqsClient` 内部是 Arc 包装的，clone 是廉价操作。
#[derive(Clone)]
pub struct SqsQueue {
    client: SqsClient,
    queue_url: String,
    visibility_timeout_seconds: Option<i32>,
}

impl SqsQueue {
    pub fn new(client: SqsClient, config: &QueueConfig) -> Self {
        info!(queue_url = %config.queue_url, "SQS 队列客户端已初始化");
        Self {
            client,
            queue_url: config.queue_url.clone(),
            visibility_timeout_seconds: config.visibility_timeout_seconds,
        }
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn receive(
        &self,
        max_messages: i32,
        wait_time_seconds: i32,
    ) -> Result<Vec<QueueMessage>, InfraError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_time_seconds)
            .set_visibility_timeout(self.visibility_timeout_seconds)
            .send()
            .await
            .map_err(|e| InfraError::Queue(format!("拉取消息失败: {}", DisplayErrorContext(&e))))?;

        let mut messages = Vec::with_capacity(output.messages().len());
        for msg in output.messages() {
            // 缺少确认凭据的消息无法删除，跳过后由队列服务重新投递
            let Some(receipt_handle) = msg.receipt_handle() else {
                warn!(message_id = ?msg.message_id(), "消息缺少 receipt handle，跳过");
                continue;
            };
            messages.push(QueueMessage {
                message_id: msg.message_id().unwrap_or_default().to_string(),
                receipt_handle: receipt_handle.to_string(),
                body: msg.body().unwrap_or_default().to_string(),
            });
        }

        debug!(count = messages.len(), "已拉取队列消息");
        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), InfraError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| InfraError::Queue(format!("删除消息失败: {}", DisplayErrorContext(&e))))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// QueueConsumer
// ---------------------------------------------------------------------------

/// 面向业务的队列消费者
///
/// 长轮询拉取消息批次，基于 `watch` channel 提供优雅关闭：
/// 正在处理的批次会自然完成，之后才退出循环。
pub struct QueueConsumer<Q: MessageQueue + ?Sized> {
    queue: std::sync::Arc<Q>,
    max_messages: i32,
    wait_time_seconds: i32,
}

impl<Q: MessageQueue + ?Sized> QueueConsumer<Q> {
    pub fn new(queue: std::sync::Arc<Q>, config: &QueueConfig) -> Self {
        Self {
            queue,
            max_messages: config.max_messages,
            wait_time_seconds: config.wait_time_seconds,
        }
    }

    /// 启动消费循环
    ///
    /// handler 返回错误只记录日志而不中断循环，未确认的消息留在队列中等待重新投递。
    /// 拉取出错时等待片刻后继续。
    pub async fn start<F, Fut, E>(&self, mut shutdown: watch::Receiver<bool>, handler: F)
    where
        F: Fn(Vec<QueueMessage>) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        info!(
            max_messages = self.max_messages,
            wait_time_seconds = self.wait_time_seconds,
            "队列消费循环已启动"
        );

        loop {
            if *shutdown.borrow() {
                info!("收到关闭信号，队列消费循环退出");
                break;
            }

            tokio::select! {
                // 偏向关闭信号，保证收到关闭时能尽快退出
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("收到关闭信号，队列消费循环退出");
                        break;
                    }
                }

                received = self.queue.receive(self.max_messages, self.wait_time_seconds) => {
                    match received {
                        Ok(messages) if messages.is_empty() => {
                            debug!("本轮长轮询未收到消息");
                        }
                        Ok(messages) => {
                            debug!(count = messages.len(), "收到队列消息批次");
                            if let Err(e) = handler(messages).await {
                                error!(error = %e, "处理队列消息批次失败");
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "拉取队列消息出错");
                            tokio::time::sleep(RECEIVE_ERROR_BACKOFF).await;
                        }
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------
