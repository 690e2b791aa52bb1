//! 通知主题封装
//!
//! 订单处理完成后向发布/订阅主题（SNS）发送一条带标题的文本通知，
//! 由订阅方（邮件、运营群等）负责后续投递。

use async_trait::async_trait;
use aws_sdk_sns::Client as SnsClient;
use aws_sdk_sns::error::DisplayErrorContext;
use tracing::{debug, info};

use crate::config::NotificationConfig;
use crate::error::InfraError;

/// 主题服务对 Subject 的长度限制
pub const MAX_SUBJECT_LEN: usize = 100;

/// 通知发布抽象
#[async_trait]
pub trait TopicPublisher: Send + Sync {
    /// 发布通知，返回主题服务分配的消息 ID
    async fn publish(&self, subject: &str, message: &str) -> Result<String, InfraError>;
}

/// 基于 SNS 的通知发布器
#[derive(Clone)]
pub struct SnsPublisher {
    client: SnsClient,
    topic_arn: String,
}

impl SnsPublisher {
    pub fn new(client: SnsClient, config: &NotificationConfig) -> Self {
        info!(topic_arn = %config.topic_arn, "SNS 通知发布器已初始化");
        Self {
            client,
            topic_arn: config.topic_arn.clone(),
        }
    }
}

#[async_trait]
impl TopicPublisher for SnsPublisher {
    async fn publish(&self, subject: &str, message: &str) -> Result<String, InfraError> {
        let output = self
            .client
            .publish()
            .topic_arn(&self.topic_arn)
            .subject(truncate_subject(subject))
            .message(message)
            .send()
            .await
            .map_err(|e| InfraError::Topic(format!("发布通知失败: {}", DisplayErrorContext(&e))))?;

        let message_id = output.message_id().unwrap_or_default().to_string();
        debug!(topic_arn = %self.topic_arn, message_id = %message_id, "通知已发布");
        Ok(message_id)
    }
}

/// 按字符截断 Subject，避免超长被主题服务拒绝
pub fn truncate_subject(subject: &str) -> String {
    subject.chars().take(MAX_SUBJECT_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_subject_unchanged() {
        assert_eq!(truncate_subject("New Order 42"), "New Order 42");
    }

    #[test]
    fn test_long_subject_truncated_by_chars() {
        let subject = "订".repeat(150);
        let truncated = truncate_subject(&subject);
        assert_eq!(truncated.chars().count(), MAX_SUBJECT_LEN);
    }
}
