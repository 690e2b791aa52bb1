//! 订单处理错误类型
//!
//! 六类错误与处理步骤一一对应。任何一类错误都会中止当前批次，
//! 剩余消息不再处理，留在队列中等待重新投递。

use std::fmt;

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedMessage,
    SubresourceFetchFailed,
    PersistenceFailed,
    StatusUpdateFailed,
    PublishFailed,
    AcknowledgeFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedMessage => "MalformedMessage",
            Self::SubresourceFetchFailed => "SubresourceFetchFailed",
            Self::PersistenceFailed => "PersistenceFailed",
            Self::StatusUpdateFailed => "StatusUpdateFailed",
            Self::PublishFailed => "PublishFailed",
            Self::AcknowledgeFailed => "AcknowledgeFailed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 订单处理错误
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    /// 消息体无法解析为订单
    #[error("消息格式错误: message_id={message_id}, 原因={reason}")]
    MalformedMessage { message_id: String, reason: String },

    /// 子资源（商品、收货地址、优惠券）在重试耗尽后仍获取失败
    #[error("子资源获取失败: order_id={order_id}, resource={resource}, 原因={reason}")]
    SubresourceFetchFailed {
        order_id: u64,
        resource: String,
        reason: String,
    },

    /// 文档存储写入失败
    #[error("订单写入失败: order_id={order_id}, 原因={reason}")]
    PersistenceFailed { order_id: u64, reason: String },

    /// 电商平台订单状态在重试耗尽后仍更新失败
    #[error("订单状态更新失败: order_id={order_id}, status_id={status_id}, 原因={reason}")]
    StatusUpdateFailed {
        order_id: u64,
        status_id: u32,
        reason: String,
    },

    /// 通知发布失败，此时订单已写入且状态已更新
    #[error("通知发布失败: order_id={order_id}, 原因={reason}")]
    PublishFailed { order_id: u64, reason: String },

    /// 消息确认（删除）失败
    #[error("消息确认失败: message_id={message_id}, 原因={reason}")]
    AcknowledgeFailed { message_id: String, reason: String },
}

impl ProcessingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedMessage { .. } => ErrorKind::MalformedMessage,
            Self::SubresourceFetchFailed { .. } => ErrorKind::SubresourceFetchFailed,
            Self::PersistenceFailed { .. } => ErrorKind::PersistenceFailed,
            Self::StatusUpdateFailed { .. } => ErrorKind::StatusUpdateFailed,
            Self::PublishFailed { .. } => ErrorKind::PublishFailed,
            Self::AcknowledgeFailed { .. } => ErrorKind::AcknowledgeFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProcessingError::MalformedMessage {
            message_id: "msg-1".to_string(),
            reason: "expected value".to_string(),
        };
        assert_eq!(err.to_string(), "消息格式错误: message_id=msg-1, 原因=expected value");

        let err = ProcessingError::StatusUpdateFailed {
            order_id: 42,
            status_id: 9,
            reason: "503".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "订单状态更新失败: order_id=42, status_id=9, 原因=503"
        );

        let err = ProcessingError::SubresourceFetchFailed {
            order_id: 42,
            resource: "/orders/42/coupons".to_string(),
            reason: "timeout".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "子资源获取失败: order_id=42, resource=/orders/42/coupons, 原因=timeout"
        );
    }

    #[test]
    fn test_error_kind() {
        let err = ProcessingError::PersistenceFailed {
            order_id: 1,
            reason: "throttled".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::PersistenceFailed);
        assert_eq!(err.kind().as_str(), "PersistenceFailed");

        let err = ProcessingError::AcknowledgeFailed {
            message_id: "m".to_string(),
            reason: "gone".to_string(),
        };
        assert_eq!(err.kind().to_string(), "AcknowledgeFailed");
    }
}
