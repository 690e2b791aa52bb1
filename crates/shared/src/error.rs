//! 统一错误处理模块
//!
//! 定义基础设施层（配置、队列、文档存储、通知主题）共享的错误类型，
//! 使用 thiserror 提供良好的错误信息。业务流程错误由各服务自行定义。

use thiserror::Error;

/// 基础设施错误类型
#[derive(Debug, Error)]
pub enum InfraError {
    // ==================== 配置错误 ====================
    #[error("配置错误: {0}")]
    Config(String),

    // ==================== 队列错误 ====================
    #[error("队列错误: {0}")]
    Queue(String),

    // ==================== 存储错误 ====================
    #[error("文档存储错误: {0}")]
    Store(String),

    // ==================== 通知主题错误 ====================
    #[error("通知主题错误: {0}")]
    Topic(String),

    // ==================== 序列化错误 ====================
    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    // ==================== 外部服务错误 ====================
    #[error("外部服务错误: {service} - {message}")]
    ExternalService { service: String, message: String },

    // ==================== 通用错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, InfraError>;

impl InfraError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Queue(_) => "QUEUE_ERROR",
            Self::Store(_) => "STORE_ERROR",
            Self::Topic(_) => "TOPIC_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<config::ConfigError> for InfraError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
