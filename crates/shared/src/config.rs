//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。
//! 配置在进程启动时加载一次，之后作为只读数据注入各组件。

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::error::InfraError;

/// 电商平台 API 配置
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct CommerceConfig {
    pub api_base_url: String,
    pub store_hash: String,
    pub client_id: String,
    pub access_token: String,
    pub api_version: String,
    pub request_timeout_seconds: u64,
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.bigcommerce.com".to_string(),
            store_hash: String::new(),
            client_id: String::new(),
            access_token: String::new(),
            api_version: "v2".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

// access_token 不能出现在日志中
impl std::fmt::Debug for CommerceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceConfig")
            .field("api_base_url", &self.api_base_url)
            .field("store_hash", &self.store_hash)
            .field("client_id", &self.client_id)
            .field("access_token", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

/// 订单队列配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub queue_url: String,
    /// 单次拉取的最大消息数（队列服务上限为 10）
    pub max_messages: i32,
    /// 长轮询等待时间
    pub wait_time_seconds: i32,
    pub visibility_timeout_seconds: Option<i32>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_url: String::new(),
            max_messages: 10,
            wait_time_seconds: 20,
            visibility_timeout_seconds: None,
        }
    }
}

/// 文档存储配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table: "orders".to_string(),
        }
    }
}

/// 通知主题配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct NotificationConfig {
    pub topic_arn: String,
}

/// 订单履约状态配置
///
/// 数字商品与实物商品处理完成后写回电商平台的状态码。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FulfillmentConfig {
    /// 9 = Awaiting Shipment
    pub physical_status_id: u32,
    /// 8 = Awaiting Pickup，店铺后台重命名为 Digital Order Complete
    pub digital_status_id: u32,
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            physical_status_id: 9,
            digital_status_id: 8,
        }
    }
}

/// 电商平台调用的重试配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// AWS SDK 配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AwsConfig {
    pub region: Option<String>,
    /// 本地联调时指向 LocalStack 等模拟端点
    pub endpoint_url: Option<String>,
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 是否输出 JSON 结构化日志
    pub json_logs: bool,
    pub metrics_enabled: bool,
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_port: 9090,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub commerce: CommerceConfig,
    pub queue: QueueConfig,
    pub store: StoreConfig,
    pub notification: NotificationConfig,
    pub fulfillment: FulfillmentConfig,
    pub retry: RetryConfig,
    pub aws: AwsConfig,
    pub observability: ObservabilityConfig,
}

/// 旧部署方式使用的无前缀环境变量
const LEGACY_ENV_VARS: [&str; 6] = [
    "CLIENT_ID",
    "TOKEN",
    "STORE_HASH",
    "SQS_QUEUE_URL",
    "TABLE",
    "PROCESSED_SNS_TOPIC_ARN",
];

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（ORDER_ 前缀，如 ORDER_COMMERCE__STORE_HASH -> commerce.store_hash）
    /// 5. 旧部署的无前缀环境变量（CLIENT_ID、TOKEN、STORE_HASH 等）
    pub fn load(service_name: &str) -> Result<Self, InfraError> {
        // .env 文件不存在是正常情况
        let _ = dotenvy::dotenv();

        let env = std::env::var("ORDER_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", service_name)))
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("ORDER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;
        config.apply_legacy_env(|key| std::env::var(key).ok());

        Ok(config)
    }

    /// 应用旧部署方式的环境变量覆盖
    ///
    /// 通过 lookup 闭包读取变量，测试时无需修改进程环境。
    /// 空值视为未设置。
    pub fn apply_legacy_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for key in LEGACY_ENV_VARS {
            let Some(value) = lookup(key).filter(|v| !v.is_empty()) else {
                continue;
            };
            match key {
                "CLIENT_ID" => self.commerce.client_id = value,
                "TOKEN" => self.commerce.access_token = value,
                "STORE_HASH" => self.commerce.store_hash = value,
                "SQS_QUEUE_URL" => self.queue.queue_url = value,
                "TABLE" => self.store.table = value,
                "PROCESSED_SNS_TOPIC_ARN" => self.notification.topic_arn = value,
                _ => {}
            }
        }
    }

    /// 校验启动所需的配置项
    pub fn validate(&self) -> Result<(), InfraError> {
        let required = [
            ("commerce.store_hash", &self.commerce.store_hash),
            ("commerce.client_id", &self.commerce.client_id),
            ("commerce.access_token", &self.commerce.access_token),
            ("queue.queue_url", &self.queue.queue_url),
            ("store.table", &self.store.table),
            ("notification.topic_arn", &self.notification.topic_arn),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(InfraError::Config(format!("{field} 不能为空")));
            }
        }

        if self.retry.max_attempts == 0 {
            return Err(InfraError::Config(
                "retry.max_attempts 必须大于 0".to_string(),
            ));
        }

        if !(1..=10).contains(&self.queue.max_messages) {
            return Err(InfraError::Config(format!(
                "queue.max_messages 必须在 1 到 10 之间，当前为 {}",
                self.queue.max_messages
            )));
        }

        if self.fulfillment.physical_status_id == self.fulfillment.digital_status_id {
            return Err(InfraError::Config(format!(
                "实物与数字订单状态码不能相同: {}",
                self.fulfillment.physical_status_id
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.commerce.store_hash = "abc123".to_string();
        config.commerce.client_id = "client".to_string();
        config.commerce.access_token = "secret-token".to_string();
        config.queue.queue_url = "https://sqs.us-east-1.amazonaws.com/1/new-orders".to_string();
        config.notification.topic_arn = "arn:aws:sns:us-east-1:1:processed-orders".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.fulfillment.physical_status_id, 9);
        assert_eq!(config.fulfillment.digital_status_id, 8);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.store.table, "orders");
        assert_eq!(config.queue.max_messages, 10);
        assert_eq!(config.commerce.api_version, "v2");
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_credentials() {
        let mut config = valid_config();
        config.commerce.access_token = "  ".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("commerce.access_token"));
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = valid_config();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_batch_size_out_of_range() {
        let mut config = valid_config();
        config.queue.max_messages = 11;
        assert!(config.validate().is_err());

        config.queue.max_messages = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_identical_status_ids() {
        let mut config = valid_config();
        config.fulfillment.digital_status_id = 9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_legacy_env() {
        let vars = HashMap::from([
            ("CLIENT_ID", "legacy-client"),
            ("TOKEN", "legacy-token"),
            ("STORE_HASH", "legacy-hash"),
            ("SQS_QUEUE_URL", "https://sqs.local/queue"),
            ("TABLE", "legacy-orders"),
            ("PROCESSED_SNS_TOPIC_ARN", "arn:aws:sns:local:1:topic"),
        ]);

        let mut config = AppConfig::default();
        config.apply_legacy_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.commerce.client_id, "legacy-client");
        assert_eq!(config.commerce.access_token, "legacy-token");
        assert_eq!(config.commerce.store_hash, "legacy-hash");
        assert_eq!(config.queue.queue_url, "https://sqs.local/queue");
        assert_eq!(config.store.table, "legacy-orders");
        assert_eq!(config.notification.topic_arn, "arn:aws:sns:local:1:topic");
    }

    #[test]
    fn test_apply_legacy_env_ignores_empty_values() {
        let mut config = AppConfig::default();
        config.apply_legacy_env(|key| (key == "TABLE").then(String::new));
        assert_eq!(config.store.table, "orders");
    }

    #[test]
    fn test_commerce_config_debug_redacts_token() {
        let config = valid_config();
        let debug = format!("{:?}", config.commerce);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("<redacted>"));
    }
}
