//! AWS SDK 客户端初始化
//!
//! 进程启动时加载一次 SDK 配置并创建各服务客户端，之后以句柄形式注入业务组件。

use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::info;

use crate::config::AwsConfig;

/// 各 AWS 服务客户端句柄
#[derive(Clone)]
pub struct AwsClients {
    pub sqs: aws_sdk_sqs::Client,
    pub dynamodb: aws_sdk_dynamodb::Client,
    pub sns: aws_sdk_sns::Client,
}

impl AwsClients {
    pub fn from_sdk_config(sdk_config: &SdkConfig) -> Self {
        Self {
            sqs: aws_sdk_sqs::Client::new(sdk_config),
            dynamodb: aws_sdk_dynamodb::Client::new(sdk_config),
            sns: aws_sdk_sns::Client::new(sdk_config),
        }
    }
}

/// 加载 SDK 配置
///
/// 未配置 region 时沿用默认凭据链（环境变量、profile、实例元数据）解析出的区域。
pub async fn load_sdk_config(config: &AwsConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(endpoint_url) = &config.endpoint_url {
        loader = loader.endpoint_url(endpoint_url);
    }

    let sdk_config = loader.load().await;
    info!(
        region = ?sdk_config.region(),
        endpoint_url = ?config.endpoint_url,
        "AWS SDK 配置已加载"
    );
    sdk_config
}
