//! 订单处理 worker 入口
//!
//! `run`（默认）长轮询队列直到收到关闭信号；
//! `invoke --event <file>` 处理一次队列触发事件并输出调用响应。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use order_shared::aws::{AwsClients, load_sdk_config};
use order_shared::config::AppConfig;
use order_shared::observability;
use order_shared::queue::{MessageQueue, QueueEvent, SqsQueue};
use order_shared::retry::RetryPolicy;
use order_shared::store::DynamoDbStore;
use order_shared::topic::SnsPublisher;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use order_worker::accessor::RetryingAccessor;
use order_worker::commerce_client::BigCommerceClient;
use order_worker::consumer::OrderQueueConsumer;
use order_worker::processor::OrderBatchProcessor;
use order_worker::status::StatusPolicy;

const SERVICE_NAME: &str = "order-worker";

#[derive(Parser)]
#[command(name = "order-worker", version, about = "新订单处理 worker")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// 长轮询队列并处理订单，直到 Ctrl+C / SIGTERM
    Run,
    /// 处理一次队列触发事件（`{"Records": [...]}`）
    Invoke {
        /// 事件 JSON 文件路径
        #[arg(long)]
        event: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. 加载配置：config/*.toml + ORDER_* 环境变量 + 旧版环境变量
    let config = AppConfig::load(SERVICE_NAME)?;
    config.validate()?;

    // 2. 初始化可观测性
    let _guard = observability::init(&config.service_name, &config.observability).await?;
    info!(
        environment = %config.environment,
        table = %config.store.table,
        queue_url = %config.queue.queue_url,
        "Starting order-worker..."
    );

    // 3. 进程级客户端只创建一次，注入处理器
    let sdk_config = load_sdk_config(&config.aws).await;
    let aws = AwsClients::from_sdk_config(&sdk_config);

    let commerce = Arc::new(BigCommerceClient::new(&config.commerce)?);
    let queue: Arc<dyn MessageQueue> = Arc::new(SqsQueue::new(aws.sqs.clone(), &config.queue));
    let processor = Arc::new(OrderBatchProcessor::new(
        RetryingAccessor::new(commerce, RetryPolicy::from(&config.retry)),
        Arc::new(DynamoDbStore::new(aws.dynamodb.clone(), &config.store)),
        Arc::new(SnsPublisher::new(aws.sns.clone(), &config.notification)),
        queue.clone(),
        StatusPolicy::from(&config.fulfillment),
    ));
    info!("Services initialized");

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::spawn(async move {
                shutdown_signal().await;
                let _ = shutdown_tx.send(true);
            });

            OrderQueueConsumer::new(queue, &config.queue, processor)
                .run(shutdown_rx)
                .await;
            info!("Service shutdown complete");
        }
        Command::Invoke { event } => {
            let raw = tokio::fs::read_to_string(&event)
                .await
                .with_context(|| format!("读取事件文件失败: {}", event.display()))?;
            let event: QueueEvent = serde_json::from_str(&raw).context("事件 JSON 解析失败")?;

            let outcome = processor.handle_batch(&event.records).await;
            let response = outcome.to_response();
            println!("{}", serde_json::to_string_pretty(&response)?);

            if !outcome.is_success() {
                error!(message = %response.body.message, "订单批次处理失败");
                anyhow::bail!("订单批次处理失败: {}", response.body.message);
            }
        }
    }

    Ok(())
}

/// 优雅关闭信号处理
///
/// 监听 Ctrl+C 和 SIGTERM 信号
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
