//! 文档存储封装
//!
//! 订单归档使用键值/文档存储（DynamoDB），以订单 ID 为主键整条写入。
//! 写入是无条件覆盖（后写者胜），不做幂等或条件写检查。

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::InfraError;

/// 文档存储抽象
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 写入一条文档，item 必须是 JSON 对象
    async fn put_item(&self, item: &Value) -> Result<(), InfraError>;

    /// 目标表名，用于日志与响应信息
    fn table_name(&self) -> &str;
}

/// 基于 DynamoDB 的文档存储
#[derive(Clone)]
pub struct DynamoDbStore {
    client: DynamoDbClient,
    table: String,
}

impl DynamoDbStore {
    pub fn new(client: DynamoDbClient, config: &StoreConfig) -> Self {
        info!(table = %config.table, "DynamoDB 文档存储已初始化");
        Self {
            client,
            table: config.table.clone(),
        }
    }
}

#[async_trait]
impl DocumentStore for DynamoDbStore {
    async fn put_item(&self, item: &Value) -> Result<(), InfraError> {
        let attributes = to_item(item)?;

        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(attributes))
            .send()
            .await
            .map_err(|e| InfraError::Store(format!("写入失败: {}", DisplayErrorContext(&e))))?;

        debug!(table = %self.table, "文档已写入");
        Ok(())
    }

    fn table_name(&self) -> &str {
        &self.table
    }
}

/// 将 JSON 对象转换为 DynamoDB item
pub fn to_item(item: &Value) -> Result<HashMap<String, AttributeValue>, InfraError> {
    match item {
        Value::Object(map) => Ok(map
            .iter()
            .map(|(k, v)| (k.clone(), to_attribute_value(v)))
            .collect()),
        other => Err(InfraError::Store(format!(
            "文档必须是 JSON 对象，实际为: {}",
            json_type_name(other)
        ))),
    }
}

/// JSON 值到 DynamoDB 属性值的映射
///
/// 数字以字符串形式保存（N 类型），空字符串原样保存为 S。
pub fn to_attribute_value(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(to_attribute_value).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), to_attribute_value(v)))
                .collect(),
        ),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
