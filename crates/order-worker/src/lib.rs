//! 订单处理 worker
//!
//! 消费队列中的新订单消息：从电商平台补全子资源，写入文档存储，
//! 更新平台订单状态，发布新订单通知，最后确认消息。
//! 同一批次内的消息严格顺序处理，任一失败即中止整批。

pub mod accessor;
pub mod commerce_client;
pub mod consumer;
pub mod error;
pub mod models;
pub mod notification;
pub mod outcome;
pub mod processor;
pub mod status;
