//! 共享库
//!
//! 包含订单处理 worker 共用的配置、错误处理、重试、队列、文档存储、
//! 通知主题与可观测性等基础设施代码。

pub mod aws;
pub mod config;
pub mod error;
pub mod observability;
pub mod queue;
pub mod retry;
pub mod store;
pub mod test_utils;
pub mod topic;
