//! 批次处理结果
//!
//! 成功与失败统一用 `BatchOutcome` 返回，由调用方转换为调用响应。

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, ProcessingError};

/// 整批成功时的汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Success {
        count: usize,
        table: String,
    },
    Failure {
        kind: ErrorKind,
        detail: String,
        /// 失败前已完整处理（含确认）的消息数
        processed: usize,
        failed_message_id: Option<String>,
    },
}

impl BatchOutcome {
    pub fn success(summary: BatchSummary, table: impl Into<String>) -> Self {
        Self::Success {
            count: summary.processed,
            table: table.into(),
        }
    }

    pub fn failure(
        error: &ProcessingError,
        processed: usize,
        failed_message_id: Option<String>,
    ) -> Self {
        Self::Failure {
            kind: error.kind(),
            detail: error.to_string(),
            processed,
            failed_message_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// 已完整处理的消息数
    pub fn processed(&self) -> usize {
        match self {
            Self::Success { count, .. } => *count,
            Self::Failure { processed, .. } => *processed,
        }
    }

    pub fn to_response(&self) -> InvocationResponse {
        match self {
            Self::Success { count, table } => InvocationResponse::new(
                200,
                format!("Successfully wrote {count} orders to {table}"),
            ),
            Self::Failure { kind, detail, .. } => {
                InvocationResponse::new(500, format!("{kind}: {detail}"))
            }
        }
    }
}

/// 调用响应：`{"statusCode": 200, "body": {"status": 200, "message": "..."}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseBody {
    pub status: u16,
    pub message: String,
}

impl InvocationResponse {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status_code: status,
            body: ResponseBody {
                status,
                message: message.into(),
            },
        }
    }
}
