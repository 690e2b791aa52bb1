//! 重试策略与执行器
//!
//! 对电商平台的读写调用做有界线性重试：失败后立即重试，不退避、不加抖动，
//! 也不区分错误是否可重试。尝试次数用尽后返回最后一次的错误。
//! 每个调用点独立持有一份重试预算。

use std::fmt::Display;
use std::future::Future;

use tracing::{info, warn};

use crate::config::RetryConfig;

// ---------------------------------------------------------------------------
// RetryPolicy: 重试策略配置
// ---------------------------------------------------------------------------

/// 重试策略配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大尝试次数（含首次执行）
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    /// 默认最多尝试 3 次
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// 实际生效的尝试次数，0 按 1 处理
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// 第 attempt 次（从 1 开始）失败后是否还能继续尝试
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.effective_attempts()
    }
}

// ---------------------------------------------------------------------------
// retry_with_policy: 带重试的异步执行器
// ---------------------------------------------------------------------------

/// 带重试的异步执行器
///
/// 状态流转：`Attempting(max) -> Success`，失败且仍有剩余次数时进入下一次尝试，
/// 最后一次尝试失败即 `Failed`，返回该次的错误。
pub async fn retry_with_policy<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.effective_attempts();
    let mut attempt: u32 = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(operation = operation_name, attempt, "操作在重试后成功");
                }
                return Ok(value);
            }
            Err(err) => {
                if !policy.should_retry(attempt) {
                    warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts,
                        error = %err,
                        "已达最大尝试次数，放弃重试"
                    );
                    return Err(err);
                }

                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    error = %err,
                    "操作失败，立即重试"
                );
                metrics::counter!(
                    "commerce_request_retries_total",
                    "operation" => operation_name.to_string()
                )
                .increment(1);
                attempt += 1;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 单元测试
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_default_retry_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::from(&RetryConfig { max_attempts: 5 });
        assert_eq!(policy.max_attempts, 5);
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::new(3);

        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        // 第 3 次失败后不再重试
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn test_zero_attempts_treated_as_one() {
        let policy = RetryPolicy::new(0);
        assert_eq!(policy.effective_attempts(), 1);
        assert!(!policy.should_retry(1));
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_try() {
        let policy = RetryPolicy::default();
        let call_count = Arc::new(AtomicU32::new(0));
        let counter = call_count.clone();

        let result = retry_with_policy(&policy, "test_op", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_fails_k_times_then_succeeds() {
        let policy = RetryPolicy::new(3);

        for k in 0..3u32 {
            let call_count = Arc::new(AtomicU32::new(0));
            let counter = call_count.clone();

            let result = retry_with_policy(&policy, "test_op", || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n < k {
                        Err(format!("failure #{n}"))
                    } else {
                        Ok(99)
                    }
                }
            })
            .await;

            assert_eq!(result.unwrap(), 99);
            assert_eq!(call_count.load(Ordering::SeqCst), k + 1);
        }
    }

    #[tokio::test]
    async fn test_retry_exhausts_attempts_and_returns_last_error() {
        let policy = RetryPolicy::new(3);
        let call_count = Arc::new(AtomicU32::new(0));
        let counter = call_count.clone();

        let result: Result<i32, String> = retry_with_policy(&policy, "test_op", || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Err(format!("failure #{n}"))
            }
        })
        .await;

        assert_eq!(result.unwrap_err(), "failure #2");
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_single_attempt_policy() {
        let policy = RetryPolicy::new(1);
        let call_count = Arc::new(AtomicU32::new(0));
        let counter = call_count.clone();

        let result: Result<(), String> = retry_with_policy(&policy, "test_op", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("boom".to_string())
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_retry_outside_runtime() {
        let result: Result<u32, String> = tokio_test::block_on(retry_with_policy(
            &RetryPolicy::default(),
            "blocking_op",
            || async { Ok(7) },
        ));
        assert_eq!(result, Ok(7));
    }
}
