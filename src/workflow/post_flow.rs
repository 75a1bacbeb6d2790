//! 帖子处理流程 - 流程层
//!
//! 核心职责：定义"一个帖子"的完整处理流程
//!
//! 流程顺序：
//! 1. 构建提示词
//! 2. 限流 → 调用模型
//! 3. 失败时交给 RetryCoordinator：等待后回到 2，或放弃并生成降级结果
//! 4. 成功时解析回复
//!
//! 本流程永远返回一个分析结果，单个帖子的失败不会向上传播。

use tokio::time::sleep;
use tracing::{info, warn};

use crate::models::{AnalysisResult, Post};
use crate::services::prompt_builder::build_prompt;
use crate::services::response_parser::{self, ParseOutcome};
use crate::services::retry::{GiveUpReason, RetryCoordinator, RetryDecision};
use crate::services::{Analyzer, RateLimiter};
use crate::workflow::post_ctx::PostCtx;

/// 帖子的终态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// 模型返回了结构化分析
    Analyzed,
    /// 模型回复无法解析，已降级
    Unstructured,
    /// 调用失败，结果记录了错误
    Failed(GiveUpReason),
}

/// 单个帖子的处理报告
#[derive(Debug, Clone)]
pub struct ItemReport {
    pub analysis: AnalysisResult,
    pub outcome: ItemOutcome,
    /// 实际发起的外部调用次数
    pub attempts: u32,
}

/// 帖子处理流程
///
/// - 不持有工作集，也不负责持久化
/// - 限流器由调用方借入，重试同样要经过限流
pub struct PostFlow<'a, A: Analyzer + ?Sized> {
    analyzer: &'a A,
    retry: RetryCoordinator,
}

impl<'a, A: Analyzer + ?Sized> PostFlow<'a, A> {
    pub fn new(analyzer: &'a A, retry: RetryCoordinator) -> Self {
        Self { analyzer, retry }
    }

    pub async fn run(&self, post: &Post, ctx: &PostCtx, limiter: &mut RateLimiter) -> ItemReport {
        let prompt = build_prompt(post);
        let mut attempt = 0;

        loop {
            attempt += 1;
            limiter.gate().await;

            let error = match self.analyzer.complete(&prompt).await {
                Ok(raw) => {
                    let (analysis, parsed) = response_parser::parse_with_outcome(&raw);
                    let outcome = match parsed {
                        ParseOutcome::Structured => ItemOutcome::Analyzed,
                        ParseOutcome::Degraded => {
                            warn!("{} ⚠️ 模型回复不是结构化数据，已保存原文", ctx);
                            ItemOutcome::Unstructured
                        }
                    };
                    return ItemReport {
                        analysis,
                        outcome,
                        attempts: attempt,
                    };
                }
                Err(e) => e.to_string(),
            };

            match self.retry.decide(attempt, &error) {
                RetryDecision::RetryAfter(wait) => {
                    warn!(
                        "{} ⚠ 触发限流，等待 {:.1} 秒后重试...",
                        ctx,
                        wait.as_secs_f64()
                    );
                    sleep(wait).await;
                    info!(
                        "{} ↻ 重试 (第 {}/{} 次)...",
                        ctx,
                        attempt + 1,
                        self.retry.max_attempts()
                    );
                }
                RetryDecision::GiveUp(reason) => {
                    match reason {
                        GiveUpReason::Exhausted => {
                            warn!("{} ✗ 已达最大重试次数: {}", ctx, error)
                        }
                        GiveUpReason::NonRetryable => {
                            warn!("{} ✗ 分析失败（不可重试）: {}", ctx, error)
                        }
                    }
                    return ItemReport {
                        analysis: AnalysisResult::from_error(&error),
                        outcome: ItemOutcome::Failed(reason),
                        attempts: attempt,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::LlmError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// 按脚本依次返回结果的分析服务
    struct ScriptedAnalyzer {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
    }

    impl ScriptedAnalyzer {
        fn new(replies: Vec<Result<String, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }

        fn remaining(&self) -> usize {
            self.replies.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Analyzer for ScriptedAnalyzer {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::api_call_failed("mock", "脚本已用完")))
        }
    }

    fn provider_error(msg: &str) -> Result<String, LlmError> {
        Err(LlmError::api_call_failed("mock", msg))
    }

    fn run_flow(analyzer: &ScriptedAnalyzer) -> (PostFlow<'_, ScriptedAnalyzer>, RateLimiter, PostCtx) {
        let config = Config::default();
        (
            PostFlow::new(analyzer, RetryCoordinator::new(&config)),
            RateLimiter::new(&config),
            PostCtx::new("1".to_string(), 1, 1),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let analyzer = ScriptedAnalyzer::new(vec![Ok(r#"{"summary": "good"}"#.to_string())]);
        let (flow, mut limiter, ctx) = run_flow(&analyzer);

        let report = flow.run(&Post::new(1, "t", "c"), &ctx, &mut limiter).await;

        assert_eq!(report.outcome, ItemOutcome::Analyzed);
        assert_eq!(report.attempts, 1);
        assert_eq!(report.analysis.summary(), "good");
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_then_success_waits_suggested_delay() {
        let analyzer = ScriptedAnalyzer::new(vec![
            provider_error("429 quota exceeded. Please retry in 12.5s"),
            Ok("plain prose".to_string()),
        ]);
        let (flow, mut limiter, ctx) = run_flow(&analyzer);
        let start = Instant::now();

        let report = flow.run(&Post::new(1, "t", "c"), &ctx, &mut limiter).await;

        let waited = Instant::now() - start;
        assert!(waited >= Duration::from_secs_f64(14.5) && waited < Duration::from_secs(15));
        assert_eq!(report.outcome, ItemOutcome::Unstructured);
        assert_eq!(report.attempts, 2);
        assert_eq!(report.analysis.detailed_analysis(), "plain prose");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_produces_error_result() {
        let analyzer = ScriptedAnalyzer::new(vec![
            provider_error("429 rate limit"),
            provider_error("429 rate limit"),
            provider_error("429 rate limit"),
            Ok("never reached".to_string()),
        ]);
        let (flow, mut limiter, ctx) = run_flow(&analyzer);

        let report = flow.run(&Post::new(1, "t", "c"), &ctx, &mut limiter).await;

        assert_eq!(report.outcome, ItemOutcome::Failed(GiveUpReason::Exhausted));
        assert_eq!(report.attempts, 3);
        assert!(report.analysis.is_error());
        assert!(report.analysis.summary().contains("429 rate limit"));
        assert_eq!(analyzer.remaining(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_fails_without_retry() {
        let analyzer = ScriptedAnalyzer::new(vec![
            provider_error("401 invalid api key"),
            Ok("never reached".to_string()),
        ]);
        let (flow, mut limiter, ctx) = run_flow(&analyzer);
        let start = Instant::now();

        let report = flow.run(&Post::new(1, "t", "c"), &ctx, &mut limiter).await;

        assert_eq!(report.outcome, ItemOutcome::Failed(GiveUpReason::NonRetryable));
        assert_eq!(report.attempts, 1);
        assert_eq!(Instant::now(), start);
        assert!(report.analysis.detailed_analysis().contains("401 invalid api key"));
    }
}
