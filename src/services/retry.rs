//! 失败分类与重试退避 - 业务能力层
//!
//! 服务商通过错误文本表达限流（HTTP 429、"quota"、"rate limit"），
//! 并常在文本中给出建议的等待时间。匹配规则集中在 [`classify_failure`]，
//! [`RetryCoordinator`] 只负责预算和等待时长。

use crate::config::Config;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static RETRY_IN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)retry in ([0-9]+(?:\.[0-9]+)?)s").expect("合法的正则"));

static RETRY_SECONDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"seconds:\s*([0-9]+)").expect("合法的正则"));

/// 失败类别
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailureKind {
    /// 限流，可重试；附带服务商建议的等待秒数
    Throttled { suggested_delay: Option<f64> },
    /// 其他错误，不重试
    Fatal,
}

/// 失败分类函数签名，可替换以适配不同服务商
pub type Classifier = fn(&str) -> FailureKind;

/// 根据错误文本分类失败
pub fn classify_failure(message: &str) -> FailureKind {
    let lower = message.to_lowercase();
    if message.contains("429") || lower.contains("quota") || lower.contains("rate limit") {
        FailureKind::Throttled {
            suggested_delay: extract_retry_delay(message),
        }
    } else {
        FailureKind::Fatal
    }
}

/// 从错误文本中提取建议的等待秒数
///
/// 依次匹配 "retry in <秒>s" 和 "seconds: <整数>"。
pub fn extract_retry_delay(message: &str) -> Option<f64> {
    [&*RETRY_IN, &*RETRY_SECONDS].iter().find_map(|re| {
        re.captures(message)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    })
}

/// 终止当前帖子的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    /// 不可重试的错误
    NonRetryable,
    /// 重试次数耗尽
    Exhausted,
}

/// 重试决策
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetryDecision {
    /// 等待后重试同一个帖子
    RetryAfter(Duration),
    /// 放弃当前帖子
    GiveUp(GiveUpReason),
}

/// 重试协调器
#[derive(Debug, Clone)]
pub struct RetryCoordinator {
    max_attempts: u32,
    default_backoff: Duration,
    backoff_buffer: Duration,
    classifier: Classifier,
}

impl RetryCoordinator {
    /// 按配置创建
    pub fn new(config: &Config) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            default_backoff: config.default_backoff,
            backoff_buffer: config.backoff_buffer,
            classifier: classify_failure,
        }
    }

    /// 替换失败分类规则
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// 总尝试次数（含首次）
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 第 `attempt` 次尝试（从 1 开始）失败后的决策
    pub fn decide(&self, attempt: u32, message: &str) -> RetryDecision {
        match (self.classifier)(message) {
            FailureKind::Fatal => RetryDecision::GiveUp(GiveUpReason::NonRetryable),
            FailureKind::Throttled { .. } if attempt >= self.max_attempts => {
                RetryDecision::GiveUp(GiveUpReason::Exhausted)
            }
            FailureKind::Throttled { suggested_delay } => {
                RetryDecision::RetryAfter(self.backoff(suggested_delay))
            }
        }
    }

    /// 退避时长：建议值加缓冲，没有建议值时使用默认退避
    pub fn backoff(&self, suggested_delay: Option<f64>) -> Duration {
        suggested_delay
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .map(|d| d + self.backoff_buffer)
            .unwrap_or(self.default_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> RetryCoordinator {
        RetryCoordinator::new(&Config::default())
    }

    fn wait_for(message: &str) -> Duration {
        match coordinator().decide(1, message) {
            RetryDecision::RetryAfter(d) => d,
            other => panic!("应当重试，实际为 {:?}", other),
        }
    }

    #[test]
    fn test_classify_throttling_markers() {
        assert!(matches!(
            classify_failure("HTTP 429 Too Many Requests"),
            FailureKind::Throttled { .. }
        ));
        assert!(matches!(
            classify_failure("You exceeded your current QUOTA"),
            FailureKind::Throttled { .. }
        ));
        assert!(matches!(
            classify_failure("Rate Limit reached for requests"),
            FailureKind::Throttled { .. }
        ));
        assert_eq!(classify_failure("401 invalid api key"), FailureKind::Fatal);
        assert_eq!(classify_failure("connection reset by peer"), FailureKind::Fatal);
    }

    #[test]
    fn test_backoff_from_retry_in_hint() {
        assert_eq!(wait_for("429 quota exceeded. Please retry in 12.5s."), Duration::from_secs_f64(14.5));
    }

    #[test]
    fn test_backoff_from_seconds_hint() {
        assert_eq!(
            wait_for("429 Resource exhausted. retry_delay { seconds: 30 }"),
            Duration::from_secs(32)
        );
    }

    #[test]
    fn test_retry_in_takes_priority_over_seconds() {
        assert_eq!(
            extract_retry_delay("Please retry in 4s. retry_delay { seconds: 30 }"),
            Some(4.0)
        );
    }

    #[test]
    fn test_backoff_defaults_without_hint() {
        assert_eq!(wait_for("rate limit exceeded"), Duration::from_secs(60));
        assert_eq!(extract_retry_delay("rate limit exceeded"), None);
    }

    #[test]
    fn test_budget_is_exhausted_on_last_attempt() {
        let retry = coordinator();
        let message = "429 Too Many Requests";

        assert!(matches!(retry.decide(1, message), RetryDecision::RetryAfter(_)));
        assert!(matches!(retry.decide(2, message), RetryDecision::RetryAfter(_)));
        assert_eq!(
            retry.decide(3, message),
            RetryDecision::GiveUp(GiveUpReason::Exhausted)
        );
    }

    #[test]
    fn test_non_retryable_gives_up_immediately() {
        assert_eq!(
            coordinator().decide(1, "500 internal error"),
            RetryDecision::GiveUp(GiveUpReason::NonRetryable)
        );
    }

    #[test]
    fn test_custom_classifier_replaces_rules() {
        let retry = coordinator().with_classifier(|msg| {
            if msg.contains("RESOURCE_EXHAUSTED") {
                FailureKind::Throttled { suggested_delay: Some(1.0) }
            } else {
                FailureKind::Fatal
            }
        });

        assert_eq!(
            retry.decide(1, "status: RESOURCE_EXHAUSTED"),
            RetryDecision::RetryAfter(Duration::from_secs(3))
        );
        assert_eq!(
            retry.decide(1, "429"),
            RetryDecision::GiveUp(GiveUpReason::NonRetryable)
        );
    }
}
