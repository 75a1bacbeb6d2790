//! 调用限流 - 业务能力层
//!
//! 两种机制叠加：
//! - 滚动窗口：任意 `window` 时长内最多 `quota` 次调用
//! - 固定间隔：相邻两个帖子之间至少间隔 `min_delay`
//!
//! 限流器由批处理器独占持有，生命周期为一次运行。

use crate::config::Config;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// 滚动窗口限流器
#[derive(Debug)]
pub struct RateLimiter {
    quota: usize,
    window: Duration,
    buffer: Duration,
    min_delay: Duration,
    /// 窗口内的调用时间戳，按时间升序，长度不超过 `quota`
    calls: VecDeque<Instant>,
}

impl RateLimiter {
    /// 按配置创建限流器
    pub fn new(config: &Config) -> Self {
        Self::with_limits(config.quota, config.window, config.rate_limit_buffer)
            .with_min_delay(config.min_delay)
    }

    /// 指定窗口配额创建限流器（无固定间隔）
    pub fn with_limits(quota: usize, window: Duration, buffer: Duration) -> Self {
        Self {
            quota: quota.max(1),
            window,
            buffer,
            min_delay: Duration::ZERO,
            calls: VecDeque::with_capacity(quota.max(1)),
        }
    }

    /// 设置帖子之间的固定间隔
    pub fn with_min_delay(mut self, min_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self
    }

    /// 等待直到可以安全发起下一次调用，并记录这次调用
    ///
    /// 一旦进入等待总会等满，没有取消机制。
    pub async fn gate(&mut self) {
        loop {
            let now = Instant::now();
            match self.wait_needed(now) {
                Some(wait) => {
                    info!(
                        "⏳ 限流: 最近 {:?} 内已有 {} 次调用，等待 {:.1} 秒...",
                        self.window,
                        self.calls.len(),
                        wait.as_secs_f64()
                    );
                    sleep(wait).await;
                }
                None => {
                    self.calls.push_back(now);
                    debug!("记录调用，窗口内共 {} 次", self.calls.len());
                    return;
                }
            }
        }
    }

    /// 两个帖子之间的固定间隔
    pub async fn pause_between_items(&self) {
        if !self.min_delay.is_zero() {
            debug!("等待 {:.1} 秒后处理下一个帖子", self.min_delay.as_secs_f64());
            sleep(self.min_delay).await;
        }
    }

    /// 计算在 `now` 发起调用前需要等待的时长，`None` 表示可以立即调用
    pub fn wait_needed(&mut self, now: Instant) -> Option<Duration> {
        self.prune(now);

        if self.calls.len() < self.quota {
            return None;
        }

        let oldest = *self.calls.front()?;
        let ready_at = oldest + self.window;
        Some(ready_at.saturating_duration_since(now) + self.buffer)
    }

    /// 当前窗口内的调用次数
    pub fn recent_calls(&self) -> usize {
        self.calls.len()
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.calls.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);
    const BUFFER: Duration = Duration::from_secs(1);

    #[tokio::test(start_paused = true)]
    async fn test_calls_under_quota_do_not_wait() {
        let mut limiter = RateLimiter::with_limits(3, WINDOW, BUFFER);
        let start = Instant::now();

        for _ in 0..3 {
            limiter.gate().await;
        }

        assert_eq!(Instant::now(), start);
        assert_eq!(limiter.recent_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_window_waits_for_oldest_plus_buffer() {
        let mut limiter = RateLimiter::with_limits(3, WINDOW, BUFFER);
        let start = Instant::now();

        limiter.gate().await;
        tokio::time::advance(Duration::from_secs(10)).await;
        limiter.gate().await;
        limiter.gate().await;

        limiter.gate().await;

        // 最早一次在 t=0，需等到 t=60 再加 1 秒缓冲
        let waited = Instant::now() - start;
        assert!(waited >= Duration::from_secs(61) && waited < Duration::from_secs(62));
        assert_eq!(limiter.recent_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_window_ever_exceeds_quota() {
        let quota = 4;
        let mut limiter = RateLimiter::with_limits(quota, WINDOW, BUFFER);
        let mut stamps = Vec::new();

        for i in 0..25u64 {
            limiter.gate().await;
            stamps.push(Instant::now());
            // 不规则的调用节奏
            tokio::time::advance(Duration::from_secs(i % 5)).await;
        }

        for (i, &t) in stamps.iter().enumerate() {
            let in_window = stamps[i..].iter().filter(|&&s| s - t < WINDOW).count();
            assert!(in_window <= quota, "窗口从第 {} 次调用开始包含 {} 次调用", i, in_window);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_calls_are_pruned() {
        let mut limiter = RateLimiter::with_limits(2, WINDOW, BUFFER);
        limiter.gate().await;
        limiter.gate().await;

        tokio::time::advance(WINDOW).await;

        assert_eq!(limiter.wait_needed(Instant::now()), None);
        assert_eq!(limiter.recent_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_between_items_sleeps_min_delay() {
        let limiter =
            RateLimiter::with_limits(10, WINDOW, BUFFER).with_min_delay(Duration::from_secs(7));
        let start = Instant::now();

        limiter.pause_between_items().await;

        let waited = Instant::now() - start;
        assert!(waited >= Duration::from_secs(7) && waited < Duration::from_secs(8));
    }
}
