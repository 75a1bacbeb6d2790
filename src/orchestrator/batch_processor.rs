//! 批量帖子处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个批处理任务的入口，顺序处理工作集中所有待处理的帖子。
//!
//! ## 核心流程
//!
//! 1. **加载工作集**：整体读取帖子列表，`analysis` 为空的即为待处理
//! 2. **逐个处理**：按原始顺序交给 `PostFlow`（限流 → 调用 → 重试 → 解析）
//! 3. **立即提交**：每个帖子完成后整体回写工作集
//! 4. **固定间隔**：还有后续帖子时等待 `min_delay`
//! 5. **全局统计**：汇总本次运行的结果
//!
//! ## 设计特点
//!
//! - **严格串行**：服务商配额是全局约束，不做并发
//! - **可恢复**：中断后重新运行即可，已有 `analysis` 的帖子会被跳过
//! - **失败隔离**：单个帖子失败只写入降级结果；只有存储失败会终止任务

use crate::config::Config;
use crate::error::AppResult;
use crate::models::Post;
use crate::services::{Analyzer, PostStore, RateLimiter, RetryCoordinator};
use crate::utils::logging::{log_item_start, log_pending, truncate_text};
use crate::workflow::{ItemOutcome, ItemReport, PostCtx, PostFlow};
use tracing::{error, info};

/// 单次运行的统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchStats {
    /// 工作集中的帖子总数
    pub total: usize,
    /// 运行开始前已完成的帖子数
    pub already_done: usize,
    /// 本次处理的帖子数
    pub processed: usize,
    /// 得到结构化分析的帖子数
    pub succeeded: usize,
    /// 回复无法解析、已降级的帖子数
    pub degraded: usize,
    /// 调用失败的帖子数
    pub failed: usize,
    /// 外部调用总次数（含重试）
    pub calls: u32,
}

impl BatchStats {
    fn record(&mut self, report: &ItemReport) {
        self.processed += 1;
        self.calls += report.attempts;
        match report.outcome {
            ItemOutcome::Analyzed => self.succeeded += 1,
            ItemOutcome::Unstructured => self.degraded += 1,
            ItemOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// 批量帖子处理器
pub struct BatchProcessor<A: Analyzer> {
    config: Config,
    store: PostStore,
    analyzer: A,
}

impl<A: Analyzer> BatchProcessor<A> {
    /// 使用配置中的工作集文件创建处理器
    pub fn new(config: Config, analyzer: A) -> Self {
        let store = PostStore::new(config.posts_file.clone());
        Self::with_store(config, store, analyzer)
    }

    pub fn with_store(config: Config, store: PostStore, analyzer: A) -> Self {
        Self {
            config,
            store,
            analyzer,
        }
    }

    /// 运行批处理任务
    ///
    /// 只有工作集读写失败会返回错误。
    pub async fn run(&self) -> AppResult<BatchStats> {
        info!("\n📁 正在读取工作集: {}", self.store.path().display());
        let mut posts = self.store.load().await?;

        let pending: Vec<usize> = posts
            .iter()
            .enumerate()
            .filter(|(_, post)| post.is_pending())
            .map(|(index, _)| index)
            .collect();

        let mut stats = BatchStats {
            total: posts.len(),
            already_done: posts.len() - pending.len(),
            ..Default::default()
        };
        log_pending(stats.total, stats.already_done, pending.len());

        if pending.is_empty() {
            info!("✓ 所有帖子都已分析，程序结束");
            return Ok(stats);
        }

        let mut limiter = RateLimiter::new(&self.config);
        let flow = PostFlow::new(&self.analyzer, RetryCoordinator::new(&self.config));

        for (position, &index) in pending.iter().enumerate() {
            let ctx = PostCtx::new(posts[index].id_label(), position + 1, pending.len());
            log_item_start(&ctx, &posts[index]);

            let report = flow.run(&posts[index], &ctx, &mut limiter).await;
            stats.record(&report);
            log_item_done(&ctx, &report);

            posts[index].analysis = Some(report.analysis);
            self.commit(&posts).await?;

            if ctx.has_next() {
                limiter.pause_between_items().await;
            }
        }

        Ok(stats)
    }

    async fn commit(&self, posts: &[Post]) -> AppResult<()> {
        self.store.commit(posts).await.map_err(|e| {
            error!("❌ 无法保存进度，终止任务: {}", e);
            e.into()
        })
    }
}

fn log_item_done(ctx: &PostCtx, report: &ItemReport) {
    match report.outcome {
        ItemOutcome::Analyzed => info!(
            "{} ✓ 分析完成: {}",
            ctx,
            truncate_text(&report.analysis.summary(), 80)
        ),
        ItemOutcome::Unstructured => info!("{} ✓ 分析完成（非结构化回复）", ctx),
        ItemOutcome::Failed(reason) => info!("{} ✗ 已记录失败结果 ({:?})", ctx, reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::retry::GiveUpReason;

    fn report(outcome: ItemOutcome, attempts: u32) -> ItemReport {
        ItemReport {
            analysis: Default::default(),
            outcome,
            attempts,
        }
    }

    #[test]
    fn test_stats_record_each_outcome() {
        let mut stats = BatchStats::default();
        stats.record(&report(ItemOutcome::Analyzed, 1));
        stats.record(&report(ItemOutcome::Unstructured, 2));
        stats.record(&report(ItemOutcome::Failed(GiveUpReason::Exhausted), 3));

        assert_eq!(stats.processed, 3);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.degraded, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.calls, 6);
    }
}
