//! 日志工具模块
//!
//! 提供日志初始化和运行过程输出的辅助函数

use crate::config::Config;
use crate::models::Post;
use crate::orchestrator::BatchStats;
use crate::workflow::PostCtx;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug / info 级别。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 帖子批量分析模式");
    info!("🤖 模型: {}", config.llm_model_name);
    info!(
        "📊 限流: 每 {} 秒最多 {} 次调用，帖子间隔 {} 秒",
        config.window.as_secs_f64(),
        config.quota,
        config.min_delay.as_secs_f64()
    );
    info!("↻ 最大尝试次数: {}", config.max_retries);
    info!("{}", "=".repeat(60));
}

/// 记录待处理帖子数量
pub fn log_pending(total: usize, already_done: usize, pending: usize) {
    info!("✓ 共找到 {} 个帖子", total);
    info!("📋 已分析: {}", already_done);
    info!("📝 待分析: {}\n", pending);
}

/// 记录单个帖子开始处理
pub fn log_item_start(ctx: &PostCtx, post: &Post) {
    info!(
        "\n{} 正在分析 (LLM: {}, HW: {}): {}",
        ctx,
        post.llm_label(),
        post.homework_label(),
        truncate_text(&post.title(), 60)
    );
}

/// 打印最终统计信息
pub fn print_final_stats(stats: &BatchStats, posts_file: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 结构化分析: {}/{}", stats.succeeded, stats.processed);
    info!("📄 非结构化回复: {}", stats.degraded);
    info!("❌ 失败: {}", stats.failed);
    info!("🔁 外部调用次数: {}", stats.calls);
    info!("⏭️ 运行前已完成: {}", stats.already_done);
    info!("{}", "=".repeat(60));
    info!("\n结果已保存至: {}", posts_file);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
