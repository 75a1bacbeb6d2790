use anyhow::Result;
use forum_post_analyzer::utils::logging;
use forum_post_analyzer::{BatchProcessor, Config, LlmService};

#[tokio::main]
async fn main() -> Result<()> {
    // 读取 .env（不存在时忽略）
    dotenv::dotenv().ok();

    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(config.verbose_logging);
    logging::log_startup(&config);

    if config.llm_api_key.is_empty() {
        anyhow::bail!("未设置 LLM_API_KEY，请在环境变量或 .env 文件中配置");
    }

    let posts_file = config.posts_file.display().to_string();
    let analyzer = LlmService::new(&config);

    // 运行批处理
    let stats = BatchProcessor::new(config, analyzer).run().await?;

    logging::print_final_stats(&stats, &posts_file);

    Ok(())
}
