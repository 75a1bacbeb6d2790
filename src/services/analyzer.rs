//! 外部分析服务接口

use crate::error::LlmError;
use async_trait::async_trait;

/// 外部 LLM 补全服务
///
/// 失败时错误文本需保留服务商的限流信号（429 / quota / rate limit，
/// 以及可能的建议等待时间），重试分类依赖这些文本。
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// 发送提示词，返回模型的原始回复
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

#[async_trait]
impl<T: Analyzer + ?Sized> Analyzer for std::sync::Arc<T> {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        (**self).complete(prompt).await
    }
}
