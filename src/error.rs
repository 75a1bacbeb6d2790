use thiserror::Error;

/// 应用程序错误类型
///
/// 只有 `Store` 和 `Config` 会中断整个批处理；`Llm` 错误在单个帖子内被吸收，
/// 以降级分析结果的形式写回帖子。
#[derive(Debug, Error)]
pub enum AppError {
    /// 工作集存储错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 工作集存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// JSON 解析失败
    #[error("JSON解析失败 ({path}): {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// 序列化失败
    #[error("序列化工作集失败: {0}")]
    SerializeFailed(#[source] serde_json::Error),
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 原子替换失败
    #[error("替换文件失败 ({from} -> {to}): {source}")]
    RenameFailed {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },
}

/// LLM 服务错误
///
/// `ApiCallFailed` 的 `message` 保留服务商原始错误文本，
/// 限流识别依赖其中的关键字（429 / quota / rate limit）。
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {message}")]
    ApiCallFailed { model: String, message: String },
    /// 构建请求失败
    #[error("构建LLM请求失败: {0}")]
    RequestBuildFailed(String),
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件读取或解析失败
    #[error("配置文件 {path} 无效: {message}")]
    FileInvalid { path: String, message: String },
    /// 配置值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    InvalidValue { field: String, reason: String },
}

// ========== 便捷构造函数 ==========

impl LlmError {
    /// 创建 API 调用失败错误
    pub fn api_call_failed(model: impl Into<String>, message: impl Into<String>) -> Self {
        LlmError::ApiCallFailed {
            model: model.into(),
            message: message.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_call_failed_keeps_provider_message() {
        let err = LlmError::api_call_failed("gemini-2.5-flash-lite", "429 Please retry in 3s");
        let text = err.to_string();
        assert!(text.contains("429 Please retry in 3s"));
        assert!(text.contains("gemini-2.5-flash-lite"));
    }

    #[test]
    fn test_store_error_converts_into_app_error() {
        let err: AppError = StoreError::SerializeFailed(
            serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
        )
        .into();
        assert!(matches!(err, AppError::Store(_)));
    }
}
