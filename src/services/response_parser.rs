//! 模型回复解析 - 业务能力层
//!
//! 把模型的原始回复规整为 [`AnalysisResult`]。这是一个全函数：
//! 回复不是 JSON 对象时降级为"未指定"结果，而不是返回错误。
//! 任何 JSON 对象都按原样采用，不校验字段类型。

use crate::models::AnalysisResult;
use serde_json::Value;
use tracing::{debug, warn};

/// 回复解析的结果来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// 模型按要求返回了结构化数据
    Structured,
    /// 回复无法解析，已降级
    Degraded,
}

/// 解析模型回复
pub fn parse(raw: &str) -> AnalysisResult {
    parse_with_outcome(raw).0
}

/// 解析模型回复，同时返回结果来源
pub fn parse_with_outcome(raw: &str) -> (AnalysisResult, ParseOutcome) {
    let text = strip_code_fence(raw);

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => {
            debug!("模型回复解析成功");
            (AnalysisResult::from_object(object), ParseOutcome::Structured)
        }
        Ok(_) => {
            warn!("模型回复不是 JSON 对象，使用降级结果");
            (AnalysisResult::unstructured(text), ParseOutcome::Degraded)
        }
        Err(e) => {
            warn!("模型回复不是合法的 JSON，使用降级结果: {}", e);
            (AnalysisResult::unstructured(text), ParseOutcome::Degraded)
        }
    }
}

/// 去掉包裹回复的 ```json / ``` 代码块标记
pub fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();

    let inner = if let Some(rest) = text.strip_prefix("```json") {
        rest
    } else if let Some(rest) = text.strip_prefix("```") {
        rest
    } else {
        return text;
    };

    inner.strip_suffix("```").unwrap_or(inner).trim()
}
