//! 帖子与分析结果数据模型
//!
//! 工作集文件是一个 JSON 数组，每个元素是一个 [`Post`]。
//! `analysis` 字段存在（且非空）即表示该帖子已处理，重新运行时会被跳过。
//!
//! 论坛导出的字段类型并不稳定（`title` 可能为 null，作业编号可能是字符串），
//! 因此帖子字段和分析结果都按原始 JSON 保存，只通过宽松的访问方法读取，
//! 回写时不改动任何已有内容。

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// 无法从模型回复中得到评分时使用的占位值
pub const NOT_SPECIFIED: &str = "Not specified";

/// 调用失败时评分字段使用的占位值
pub const ERROR_RATING: &str = "Error";

/// 降级摘要截取的最大字符数
const SUMMARY_PREVIEW_CHARS: usize = 200;

const UNKNOWN: &str = "Unknown";

/// 论坛帖子（一个工作单元）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// 分析结果，存在即表示已处理
    #[serde(
        default,
        alias = "gemini_analysis",
        deserialize_with = "deserialize_analysis",
        skip_serializing_if = "Option::is_none"
    )]
    pub analysis: Option<AnalysisResult>,

    /// 论坛导出的全部其他字段（id、title、document、llm、作业编号等），原样保留
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Post {
    /// 创建一个待处理的帖子
    pub fn new(id: impl Into<Value>, title: impl Into<String>, content: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("id".to_string(), id.into());
        fields.insert("title".to_string(), Value::String(title.into()));
        fields.insert("content".to_string(), Value::String(content.into()));
        Self {
            analysis: None,
            fields,
        }
    }

    pub fn with_llm(mut self, llm: impl Into<String>) -> Self {
        self.fields.insert("llm".to_string(), Value::String(llm.into()));
        self
    }

    pub fn with_homework_number(mut self, number: i64) -> Self {
        self.fields.insert("homeworkNumber".to_string(), number.into());
        self
    }

    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.fields
            .insert("document".to_string(), Value::String(document.into()));
        self
    }

    /// 是否待处理
    pub fn is_pending(&self) -> bool {
        self.analysis.is_none()
    }

    /// 标题，缺失或为 null 时为空串
    pub fn title(&self) -> String {
        self.text("title").unwrap_or_default()
    }

    /// 正文：非空的 `document` 优先，否则取 `content`
    pub fn body(&self) -> String {
        match self.text("document") {
            Some(doc) if !doc.is_empty() => doc,
            _ => self.text("content").unwrap_or_default(),
        }
    }

    /// LLM 名称，缺省为 "Unknown"
    pub fn llm_label(&self) -> String {
        self.text("llm")
            .filter(|llm| !llm.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    /// 作业编号
    ///
    /// 接受整数、整数值的浮点数以及数字字符串，其余情况视为未知。
    pub fn homework_number(&self) -> Option<i64> {
        let value = self
            .fields
            .get("homeworkNumber")
            .or_else(|| self.fields.get("homework_number"))?;

        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.fract() == 0.0)
                        .map(|f| f as i64)
                })
            }
            _ => None,
        }
    }

    /// 作业编号文本，缺省或 -1 时为 "Unknown"
    pub fn homework_label(&self) -> String {
        match self.homework_number() {
            Some(n) if n != -1 => n.to_string(),
            _ => UNKNOWN.to_string(),
        }
    }

    /// 用于日志显示的ID
    pub fn id_label(&self) -> String {
        match self.fields.get("id") {
            Some(Value::String(s)) => s.clone(),
            None | Some(Value::Null) => "unknown".to_string(),
            Some(other) => other.to_string(),
        }
    }

    fn text(&self, key: &str) -> Option<String> {
        self.fields.get(key).and_then(scalar_text)
    }
}

/// 三项定性评分，内容来自模型的自然语言输出，不做枚举约束
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Performance {
    pub accuracy: String,
    pub one_shot_capability: String,
    pub reasoning_quality: String,
}

impl Performance {
    fn read(value: Option<&Value>) -> Self {
        let field = |keys: &[&str]| {
            value
                .and_then(|v| keys.iter().find_map(|k| v.get(k)))
                .and_then(scalar_text)
                .unwrap_or_default()
        };
        Self {
            accuracy: field(&["accuracy"]),
            one_shot_capability: field(&["one_shot_capability", "oneShotCapability"]),
            reasoning_quality: field(&["reasoning_quality", "reasoningQuality"]),
        }
    }
}

/// 单个帖子的分析结果
///
/// 保存模型返回的 JSON 原文，不做结构校验；字段通过宽松的访问方法读取，
/// null 或类型不符时取默认值。总是整体写入帖子，不做字段级别的更新。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult(Value);

impl Default for AnalysisResult {
    fn default() -> Self {
        Self(Value::Object(Map::new()))
    }
}

impl AnalysisResult {
    /// 使用模型返回的 JSON 对象
    pub fn from_object(object: Map<String, Value>) -> Self {
        Self(Value::Object(object))
    }

    /// 由无法解析的模型回复构造降级结果
    pub fn unstructured(raw: &str) -> Self {
        let summary = if raw.chars().count() > SUMMARY_PREVIEW_CHARS {
            raw.chars().take(SUMMARY_PREVIEW_CHARS).collect::<String>() + "..."
        } else {
            raw.to_string()
        };
        Self::filled(summary, NOT_SPECIFIED, raw.to_string())
    }

    /// 由调用失败构造终态降级结果
    pub fn from_error(message: &str) -> Self {
        Self::filled(
            format!("Error during analysis: {}", message),
            ERROR_RATING,
            format!("Failed to analyze: {}", message),
        )
    }

    fn filled(summary: String, rating: &str, detailed_analysis: String) -> Self {
        Self(json!({
            "summary": summary,
            "performance": {
                "accuracy": rating,
                "one_shot_capability": rating,
                "reasoning_quality": rating,
            },
            "strengths": [],
            "weaknesses": [],
            "notable_behaviors": [],
            "detailed_analysis": detailed_analysis,
        }))
    }

    /// 原始 JSON
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn summary(&self) -> String {
        self.text(&["summary"])
    }

    pub fn performance(&self) -> Performance {
        Performance::read(self.0.get("performance"))
    }

    pub fn strengths(&self) -> Vec<String> {
        self.list(&["strengths"])
    }

    pub fn weaknesses(&self) -> Vec<String> {
        self.list(&["weaknesses"])
    }

    pub fn notable_behaviors(&self) -> Vec<String> {
        self.list(&["notable_behaviors", "notableBehaviors"])
    }

    pub fn detailed_analysis(&self) -> String {
        self.text(&["detailed_analysis", "detailedAnalysis"])
    }

    /// 是否为调用失败产生的结果
    pub fn is_error(&self) -> bool {
        self.performance().accuracy == ERROR_RATING
            && self.summary().starts_with("Error during analysis:")
    }

    fn field(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter().find_map(|k| self.0.get(k))
    }

    fn text(&self, keys: &[&str]) -> String {
        self.field(keys).and_then(scalar_text).unwrap_or_default()
    }

    /// 数组逐项取文本；单个字符串视为只有一项
    fn list(&self, keys: &[&str]) -> Vec<String> {
        match self.field(keys) {
            Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
            Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }
}

/// 标量转文本；null、数组和对象没有文本
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// 空值（null / false / 0 / "" / [] / {}）视为未分析
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// 已有的非空结果即视为完成，并原样保留
fn deserialize_analysis<'de, D>(deserializer: D) -> Result<Option<AnalysisResult>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if is_falsy(&value) {
        return Ok(None);
    }
    Ok(Some(AnalysisResult(value)))
}
