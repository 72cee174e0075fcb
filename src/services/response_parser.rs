//! 模型返回解析 - 业务能力层
//!
//! 单页返回只有三种形态：
//! - 裸 `0`：本页没有作答
//! - JSON 对象：`page_results`（以及可选的 `image_modifications`）
//! - 无法解析的内容
//!
//! 所有分支都集中在 [`classify_reply`]，调用方只对 [`ModelReply`] 做穷尽匹配。

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::models::{AnnotationInstruction, Analysis, PageResult};

/// 单页返回的分类结果
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// 模型返回 `0`，本页无作答
    NoAnswer,
    /// 合法 JSON 对象
    Structured(StructuredReply),
    /// 无法按约定格式解析
    Unparseable(UnparseableReply),
}

/// JSON 对象形态的返回
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredReply {
    /// `page_results` 数组；缺失、为 null 或不是数组时为 None
    pub page_results: Option<Vec<Value>>,
    /// 能解析的标注指令（无法解析的条目被丢弃）
    pub image_modifications: Vec<AnnotationInstruction>,
}

/// 无法解析的原因
#[derive(Debug, Clone, PartialEq)]
pub enum UnparseableReply {
    /// JSON 语法错误（含被截断的返回）
    MalformedJson { error: String },
    /// 合法 JSON 但不是对象
    NotAnObject { found: &'static str },
}

/// 去掉代码块包裹
///
/// 以 ``` 开头时剥掉首尾的围栏；否则若正文中夹着一个 ```json 代码块，取代码块内容。
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();

    if trimmed.starts_with("```") {
        let inner = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```JSON"))
            .or_else(|| trimmed.strip_prefix("```"))
            .unwrap_or(trimmed)
            .trim();
        return inner.strip_suffix("```").unwrap_or(inner).trim();
    }

    if let Ok(re) = Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```") {
        if let Some(block) = re.captures(trimmed).and_then(|c| c.get(1)) {
            debug!("从说明文字中提取到代码块");
            return block.as_str();
        }
    }

    trimmed
}

/// 对单页原始返回分类
pub fn classify_reply(raw: &str) -> ModelReply {
    let body = strip_code_fence(raw);

    if body == "0" {
        return ModelReply::NoAnswer;
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => ModelReply::Structured(StructuredReply::from_map(map)),
        Ok(other) => ModelReply::Unparseable(UnparseableReply::NotAnObject {
            found: json_type_name(&other),
        }),
        Err(e) => ModelReply::Unparseable(UnparseableReply::MalformedJson {
            error: e.to_string(),
        }),
    }
}

impl StructuredReply {
    fn from_map(mut map: Map<String, Value>) -> Self {
        let page_results = match map.remove("page_results") {
            Some(Value::Array(entries)) => Some(entries),
            Some(Value::Null) | None => None,
            Some(other) => {
                warn!("page_results 不是数组 (实际为 {})", json_type_name(&other));
                None
            }
        };

        let image_modifications = parse_instructions(map.remove("image_modifications"));

        Self {
            page_results,
            image_modifications,
        }
    }
}

/// 逐条解析标注指令，无法解析的条目跳过
pub fn parse_instructions(value: Option<Value>) -> Vec<AnnotationInstruction> {
    let entries = match value {
        Some(Value::Array(entries)) => entries,
        Some(Value::Null) | None => return Vec::new(),
        Some(other) => {
            warn!(
                "image_modifications 不是数组 (实际为 {})，忽略",
                json_type_name(&other)
            );
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<AnnotationInstruction>(entry) {
            Ok(instruction) => Some(instruction),
            Err(e) => {
                warn!("跳过无法解析的标注指令: {}", e);
                None
            }
        })
        .collect()
}

/// 解析 `page_results` 中的各题结果
///
/// 缺少 `score` 或 `analysis` 的条目单独跳过，不影响同页其他题目。
/// 每题附带同页中题号一致的标注。
pub fn parse_page_results(
    entries: &[Value],
    modifications: &[AnnotationInstruction],
) -> Vec<PageResult> {
    let mut results = Vec::with_capacity(entries.len());

    for entry in entries {
        let Some(obj) = entry.as_object() else {
            warn!(
                "题目结果应为对象，实际为 {}，跳过",
                json_type_name(entry)
            );
            continue;
        };

        let score = obj.get("score").and_then(parse_score);
        let analysis = obj.get("analysis").cloned().and_then(Analysis::from_value);

        let (Some(score), Some(analysis)) = (score, analysis) else {
            warn!("题目结果缺少 score 或 analysis，跳过");
            continue;
        };

        let question_number = obj.get("question_number").and_then(parse_question_number);
        let annotations = match question_number {
            Some(number) => modifications
                .iter()
                .filter(|m| m.question_number == Some(number))
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        results.push(PageResult {
            question_number,
            score,
            analysis,
            annotations,
        });
    }

    results
}

fn parse_score(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.round() as i64)
            })
        }
        _ => None,
    }
}

fn parse_question_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
