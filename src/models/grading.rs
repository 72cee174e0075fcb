use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{AppError, AppResult, BusinessError};
use crate::models::annotation::AnnotationInstruction;
use crate::models::image_ref::ImageRef;

/// 评分难度（1-10，越高越严格）
///
/// 构造时截断到 [1, 10]。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct Difficulty(u8);

impl Difficulty {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(value: i64) -> Self {
        Self(value.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self(5)
    }
}

impl From<i64> for Difficulty {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<Difficulty> for u8 {
    fn from(d: Difficulty) -> Self {
        d.0
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 一次评分的输入
#[derive(Debug, Clone)]
pub struct GradingRequest {
    /// 题目图片（按顺序）
    pub problem_images: Vec<ImageRef>,
    /// 答题页图片，每页一张
    pub answer_images: Vec<ImageRef>,
    /// 评分标准原文
    pub rubric: String,
    pub difficulty: Difficulty,
}

impl GradingRequest {
    pub fn new(
        problem_images: Vec<ImageRef>,
        answer_images: Vec<ImageRef>,
        rubric: impl Into<String>,
        difficulty: impl Into<Difficulty>,
    ) -> Self {
        Self {
            problem_images,
            answer_images,
            rubric: rubric.into(),
            difficulty: difficulty.into(),
        }
    }

    /// 至少需要一张答题页
    pub fn validate(&self) -> AppResult<()> {
        if self.answer_images.is_empty() {
            return Err(AppError::Business(BusinessError::EmptyAnswerImages));
        }
        Ok(())
    }
}

/// 单题分析
///
/// 序列化后与模型返回保持同一形状：字符串、评分点映射，或 `{"error": ...}`。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Analysis {
    /// 占位条目的错误说明
    Error { error: String },
    /// 整体文字分析
    Text(String),
    /// 评分点 -> 说明
    ScorePoints(Map<String, Value>),
}

impl Analysis {
    /// 从模型返回的 `analysis` 字段构造，null 视为缺失
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(text) => Some(Analysis::Text(text)),
            Value::Object(map) => Some(Analysis::ScorePoints(map)),
            other => Some(Analysis::Text(other.to_string())),
        }
    }

    pub fn placeholder(message: impl Into<String>) -> Self {
        Analysis::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Analysis::Error { .. })
    }
}

/// 一道题的评分结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult {
    pub question_number: Option<u32>,
    /// 模型给出的分数，不做范围校验
    pub score: i64,
    pub analysis: Analysis,
    /// 同一页中题号与本题一致的标注
    pub annotations: Vec<AnnotationInstruction>,
}

/// 单页处理状态
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageStatus {
    Graded { questions: usize },
    NoAnswer,
    Placeholder { reason: String },
}

/// 一次评分的输出
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradingResult {
    /// 跨页按出现顺序排列的分数
    pub scores: Vec<i64>,
    /// 与 scores 一一对应
    pub analyses: Vec<Analysis>,
    /// 与 scores 一一对应的完整题目结果（题号、标注）；占位条目没有题号
    pub questions: Vec<PageResult>,
    /// 所有分数之和
    pub final_score: i64,
    pub feedback: String,
    /// 每页一组标注，下标与答题页一致
    pub image_modifications: Vec<Vec<AnnotationInstruction>>,
    /// 每页的处理状态
    pub page_statuses: Vec<PageStatus>,
}

impl GradingResult {
    pub fn question_count(&self) -> usize {
        self.scores.len()
    }

    pub fn placeholder_count(&self) -> usize {
        self.page_statuses
            .iter()
            .filter(|s| matches!(s, PageStatus::Placeholder { .. }))
            .count()
    }
}
