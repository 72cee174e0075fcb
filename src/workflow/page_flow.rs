//! 答题页处理流程 - 流程层
//!
//! 核心职责：定义"一页答卷"的完整处理流程
//!
//! 流程顺序：
//! 1. 构建本页提示词
//! 2. 题目图片 + 本页答题图片 → 模型
//! 3. 分类模型返回 → 各题结果 / 无作答 / 错误
//!
//! 是否用占位条目兜底由编排层根据 [`PageError::is_recoverable`] 决定。

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::PromptRevision;
use crate::error::{AppError, LlmError};
use crate::models::{AnnotationInstruction, Analysis, Difficulty, PageResult};
use crate::services::llm_service::ChatModel;
use crate::services::prompt_builder::build_page_prompt;
use crate::services::response_parser::{
    classify_reply, parse_page_results, ModelReply, UnparseableReply,
};
use crate::utils::logging::truncate_text;
use crate::workflow::page_ctx::PageCtx;

/// 单页处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// 模型返回 0，本页无作答
    NoAnswer,
    /// 成功解析（results 可能为空：所有条目都被跳过）
    Graded {
        results: Vec<PageResult>,
        modifications: Vec<AnnotationInstruction>,
    },
}

/// 单页处理错误
#[derive(Debug, Error)]
pub enum PageError {
    /// 模型调用本身失败，整次评分中止
    #[error("第 {page_number} 页模型请求失败: {error:#}")]
    Request {
        page_number: usize,
        error: anyhow::Error,
    },

    /// 模型有响应但内容为空（通常是被安全策略拦截）
    #[error("第 {page_number} 页模型返回内容为空")]
    EmptyReply { page_number: usize },

    #[error("第 {page_number} 页返回的 JSON 无法解析: {detail}")]
    MalformedJson { page_number: usize, detail: String },

    #[error("第 {page_number} 页返回缺少 page_results")]
    MissingPageResults { page_number: usize },

    #[error("第 {page_number} 页处理出错: {detail}")]
    Unexpected { page_number: usize, detail: String },
}

impl PageError {
    /// 可用占位条目兜底的错误
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, PageError::Request { .. })
    }

    /// 占位条目的分析内容，不可恢复的错误返回 None
    pub fn placeholder_analysis(&self) -> Option<Analysis> {
        let message = match self {
            PageError::Request { .. } => return None,
            PageError::EmptyReply { page_number } => format!(
                "An unexpected error occurred on Answer Sheet Page {}: the model returned an empty response",
                page_number
            ),
            PageError::MalformedJson { page_number, .. } => format!(
                "Failed to decode JSON for Answer Sheet Page {}. Raw response needs investigation.",
                page_number
            ),
            PageError::MissingPageResults { page_number } => format!(
                "The response for Answer Sheet Page {} did not contain 'page_results'. Invalid format.",
                page_number
            ),
            PageError::Unexpected {
                page_number,
                detail,
            } => format!(
                "An unexpected error occurred on Answer Sheet Page {}: {}",
                page_number, detail
            ),
        };
        Some(Analysis::placeholder(message))
    }
}

/// 答题页处理流程
///
/// - 不持有图片，只接收已编码的 data URL
/// - 不累计分数，只返回本页结果
pub struct PageFlow<'a, M: ChatModel + ?Sized> {
    model: &'a M,
    revision: PromptRevision,
}

impl<'a, M: ChatModel + ?Sized> PageFlow<'a, M> {
    pub fn new(model: &'a M, revision: PromptRevision) -> Self {
        Self { model, revision }
    }

    /// 处理一页
    ///
    /// `images` 为题目图片在前、本页答题图片在后的 data URL 列表
    pub async fn run(
        &self,
        ctx: &PageCtx,
        rubric: &str,
        difficulty: Difficulty,
        images: &[String],
    ) -> Result<PageOutcome, PageError> {
        let prompt = build_page_prompt(self.revision, ctx.page_number, rubric, difficulty);

        info!("{} 📤 发送给模型 ({})...", ctx, self.model.model_name());
        let raw = self
            .model
            .send_to_llm(&prompt, None, Some(images))
            .await
            .map_err(|error| {
                let empty = matches!(
                    error.downcast_ref::<AppError>(),
                    Some(AppError::Llm(LlmError::EmptyContent { .. }))
                );
                if empty {
                    PageError::EmptyReply {
                        page_number: ctx.page_number,
                    }
                } else {
                    PageError::Request {
                        page_number: ctx.page_number,
                        error,
                    }
                }
            })?;

        debug!("{} 模型原始返回: {}", ctx, truncate_text(&raw, 300));

        match classify_reply(&raw) {
            ModelReply::NoAnswer => {
                info!("{} 本页无作答", ctx);
                Ok(PageOutcome::NoAnswer)
            }
            ModelReply::Structured(reply) => {
                let modifications = if self.revision.wants_annotations() {
                    reply.image_modifications
                } else {
                    Vec::new()
                };

                let Some(entries) = reply.page_results else {
                    return Err(PageError::MissingPageResults {
                        page_number: ctx.page_number,
                    });
                };

                let results = parse_page_results(&entries, &modifications);
                if results.len() < entries.len() {
                    warn!(
                        "{} ⚠️ {} 条题目结果被跳过",
                        ctx,
                        entries.len() - results.len()
                    );
                }

                Ok(PageOutcome::Graded {
                    results,
                    modifications,
                })
            }
            ModelReply::Unparseable(UnparseableReply::MalformedJson { error }) => {
                Err(PageError::MalformedJson {
                    page_number: ctx.page_number,
                    detail: error,
                })
            }
            ModelReply::Unparseable(UnparseableReply::NotAnObject { found }) => {
                Err(PageError::Unexpected {
                    page_number: ctx.page_number,
                    detail: format!("response is a JSON {}, not an object", found),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// 固定返回同一内容的模型，None 表示调用失败
    struct FixedModel(Option<&'static str>);

    /// 响应内容为空的模型
    struct EmptyModel;

    #[async_trait]
    impl ChatModel for EmptyModel {
        fn model_name(&self) -> &str {
            "empty"
        }

        async fn send_to_llm(
            &self,
            _user_message: &str,
            _system_message: Option<&str>,
            _imgs: Option<&[String]>,
        ) -> anyhow::Result<String> {
            Err(AppError::Llm(LlmError::EmptyContent {
                model: "empty".to_string(),
            })
            .into())
        }
    }

    #[async_trait]
    impl ChatModel for FixedModel {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn send_to_llm(
            &self,
            _user_message: &str,
            _system_message: Option<&str>,
            _imgs: Option<&[String]>,
        ) -> anyhow::Result<String> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("connection reset"))
        }
    }

    async fn run_with(reply: Option<&'static str>, revision: PromptRevision) -> Result<PageOutcome, PageError> {
        let model = FixedModel(reply);
        PageFlow::new(&model, revision)
            .run(&PageCtx::new(1, 3), "rubric", Difficulty::default(), &[])
            .await
    }

    #[tokio::test]
    async fn test_graded_page_with_annotations() {
        let outcome = run_with(
            Some(
                r#"```json
                {"page_results": [{"question_number": 2, "score": 6, "analysis": "ok"}],
                 "image_modifications": [{"shape": "circle", "coordinates": [0.5, 0.5, 0.1], "question_number": 2}]}
                ```"#,
            ),
            PromptRevision::Annotated,
        )
        .await
        .unwrap();

        let PageOutcome::Graded { results, modifications } = outcome else {
            panic!("expected graded page");
        };
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 6);
        assert_eq!(results[0].annotations.len(), 1);
        assert_eq!(modifications.len(), 1);
    }

    #[tokio::test]
    async fn test_score_points_revision_ignores_modifications() {
        let outcome = run_with(
            Some(r#"{"page_results": [{"score": 4, "analysis": {"score_point_1": "ok"}}], "image_modifications": [{"shape": "line", "coordinates": [0, 0, 1, 1]}]}"#),
            PromptRevision::ScorePoints,
        )
        .await
        .unwrap();

        let PageOutcome::Graded { modifications, .. } = outcome else {
            panic!("expected graded page");
        };
        assert!(modifications.is_empty());
    }

    #[tokio::test]
    async fn test_no_answer() {
        let outcome = run_with(Some("0"), PromptRevision::Annotated).await.unwrap();
        assert_eq!(outcome, PageOutcome::NoAnswer);
    }

    #[tokio::test]
    async fn test_recoverable_errors_carry_placeholder_messages() {
        let err = run_with(Some(r#"{"page_results": [{"score": 7"#), PromptRevision::Annotated)
            .await
            .unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(
            err.placeholder_analysis(),
            Some(Analysis::placeholder(
                "Failed to decode JSON for Answer Sheet Page 2. Raw response needs investigation."
            ))
        );

        let err = run_with(Some(r#"{"image_modifications": []}"#), PromptRevision::Annotated)
            .await
            .unwrap_err();
        assert!(matches!(err, PageError::MissingPageResults { page_number: 2 }));
        assert_eq!(
            err.placeholder_analysis(),
            Some(Analysis::placeholder(
                "The response for Answer Sheet Page 2 did not contain 'page_results'. Invalid format."
            ))
        );

        let err = run_with(Some("[1, 2, 3]"), PromptRevision::Annotated)
            .await
            .unwrap_err();
        let Some(Analysis::Error { error }) = err.placeholder_analysis() else {
            panic!("expected placeholder");
        };
        assert!(error.starts_with("An unexpected error occurred on Answer Sheet Page 2:"));
    }

    #[tokio::test]
    async fn test_request_failure_is_fatal() {
        let err = run_with(None, PromptRevision::Annotated).await.unwrap_err();
        assert!(!err.is_recoverable());
        assert!(err.placeholder_analysis().is_none());
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_empty_reply_is_recoverable() {
        let err = PageFlow::new(&EmptyModel, PromptRevision::Annotated)
            .run(&PageCtx::new(0, 1), "rubric", Difficulty::default(), &[])
            .await
            .unwrap_err();

        assert!(matches!(err, PageError::EmptyReply { page_number: 1 }));
        assert!(err.is_recoverable());
        let Some(Analysis::Error { error }) = err.placeholder_analysis() else {
            panic!("expected placeholder");
        };
        assert!(error.starts_with("An unexpected error occurred on Answer Sheet Page 1:"));
    }
}
