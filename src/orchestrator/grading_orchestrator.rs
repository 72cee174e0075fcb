//! 单次评分编排器 - 编排层
//!
//! ## 职责
//!
//! 对一份作业（题目图片 + 若干答题页 + 评分标准 + 难度）完成评分：
//!
//! 1. **加载图片**：任意一张加载失败，整次评分失败
//! 2. **逐页评分**：每页一次模型调用，委托 `PageFlow`
//! 3. **占位兜底**：返回无法使用时记一条 0 分占位条目，继续下一页
//! 4. **汇总**：总分为全部分数之和
//! 5. **总评**：最后一次模型调用生成总体反馈
//!
//! 分数、分析、标注三组数据都只在这里追加，保证下标对齐。

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::infrastructure::ImageLoader;
use crate::models::{Analysis, GradingRequest, GradingResult, PageResult, PageStatus};
use crate::services::llm_service::{ChatModel, LlmService};
use crate::services::prompt_builder::build_feedback_prompt;
use crate::workflow::{PageCtx, PageFlow, PageOutcome};

/// 评分编排器
pub struct GradingOrchestrator {
    config: Config,
    image_loader: ImageLoader,
}

impl GradingOrchestrator {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            image_loader: ImageLoader::new(),
        }
    }

    /// 使用配置中的模型（或 `model_name` 覆盖）评分
    ///
    /// 每次评分新建一个客户端，多份作业之间不共享连接状态。
    pub async fn grade(
        &self,
        request: &GradingRequest,
        model_name: Option<&str>,
    ) -> Result<GradingResult> {
        let model = match model_name {
            Some(name) => LlmService::with_model(&self.config, name),
            None => LlmService::new(&self.config),
        };
        self.grade_with_model(&model, request).await
    }

    /// 使用任意 [`ChatModel`] 评分
    pub async fn grade_with_model<M: ChatModel + ?Sized>(
        &self,
        model: &M,
        request: &GradingRequest,
    ) -> Result<GradingResult> {
        request.validate()?;

        let total_pages = request.answer_images.len();
        info!(
            "🔍 开始评分: {} 张题目图片, {} 页答卷, 难度 {}, 模型 {}",
            request.problem_images.len(),
            total_pages,
            request.difficulty,
            model.model_name()
        );

        // ========== 加载全部图片 ==========
        let problem_images = self
            .image_loader
            .load_all(&request.problem_images)
            .await
            .context("题目图片加载失败")?;
        let answer_images = self
            .image_loader
            .load_all(&request.answer_images)
            .await
            .context("答题图片加载失败")?;

        let problem_urls: Vec<String> = problem_images.iter().map(|img| img.to_data_url()).collect();

        // ========== 逐页评分 ==========
        let flow = PageFlow::new(model, self.config.prompt_revision);

        let mut scores = Vec::new();
        let mut analyses = Vec::new();
        let mut questions = Vec::new();
        let mut image_modifications = Vec::with_capacity(total_pages);
        let mut page_statuses = Vec::with_capacity(total_pages);

        for (page_index, answer) in answer_images.iter().enumerate() {
            let ctx = PageCtx::new(page_index, total_pages);

            let mut images = problem_urls.clone();
            images.push(answer.to_data_url());

            match flow
                .run(&ctx, &request.rubric, request.difficulty, &images)
                .await
            {
                Ok(PageOutcome::NoAnswer) => {
                    image_modifications.push(Vec::new());
                    page_statuses.push(PageStatus::NoAnswer);
                }
                Ok(PageOutcome::Graded {
                    results,
                    modifications,
                }) => {
                    info!(
                        "{} ✓ 解析到 {} 道题, {} 条标注",
                        ctx,
                        results.len(),
                        modifications.len()
                    );
                    page_statuses.push(PageStatus::Graded {
                        questions: results.len(),
                    });
                    for result in results {
                        scores.push(result.score);
                        analyses.push(result.analysis.clone());
                        questions.push(result);
                    }
                    image_modifications.push(modifications);
                }
                Err(e) if e.is_recoverable() => {
                    warn!("{} ⚠️ {}，记为 0 分占位", ctx, e);
                    let placeholder = e
                        .placeholder_analysis()
                        .unwrap_or_else(|| Analysis::placeholder(e.to_string()));
                    scores.push(0);
                    analyses.push(placeholder.clone());
                    questions.push(PageResult {
                        question_number: None,
                        score: 0,
                        analysis: placeholder,
                        annotations: Vec::new(),
                    });
                    image_modifications.push(Vec::new());
                    page_statuses.push(PageStatus::Placeholder {
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    error!("{} ❌ {}", ctx, e);
                    return Err(e.into());
                }
            }
        }

        let final_score: i64 = scores.iter().sum();
        info!("📊 {} 道题, 总分 {}", scores.len(), final_score);

        // ========== 总评 ==========
        let feedback_prompt = build_feedback_prompt(final_score, &analyses, &request.rubric);
        let feedback = model
            .send_to_llm(&feedback_prompt, None, None)
            .await
            .context("总评生成失败")?;

        Ok(GradingResult {
            scores,
            analyses,
            questions,
            final_score,
            feedback,
            image_modifications,
            page_statuses,
        })
    }
}
