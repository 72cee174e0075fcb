//! 批量作业处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量作业的加载、评分和落盘。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：初始化运行日志、创建评分器、渲染器和报告写入器
//! 2. **批量加载**：扫描作业目录下所有 TOML 文件（`Vec<GradingJob>`）
//! 3. **逐份评分**：按顺序委托 `GradingOrchestrator`，单份失败不影响后续作业
//! 4. **标注输出**：把每页标注画到答题图片副本上
//! 5. **全局统计**：汇总所有作业的处理结果

use anyhow::Result;
use std::path::Path;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::{load_all_grading_jobs, GradingJob, GradingResult};
use crate::orchestrator::grading_orchestrator::GradingOrchestrator;
use crate::services::{AnnotationRenderer, ReportWriter};
use crate::utils::logging::{
    init_log_file, log_job_start, log_startup, print_final_stats, truncate_text,
};

/// 应用主结构
pub struct App {
    config: Config,
    orchestrator: GradingOrchestrator,
    renderer: AnnotationRenderer,
    report_writer: ReportWriter,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file)?;

        log_startup(
            &config.llm_model_name,
            &config.prompt_revision.to_string(),
            &config.job_folder,
        );

        let renderer = AnnotationRenderer::new(&config);
        let report_writer = ReportWriter::new(&config.report_folder, &config.output_log_file);
        let orchestrator = GradingOrchestrator::new(config.clone());

        Ok(Self {
            config,
            orchestrator,
            renderer,
            report_writer,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        info!("\n📁 正在扫描待评分的作业...");
        let jobs = load_all_grading_jobs(&self.config.job_folder).await?;

        if jobs.is_empty() {
            warn!("⚠️ 没有找到待评分的TOML文件，程序结束");
            return Ok(());
        }

        info!("✓ 找到 {} 份待评分的作业", jobs.len());

        let stats = self.process_all_jobs(&jobs).await;

        print_final_stats(
            stats.success,
            stats.failed,
            stats.total,
            stats.placeholder_pages,
            &self.config.output_log_file,
        );

        Ok(())
    }

    /// 逐份处理
    async fn process_all_jobs(&self, jobs: &[GradingJob]) -> ProcessingStats {
        let mut stats = ProcessingStats {
            total: jobs.len(),
            ..Default::default()
        };

        for (idx, job) in jobs.iter().enumerate() {
            let job_index = idx + 1;
            log_job_start(job_index, jobs.len(), &job.name, job.answer_images.len());

            match self.process_job(job, job_index).await {
                Ok(result) => {
                    stats.success += 1;
                    stats.placeholder_pages += result.placeholder_count();
                }
                Err(e) => {
                    error!("[作业 {}] ❌ 评分失败: {:#}", job_index, e);
                    stats.failed += 1;
                    if let Err(log_err) = self
                        .report_writer
                        .append_failure(&job.name, &format!("{:#}", e))
                    {
                        warn!("[作业 {}] 写入运行日志失败: {}", job_index, log_err);
                    }
                }
            }
        }

        stats
    }

    /// 处理单份作业：评分 → 标注 → 报告
    async fn process_job(&self, job: &GradingJob, job_index: usize) -> Result<GradingResult> {
        let request = job.to_request();

        let result = self
            .orchestrator
            .grade(&request, job.model_name.as_deref())
            .await?;

        info!(
            "[作业 {}] ✓ 评分完成: 总分 {} ({} 道题)",
            job_index,
            result.final_score,
            result.question_count()
        );
        if self.config.verbose_logging {
            info!(
                "[作业 {}] 总评: {}",
                job_index,
                truncate_text(&result.feedback, 200)
            );
        }

        if self.config.render_annotations && self.config.prompt_revision.wants_annotations() {
            let summary = self.renderer.render_pages(
                &request.answer_images,
                &result.image_modifications,
                Path::new(&self.config.corrected_images_folder),
            );
            info!(
                "[作业 {}] 🖍 标注图片: 输出 {} 张, 失败 {} 张, 跳过 {} 张",
                job_index,
                summary.rendered.len(),
                summary.failed,
                summary.skipped
            );
        }

        let report_path = self.report_writer.write_report(&job.file_stem(), &result)?;
        info!("[作业 {}] 📄 报告已保存: {}", job_index, report_path.display());

        self.report_writer.append_summary(&job.name, &result)?;

        Ok(result)
    }
}

/// 处理统计
#[derive(Debug, Default)]
struct ProcessingStats {
    success: usize,
    failed: usize,
    total: usize,
    placeholder_pages: usize,
}
