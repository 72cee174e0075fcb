//! 评分报告写入服务 - 业务能力层
//!
//! 只负责"把评分结果落盘"能力，不关心评分流程

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

use crate::models::GradingResult;

/// 报告写入服务
///
/// 职责：
/// - 把单份作业的评分结果写成 `<作业名>_result.json`
/// - 在运行日志末尾追加一行摘要
pub struct ReportWriter {
    report_folder: PathBuf,
    log_file_path: PathBuf,
}

impl ReportWriter {
    pub fn new(report_folder: impl Into<PathBuf>, log_file_path: impl Into<PathBuf>) -> Self {
        Self {
            report_folder: report_folder.into(),
            log_file_path: log_file_path.into(),
        }
    }

    /// 写入 JSON 报告，返回报告路径
    pub fn write_report(&self, job_stem: &str, result: &GradingResult) -> Result<PathBuf> {
        fs::create_dir_all(&self.report_folder)
            .with_context(|| format!("无法创建报告目录: {}", self.report_folder.display()))?;

        let report_path = self.report_folder.join(format!("{}_result.json", job_stem));
        let json = serde_json::to_string_pretty(result)?;
        fs::write(&report_path, json)
            .with_context(|| format!("写入报告失败: {}", report_path.display()))?;

        debug!("评分报告已写入: {}", report_path.display());
        Ok(report_path)
    }

    /// 追加摘要行
    ///
    /// 格式: `[时间] 作业名 | 总分 | 页数 | 占位页数`
    pub fn append_summary(&self, job_name: &str, result: &GradingResult) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file_path)
            .with_context(|| format!("无法打开日志文件: {}", self.log_file_path.display()))?;

        let line = format!(
            "[{}] {} | 总分: {} | 页数: {} | 题目数: {} | 占位页: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            job_name,
            result.final_score,
            result.page_statuses.len(),
            result.question_count(),
            result.placeholder_count()
        );

        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// 记录失败的作业
    pub fn append_failure(&self, job_name: &str, reason: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file_path)?;

        let line = format!(
            "[{}] {} | 失败: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            job_name,
            reason
        );

        file.write_all(line.as_bytes())?;
        Ok(())
    }
}
