use crate::error::{AppError, FileError};
use crate::models::job::GradingJob;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载评分任务
///
/// 任务中的相对图片路径按 TOML 文件所在目录解析。
pub async fn load_grading_job(toml_file_path: &Path) -> Result<GradingJob> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    let mut job: GradingJob = toml::from_str(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))?;

    let base = toml_file_path.parent().unwrap_or_else(|| Path::new("."));
    job.problem_images = job
        .problem_images
        .into_iter()
        .map(|img| img.resolved_against(base))
        .collect();
    job.answer_images = job
        .answer_images
        .into_iter()
        .map(|img| img.resolved_against(base))
        .collect();

    job.file_path = Some(toml_file_path.to_path_buf());

    Ok(job)
}

/// 加载文件夹中所有 TOML 评分任务（按文件名排序）
///
/// 单个文件解析失败只记录警告，不影响其他任务。
pub async fn load_all_grading_jobs(folder_path: &str) -> Result<Vec<GradingJob>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        return Err(AppError::File(FileError::DirectoryNotFound {
            path: folder_path.to_string(),
        })
        .into());
    }

    let mut toml_files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(path);
        }
    }
    toml_files.sort();

    let mut jobs = Vec::new();
    for path in toml_files {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_grading_job(&path).await {
            Ok(job) => {
                tracing::info!(
                    "成功加载作业 {}: {} 张题目图片, {} 页答题",
                    job.name,
                    job.problem_images.len(),
                    job.answer_images.len()
                );
                jobs.push(job);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {:#}", path.display(), e);
            }
        }
    }

    Ok(jobs)
}
