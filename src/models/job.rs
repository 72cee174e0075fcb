use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::grading::{Difficulty, GradingRequest};
use crate::models::image_ref::ImageRef;

/// 一份作业的评分任务（对应一个 TOML 文件）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingJob {
    pub name: String,
    pub rubric: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// 覆盖配置中的模型名称
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default)]
    pub problem_images: Vec<ImageRef>,
    pub answer_images: Vec<ImageRef>,
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<PathBuf>,
}

impl GradingJob {
    pub fn to_request(&self) -> GradingRequest {
        GradingRequest::new(
            self.problem_images.clone(),
            self.answer_images.clone(),
            self.rubric.clone(),
            self.difficulty,
        )
    }

    /// 用于文件名的作业名称（去掉路径分隔符等字符）
    pub fn file_stem(&self) -> String {
        let cleaned: String = self
            .name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        if cleaned.trim_matches('_').is_empty() {
            "grading_job".to_string()
        } else {
            cleaned
        }
    }
}
