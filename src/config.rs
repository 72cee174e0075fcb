use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, AppResult, ConfigError};

/// 评分流水线的提示词版本
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PromptRevision {
    /// 按评分点拆解分析（analysis 为 评分点 -> 说明 的映射），不要求标注
    ScorePoints,
    /// 带难度系数的整体分析，并要求返回图片标注指令
    #[default]
    Annotated,
}

impl PromptRevision {
    /// 该版本是否要求模型返回 `image_modifications`
    pub fn wants_annotations(self) -> bool {
        matches!(self, PromptRevision::Annotated)
    }
}

impl FromStr for PromptRevision {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "score-points" | "score_points" | "scorepoints" => Ok(PromptRevision::ScorePoints),
            "annotated" => Ok(PromptRevision::Annotated),
            other => Err(AppError::Config(ConfigError::EnvVarParseFailed {
                var_name: "GRADING_REVISION".to_string(),
                value: other.to_string(),
                expected_type: "score-points | annotated".to_string(),
            })),
        }
    }
}

impl fmt::Display for PromptRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptRevision::ScorePoints => write!(f, "score-points"),
            PromptRevision::Annotated => write!(f, "annotated"),
        }
    }
}

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 评分任务 TOML 文件存放目录
    pub job_folder: String,
    /// 标注后图片输出目录
    pub corrected_images_folder: String,
    /// 评分报告输出目录
    pub report_folder: String,
    /// 标注文字使用的字体文件
    pub font_path: String,
    /// 是否强制所有标注使用红色
    pub force_red_annotations: bool,
    /// 评分后是否绘制标注图片
    pub render_annotations: bool,
    /// 提示词版本
    pub prompt_revision: PromptRevision,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            job_folder: "grading_jobs".to_string(),
            corrected_images_folder: "corrected_images".to_string(),
            report_folder: "grading_reports".to_string(),
            font_path: "arial.ttf".to_string(),
            force_red_annotations: true,
            render_annotations: true,
            prompt_revision: PromptRevision::Annotated,
            verbose_logging: false,
            output_log_file: "grading_log.txt".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-1.5-flash".to_string(),
            llm_temperature: 0.3,
            llm_max_tokens: 4096,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            job_folder: std::env::var("GRADING_JOB_FOLDER").unwrap_or(default.job_folder),
            corrected_images_folder: std::env::var("CORRECTED_IMAGES_FOLDER").unwrap_or(default.corrected_images_folder),
            report_folder: std::env::var("REPORT_FOLDER").unwrap_or(default.report_folder),
            font_path: std::env::var("ANNOTATION_FONT_PATH").unwrap_or(default.font_path),
            force_red_annotations: std::env::var("FORCE_RED_ANNOTATIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.force_red_annotations),
            render_annotations: std::env::var("RENDER_ANNOTATIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.render_annotations),
            prompt_revision: std::env::var("GRADING_REVISION").ok().and_then(|v| v.parse().ok()).unwrap_or(default.prompt_revision),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            llm_api_key: std::env::var("LLM_API_KEY")
                .or_else(|_| std::env::var("GEMINI_API_KEY"))
                .unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            llm_temperature: std::env::var("LLM_TEMPERATURE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.llm_temperature),
            llm_max_tokens: std::env::var("LLM_MAX_TOKENS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.llm_max_tokens),
        }
    }

    /// 校验必须项：API 密钥必须显式提供
    pub fn validate(&self) -> AppResult<()> {
        if self.llm_api_key.trim().is_empty() {
            return Err(AppError::Config(ConfigError::EnvVarNotFound {
                var_name: "LLM_API_KEY / GEMINI_API_KEY".to_string(),
            }));
        }
        Ok(())
    }
}
