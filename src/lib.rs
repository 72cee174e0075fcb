//! # Homework Grader
//!
//! 使用多模态大模型为手写作业逐页评分，并把批改标注画回答题图片
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 只暴露能力
//! - `ImageLoader` - 把图片引用（文件路径或内存字节）解析为已解码图片
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `LlmService` - 多模态模型调用能力（`ChatModel` trait）
//! - `prompt_builder` - 单页评分提示词与总评提示词
//! - `response_parser` - 模型返回分类（无作答 / 结构化 / 无法解析）
//! - `AnnotationRenderer` - 在图片副本上绘制标注
//! - `ReportWriter` - 写评分报告与运行日志
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一页答卷"的完整处理流程
//! - `PageCtx` - 上下文封装（页码 + 总页数）
//! - `PageFlow` - 流程编排（提示词 → 模型 → 分类）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/grading_orchestrator` - 单份作业评分：逐页、兜底、汇总、总评
//! - `orchestrator/batch_processor` - 批量作业处理：评分、标注、报告、统计

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, PromptRevision};
pub use error::{AppError, AppResult};
pub use infrastructure::ImageLoader;
pub use models::{AnnotationInstruction, GradingJob, GradingRequest, GradingResult, ImageRef};
pub use orchestrator::{App, GradingOrchestrator};
pub use services::{AnnotationRenderer, ChatModel, LlmService};
pub use workflow::{PageCtx, PageError, PageFlow, PageOutcome};
