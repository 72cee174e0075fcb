//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量作业处理器
//! - 管理应用生命周期（初始化、运行）
//! - 批量加载作业（Vec<GradingJob>）
//! - 评分后渲染标注、写报告
//! - 输出全局统计信息
//!
//! ### `grading_orchestrator` - 单次评分编排器
//! - 加载题目与答题图片
//! - 遍历答题页，委托 PageFlow
//! - 占位兜底、汇总总分、生成总评
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<GradingJob>)
//!     ↓
//! grading_orchestrator (处理一份作业的全部答题页)
//!     ↓
//! workflow::PageFlow (处理单页)
//!     ↓
//! services (能力层：llm / prompt / parser / renderer / report)
//!     ↓
//! infrastructure (基础设施：ImageLoader)
//! ```

pub mod batch_processor;
pub mod grading_orchestrator;

// 重新导出主要类型
pub use batch_processor::App;
pub use grading_orchestrator::GradingOrchestrator;
