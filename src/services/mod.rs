pub mod annotation_renderer;
pub mod llm_service;
pub mod prompt_builder;
pub mod report_writer;
pub mod response_parser;

pub use annotation_renderer::{AnnotationRenderer, RenderSummary};
pub use llm_service::{ChatModel, LlmService};
pub use report_writer::ReportWriter;
pub use response_parser::{classify_reply, ModelReply, StructuredReply, UnparseableReply};
