pub mod annotation;
pub mod grading;
pub mod image_ref;
pub mod job;
pub mod loaders;

pub use annotation::{AnnotationInstruction, Shape};
pub use grading::{Analysis, Difficulty, GradingRequest, GradingResult, PageResult, PageStatus};
pub use image_ref::ImageRef;
pub use job::GradingJob;
pub use loaders::{load_all_grading_jobs, load_grading_job};
