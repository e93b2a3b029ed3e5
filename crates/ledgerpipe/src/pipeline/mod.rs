pub mod context;
pub mod error;
pub mod result;
pub mod runner;

pub use context::{PipelineContext, RunOptions};
pub use error::{StepError, StepName};
pub use result::{PipelineResult, StepResult, StepResults};
pub use runner::ImportPipeline;
