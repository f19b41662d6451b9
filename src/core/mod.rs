//! 核心层：错误分类、会话监管、管线组装与分发、结果渲染

pub mod builder;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod session_supervisor;

pub use builder::{create_llm_client, PipelineBuilder};
pub use error::PipelineError;
pub use pipeline::{CommandPipeline, PipelineParts, DEFAULT_GREETING, DEFAULT_SYSTEM_PROMPT};
pub use session_supervisor::SessionSupervisor;
