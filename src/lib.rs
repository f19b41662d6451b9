//! agent-relay - 自然语言指令解释与远程 Agent 执行管线
//!
//! 模块划分：
//! - **agents**: 远程 Agent API（列表 / 详情 / 执行 / 状态）、目录解析、请求体构建、执行编排
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类、会话监管、管线组装与分发、结果渲染
//! - **intent**: 规则表 + LLM 兜底的意图解析
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）以及主备回退网关
//! - **memory**: 普通聊天的对话历史
//! - **observability**: tracing 初始化

pub mod agents;
pub mod config;
pub mod core;
pub mod intent;
pub mod llm;
pub mod memory;
pub mod observability;

pub use crate::core::{CommandPipeline, PipelineBuilder, PipelineError};
