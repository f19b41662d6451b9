//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock / 主备回退网关）实现 LlmClient：
//! complete 返回文本以及本次调用实际使用的模型名（用于统计）。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::Message;

/// 完成调用的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Empty response from model {0}")]
    EmptyResponse(String),
}

/// 一次完成调用的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    /// 服务端回报的模型名（auto 模式下可能与请求的模型不同）
    pub model: String,
}

impl Completion {
    pub fn new(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
        }
    }
}

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成
    async fn complete(&self, messages: &[Message]) -> Result<Completion, LlmError>;

    /// 客户端名称（日志用）
    fn name(&self) -> &str {
        "llm"
    }
}
