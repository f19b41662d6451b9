//! Mock LLM 客户端（无 API Key 时使用，便于离线跑通聊天循环）
//!
//! 回显最后一条 User 消息；模型名固定为 "mock"。

use async_trait::async_trait;

use crate::llm::{Completion, LlmClient, LlmError};
use crate::memory::{Message, Role};

pub const MOCK_MODEL: &str = "mock";

/// Mock 客户端：回显用户最后一条消息
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<Completion, LlmError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        Ok(Completion::new(format!("Echo from Mock: {last_user}"), MOCK_MODEL))
    }

    fn name(&self) -> &str {
        MOCK_MODEL
    }
}
