//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）以及主备回退网关

pub mod deepseek;
pub mod gateway;
pub mod mock;
pub mod openai;
pub mod traits;
pub mod usage;

pub use deepseek::{create_deepseek_client, DEEPSEEK_CHAT};
pub use gateway::ProviderGateway;
pub use mock::{MockLlmClient, MOCK_MODEL};
pub use openai::OpenAiClient;
pub use traits::{Completion, LlmClient, LlmError};
pub use usage::{ProviderUsageStats, UsageSnapshot};
