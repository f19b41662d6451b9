//! 远程 Agent API 协作方抽象
//!
//! 列表 / 详情 / 执行 / 执行状态四个端点；HTTP 实现见 http.rs，测试中用桩实现替换。

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::error::PipelineError;

/// Agent HTTP 协作方的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Request timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Agent API not configured: {0}")]
    NotConfigured(String),
}

impl ApiError {
    /// 只有超时允许以更长的超时重新提交
    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout)
    }
}

/// 协作方错误在组件边界转为管线错误；原始网络错误不会直接到达用户
impl From<ApiError> for PipelineError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Timeout => PipelineError::TransientNetwork("request timed out".to_string()),
            ApiError::Transport(msg) => PipelineError::TransientNetwork(msg),
            ApiError::Status { status, body } => {
                let snippet: String = body.chars().take(200).collect();
                PipelineError::RemoteExecution(format!("HTTP {status}: {snippet}"))
            }
            ApiError::Decode(msg) => PipelineError::RemoteExecution(format!("malformed response: {msg}")),
            ApiError::NotConfigured(msg) => PipelineError::Validation(msg),
        }
    }
}

/// 列表中的单个 Agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, rename = "type")]
    pub agent_type: String,
}

impl AgentSummary {
    /// 所有关键词都出现在标题、描述、slug 或类型中（不区分大小写）
    pub fn matches_keywords(&self, keywords: &str) -> bool {
        let haystack = format!(
            "{} {} {} {}",
            self.title, self.description, self.slug, self.agent_type
        )
        .to_lowercase();
        keywords
            .split_whitespace()
            .map(str::to_lowercase)
            .all(|k| haystack.contains(&k))
    }

    pub fn is_type(&self, agent_type: &str) -> bool {
        self.agent_type.eq_ignore_ascii_case(agent_type)
    }
}

/// 列表接口的一页
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentPage {
    #[serde(default)]
    pub data: Vec<AgentSummary>,
    #[serde(default)]
    pub total: u64,
}

/// 单个 Agent 的详情（含需要填写的问题字段）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentDetails {
    #[serde(flatten)]
    pub summary: AgentSummary,
    #[serde(default)]
    pub questions: Vec<AgentQuestion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentQuestion {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// 列表查询参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentQuery {
    pub page: u32,
    pub per_page: u32,
    pub agent_type: Option<String>,
}

impl AgentQuery {
    pub fn first_page(per_page: u32) -> Self {
        Self {
            page: 1,
            per_page,
            agent_type: None,
        }
    }

    pub fn with_type(mut self, agent_type: Option<&str>) -> Self {
        self.agent_type = agent_type.map(str::to_string);
        self
    }
}

/// 远程 Agent API
#[async_trait]
pub trait AgentApi: Send + Sync {
    /// GET /agents?page&per_page&type
    async fn list_agents(&self, query: &AgentQuery) -> Result<AgentPage, ApiError>;

    /// GET /agents/{id}
    async fn get_agent(&self, agent_id: &str) -> Result<AgentDetails, ApiError>;

    /// POST /agents/{id}/execute，带单次请求超时
    async fn execute(
        &self,
        agent_id: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<Value, ApiError>;

    /// GET /agents/{id}/executions/{execution_id}
    async fn execution_status(&self, agent_id: &str, execution_id: &str)
        -> Result<Value, ApiError>;
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unexpected agent id: {other}"
        ))),
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_accepts_numeric_ids_and_null_description() {
        let page: AgentPage = serde_json::from_value(serde_json::json!({
            "data": [
                {"id": 53, "slug": "e-mail-de-venda-Sxtjz8", "title": "E-mail de Venda",
                 "description": null, "type": "text"},
                {"id": "3176", "slug": "multi-chat-S7C0WU", "title": "Multi Chat", "type": "chat"}
            ],
            "total": 2
        }))
        .unwrap();

        assert_eq!(page.data[0].id, "53");
        assert_eq!(page.data[0].description, "");
        assert_eq!(page.data[1].id, "3176");
        assert!(page.data[1].is_type("CHAT"));
    }

    #[test]
    fn test_matches_all_keywords() {
        let agent = AgentSummary {
            id: "67".into(),
            slug: "transformar-texto-em-post-para-linkedin-mF37hV".into(),
            title: "Transformar texto em post".into(),
            description: "Cria posts para o LinkedIn".into(),
            agent_type: "text".into(),
        };
        assert!(agent.matches_keywords("LinkedIn post"));
        assert!(agent.matches_keywords("text"));
        assert!(!agent.matches_keywords("linkedin youtube"));
    }

    #[test]
    fn test_api_errors_map_to_pipeline_taxonomy() {
        assert!(PipelineError::from(ApiError::Timeout).is_retryable());
        assert!(matches!(
            PipelineError::from(ApiError::Status { status: 500, body: "boom".into() }),
            PipelineError::RemoteExecution(_)
        ));
        assert!(matches!(
            PipelineError::from(ApiError::NotConfigured("TESS_API_KEY is not set".into())),
            PipelineError::Validation(_)
        ));
    }
}
