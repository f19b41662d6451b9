//! AgentApi 的 reqwest 实现
//!
//! Bearer 鉴权；非 2xx 转为 ApiError::Status（保留原始 body 以便解析 422 缺失字段）；
//! reqwest 超时转为 ApiError::Timeout，JSON 解析失败转为 ApiError::Decode。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::api::{AgentApi, AgentDetails, AgentPage, AgentQuery, ApiError};
use crate::config::AgentsSection;

/// HTTP 客户端：base_url 形如 https://tess.pareto.io/api
pub struct HttpAgentApi {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    default_timeout: Duration,
}

impl HttpAgentApi {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .user_agent(concat!("agent-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            default_timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn from_config(cfg: &AgentsSection) -> Self {
        Self::new(
            cfg.base_url.clone(),
            cfg.resolved_api_key(),
            cfg.list_timeout_secs,
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        let key = self.api_key.as_deref().ok_or_else(|| {
            ApiError::NotConfigured("TESS_API_KEY is not set".to_string())
        })?;
        Ok(request.bearer_auth(key))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self
            .authorize(request)?
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn map_transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Transport(e.to_string())
    }
}

#[async_trait]
impl AgentApi for HttpAgentApi {
    async fn list_agents(&self, query: &AgentQuery) -> Result<AgentPage, ApiError> {
        let mut params = vec![
            ("page", query.page.to_string()),
            ("per_page", query.per_page.to_string()),
        ];
        if let Some(agent_type) = &query.agent_type {
            params.push(("type", agent_type.clone()));
        }
        let request = self
            .client
            .get(self.url("agents"))
            .query(&params)
            .timeout(self.default_timeout);
        self.send(request).await
    }

    async fn get_agent(&self, agent_id: &str) -> Result<AgentDetails, ApiError> {
        let request = self
            .client
            .get(self.url(&format!("agents/{agent_id}")))
            .timeout(self.default_timeout);
        self.send(request).await
    }

    async fn execute(
        &self,
        agent_id: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<Value, ApiError> {
        let request = self
            .client
            .post(self.url(&format!("agents/{agent_id}/execute")))
            .json(payload)
            .timeout(timeout);
        self.send(request).await
    }

    async fn execution_status(
        &self,
        agent_id: &str,
        execution_id: &str,
    ) -> Result<Value, ApiError> {
        let request = self
            .client
            .get(self.url(&format!("agents/{agent_id}/executions/{execution_id}")))
            .timeout(self.default_timeout);
        self.send(request).await
    }
}
