//! 管线构建器：从配置组装 LLM 提供方、Agent API、意图解析器与编排器
//!
//! 测试与二进制共用同一套组装逻辑；协作方（Agent API、LLM、Sleeper）可逐个替换为桩实现。

use std::sync::Arc;

use super::pipeline::{CommandPipeline, PipelineParts, DEFAULT_SYSTEM_PROMPT};
use crate::agents::{
    AgentApi, ExecutionOrchestrator, HttpAgentApi, OrchestratorSettings, PayloadBuilder, Sleeper,
};
use crate::config::{AppConfig, ProviderSection};
use crate::intent::{IntentResolver, RuleTable};
use crate::llm::{
    create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient, ProviderGateway,
    ProviderUsageStats,
};

const ARCEE_BASE_URL: &str = "https://models.arcee.ai/v1";

/// 按提供方配置创建 LLM 客户端；缺少对应 API Key 时退回 Mock，保证离线可用
pub fn create_llm_client(section: &ProviderSection) -> Arc<dyn LlmClient> {
    let provider = section.provider.to_lowercase();
    let client = match provider.as_str() {
        "deepseek" if std::env::var("DEEPSEEK_API_KEY").is_ok() => {
            create_deepseek_client(Some(&section.model))
        }
        "arcee" => match std::env::var("ARCEE_API_KEY") {
            Ok(key) => {
                let base = section.base_url.as_deref().unwrap_or(ARCEE_BASE_URL);
                OpenAiClient::new(Some(base), &section.model, Some(&key)).with_label("arcee")
            }
            Err(_) => return mock(&provider),
        },
        "openai" if std::env::var("OPENAI_API_KEY").is_ok() => {
            OpenAiClient::new(section.base_url.as_deref(), &section.model, None)
        }
        "mock" => return Arc::new(MockLlmClient),
        _ => return mock(&provider),
    };

    tracing::info!(provider = %provider, model = %section.model, "Using LLM provider");
    Arc::new(
        client
            .with_sampling(section.temperature, section.max_tokens)
            .with_timeout(section.timeout_secs),
    )
}

fn mock(provider: &str) -> Arc<dyn LlmClient> {
    tracing::warn!(provider = %provider, "No API key set or provider unknown, using Mock LLM");
    Arc::new(MockLlmClient)
}

/// 管线构建器
pub struct PipelineBuilder {
    config: AppConfig,
    system_prompt: String,
    agent_api: Option<Arc<dyn AgentApi>>,
    primary: Option<Arc<dyn LlmClient>>,
    secondary: Option<Arc<dyn LlmClient>>,
    sleeper: Option<Arc<dyn Sleeper>>,
    stats: Arc<ProviderUsageStats>,
}

impl PipelineBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            agent_api: None,
            primary: None,
            secondary: None,
            sleeper: None,
            stats: Arc::new(ProviderUsageStats::new()),
        }
    }

    /// 从 config/prompts/system.md 加载系统提示（找不到时保留默认）
    pub fn with_system_prompt_from_file(mut self) -> Self {
        if let Some(prompt) = ["config/prompts/system.md", "../config/prompts/system.md"]
            .into_iter()
            .find_map(|p| std::fs::read_to_string(p).ok())
            .filter(|p| !p.trim().is_empty())
        {
            self.system_prompt = prompt;
        }
        self
    }

    pub fn with_agent_api(mut self, api: Arc<dyn AgentApi>) -> Self {
        self.agent_api = Some(api);
        self
    }

    /// 替换主备提供方（默认按配置创建）
    pub fn with_providers(
        mut self,
        primary: Arc<dyn LlmClient>,
        secondary: Option<Arc<dyn LlmClient>>,
    ) -> Self {
        self.primary = Some(primary);
        self.secondary = secondary;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// 共享的用量统计（由调用方持有以便断言或展示）
    pub fn with_usage_stats(mut self, stats: Arc<ProviderUsageStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn build(self) -> Result<CommandPipeline, regex::Error> {
        let cfg = &self.config;

        let (primary, secondary) = match self.primary {
            Some(primary) => (primary, self.secondary),
            None => (
                create_llm_client(&cfg.llm.primary),
                Some(create_llm_client(&cfg.llm.secondary)),
            ),
        };
        let gateway = Arc::new(ProviderGateway::new(primary, secondary, self.stats));

        let api: Arc<dyn AgentApi> = match self.agent_api {
            Some(api) => api,
            None => Arc::new(HttpAgentApi::from_config(&cfg.agents)),
        };

        let mut resolver = IntentResolver::new(RuleTable::standard()?, cfg.agents.dashboard_host.clone());
        if cfg.intent.llm_fallback {
            resolver = resolver.with_classifier(gateway.clone(), cfg.intent.min_tokens);
        }

        let mut orchestrator =
            ExecutionOrchestrator::new(api.clone(), OrchestratorSettings::from_config(&cfg.agents));
        if let Some(sleeper) = self.sleeper {
            orchestrator = orchestrator.with_sleeper(sleeper);
        }

        let payloads = if cfg.agents.wait_for_completion {
            PayloadBuilder::new()
        } else {
            PayloadBuilder::new().asynchronous()
        };

        Ok(CommandPipeline::new(PipelineParts {
            resolver,
            api,
            orchestrator,
            payloads,
            gateway,
            system_prompt: self.system_prompt,
            max_context_turns: cfg.app.max_context_turns,
            list_page_size: cfg.agents.list_page_size,
            submit_timeout_secs: cfg.agents.submit_timeout_secs,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_provider_is_explicit() {
        let section = ProviderSection {
            provider: "mock".into(),
            ..ProviderSection::default()
        };
        assert_eq!(create_llm_client(&section).name(), "mock");
    }

    #[test]
    fn test_unknown_provider_falls_back_to_mock() {
        let section = ProviderSection {
            provider: "nonexistent".into(),
            ..ProviderSection::default()
        };
        assert_eq!(create_llm_client(&section).name(), "mock");
    }
}
