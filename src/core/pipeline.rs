//! 指令管线：一行输入 -> 意图解析 -> 分发 -> 可展示的文本
//!
//! 对上层只暴露 handle(raw) -> String。每条输入都被完整处理到终态后才返回；
//! 任何错误都渲染成一行带前缀的提示，不会中断聊天循环。

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use super::error::PipelineError;
use super::format::{help_text, render_agent_details, render_agent_list, render_outcome, render_usage};
use crate::agents::directory::{FEATURE_TITLE_AGENT, LINKEDIN_POST_AGENT, SALES_EMAIL_AGENT};
use crate::agents::{
    AgentApi, AgentDirectory, AgentQuery, AgentSummary, ExecutionOrchestrator, ExecutionRequest,
    PayloadBuilder, UrlParams,
};
use crate::intent::{Command, CommandType, IntentResolver};
use crate::llm::ProviderGateway;
use crate::memory::{ConversationMemory, Message};

/// 普通聊天的默认系统提示
pub const DEFAULT_SYSTEM_PROMPT: &str = "Você é um assistente prestativo que ajuda a encontrar e executar agentes de IA. \
     Responda sempre em português do Brasil, de forma clara e objetiva.";

/// 仪表盘 URL 未附带消息时使用的默认问候
pub const DEFAULT_GREETING: &str = "Olá, como posso ajudar?";

/// 指令管线
pub struct CommandPipeline {
    resolver: IntentResolver,
    api: Arc<dyn AgentApi>,
    directory: AgentDirectory,
    orchestrator: ExecutionOrchestrator,
    payloads: PayloadBuilder,
    gateway: Arc<ProviderGateway>,
    history: Mutex<ConversationMemory>,
    system_prompt: String,
    list_page_size: u32,
    submit_timeout_secs: u64,
}

/// 构建管线所需的组件
pub struct PipelineParts {
    pub resolver: IntentResolver,
    pub api: Arc<dyn AgentApi>,
    pub orchestrator: ExecutionOrchestrator,
    pub payloads: PayloadBuilder,
    pub gateway: Arc<ProviderGateway>,
    pub system_prompt: String,
    pub max_context_turns: usize,
    pub list_page_size: u32,
    pub submit_timeout_secs: u64,
}

impl CommandPipeline {
    pub fn new(parts: PipelineParts) -> Self {
        Self {
            directory: AgentDirectory::new(parts.api.clone(), parts.list_page_size),
            resolver: parts.resolver,
            api: parts.api,
            orchestrator: parts.orchestrator,
            payloads: parts.payloads,
            gateway: parts.gateway,
            history: Mutex::new(ConversationMemory::new(parts.max_context_turns)),
            system_prompt: parts.system_prompt,
            list_page_size: parts.list_page_size,
            submit_timeout_secs: parts.submit_timeout_secs,
        }
    }

    /// 处理一行输入（不可取消）
    pub async fn handle(&self, raw: &str) -> String {
        self.handle_with_cancel(raw, &CancellationToken::new()).await
    }

    /// 处理一行输入；token 被取消时正在进行的轮询以超时结束
    pub async fn handle_with_cancel(&self, raw: &str, cancel: &CancellationToken) -> String {
        let text = raw.trim();
        if text.is_empty() {
            return String::new();
        }

        let result = match self.resolver.detect(text).await {
            Some(command) => self.dispatch(&command, cancel).await,
            None => self.chat(text).await,
        };
        result.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Command failed");
            e.user_message()
        })
    }

    /// 清空聊天历史
    pub fn clear_history(&self) {
        if let Ok(mut history) = self.history.lock() {
            history.clear();
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().map(|h| h.messages().len()).unwrap_or(0)
    }

    async fn dispatch(
        &self,
        command: &Command,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        tracing::info!(command = %command.kind, params = ?command.params, "Dispatching command");
        match command.kind {
            CommandType::ListarAgentes => self.list(None, None).await,
            CommandType::ListarAgentesPorTipo => {
                self.list(Some(required(command, "tipo")?), None).await
            }
            CommandType::ListarAgentesPorKeyword => {
                self.list(None, Some(required(command, "keyword")?)).await
            }
            CommandType::ListarAgentesPorTipoEKeyword => {
                let tipo = required(command, "tipo")?;
                self.list(Some(tipo), Some(required(command, "keyword")?))
                    .await
            }
            CommandType::BuscarAgentes => self.search(None, Some(required(command, "termo")?)).await,
            CommandType::BuscarAgentesPorTipo => {
                self.search(Some(required(command, "tipo")?), None).await
            }
            CommandType::BuscarAgentesPorTipoETermo => {
                let tipo = required(command, "tipo")?;
                self.search(Some(tipo), Some(required(command, "termo")?))
                    .await
            }
            CommandType::ObterAgente => self.details(required(command, "id")?).await,
            CommandType::ExecutarAgente => {
                let id = required(command, "id")?;
                let message = match command.param("mensagem") {
                    Some(m) => m,
                    None if command.is_from_url() => DEFAULT_GREETING,
                    None => "",
                };
                let url_params = UrlParams {
                    model: command.param("model").map(str::to_string),
                    temperature: command.param("temperature").map(str::to_string),
                    tools: command.param("tools").map(str::to_string),
                };
                let url_params = (!url_params.is_empty()).then_some(url_params);
                self.execute(id, message, url_params, cancel).await
            }
            CommandType::TransformarPostLinkedin => {
                self.execute(LINKEDIN_POST_AGENT, required(command, "texto")?, None, cancel)
                    .await
            }
            CommandType::CriarEmailVenda => {
                self.execute(SALES_EMAIL_AGENT, required(command, "produto")?, None, cancel)
                    .await
            }
            CommandType::GerarTituloEmail => {
                self.execute(FEATURE_TITLE_AGENT, required(command, "recurso")?, None, cancel)
                    .await
            }
            CommandType::MostrarAjuda => Ok(help_text().to_string()),
            CommandType::UsoModelos => Ok(render_usage(&self.gateway.usage_stats())),
        }
    }

    async fn fetch(&self, agent_type: Option<&str>) -> Result<Vec<AgentSummary>, PipelineError> {
        let query = AgentQuery::first_page(self.list_page_size).with_type(agent_type);
        let page = self.api.list_agents(&query).await?;
        let mut agents = page.data;
        // 远程可能忽略 type 参数，本地再过滤一次
        if let Some(t) = agent_type {
            agents.retain(|a| a.is_type(t));
        }
        Ok(agents)
    }

    async fn list(
        &self,
        agent_type: Option<&str>,
        keyword: Option<&str>,
    ) -> Result<String, PipelineError> {
        let mut agents = self.fetch(agent_type).await?;
        if let Some(k) = keyword {
            agents.retain(|a| a.matches_keywords(k));
        }
        let title = match (agent_type, keyword) {
            (None, None) => "Agentes disponíveis".to_string(),
            (Some(t), None) => format!("Agentes do tipo {t}"),
            (None, Some(k)) => format!("Agentes com '{k}'"),
            (Some(t), Some(k)) => format!("Agentes do tipo {t} com '{k}'"),
        };
        Ok(render_agent_list(&title, &agents))
    }

    async fn search(
        &self,
        agent_type: Option<&str>,
        term: Option<&str>,
    ) -> Result<String, PipelineError> {
        let mut agents = self.fetch(agent_type).await?;
        if let Some(term) = term {
            let needle = term.to_lowercase();
            agents.retain(|a| {
                a.title.to_lowercase().contains(&needle)
                    || a.description.to_lowercase().contains(&needle)
            });
        }
        let title = match (agent_type, term) {
            (Some(t), Some(term)) => format!("Busca por '{term}' em agentes do tipo {t}"),
            (Some(t), None) => format!("Busca por agentes do tipo {t}"),
            (None, Some(term)) => format!("Busca por '{term}'"),
            (None, None) => "Busca".to_string(),
        };
        Ok(render_agent_list(&title, &agents))
    }

    async fn details(&self, raw_id: &str) -> Result<String, PipelineError> {
        let agent = self.directory.resolve(raw_id).await;
        let details = self.api.get_agent(agent.target_id()).await?;
        Ok(render_agent_details(&details))
    }

    async fn execute(
        &self,
        raw_id: &str,
        message: &str,
        url_params: Option<UrlParams>,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        let agent = self.directory.resolve(raw_id).await;
        let payload = self.payloads.build(&agent, message, url_params.as_ref())?;
        let request = ExecutionRequest {
            agent,
            payload,
            wait_for_completion: self.payloads.wait_for_completion(),
            timeout_seconds: self.submit_timeout_secs,
        };
        let outcome = self.orchestrator.execute(&request, cancel).await;
        Ok(render_outcome(&request.agent, &outcome))
    }

    /// 普通聊天：系统提示 + 有界历史 + 本轮输入，经主备网关生成
    async fn chat(&self, text: &str) -> Result<String, PipelineError> {
        let mut messages = vec![Message::system(self.system_prompt.clone())];
        if let Ok(history) = self.history.lock() {
            messages.extend(history.messages().iter().cloned());
        }
        messages.push(Message::user(text));

        let completion = self.gateway.generate(&messages).await?;
        if let Ok(mut history) = self.history.lock() {
            history.push_turn(text, completion.content.clone());
        }
        Ok(completion.content)
    }
}

fn required<'a>(command: &'a Command, key: &str) -> Result<&'a str, PipelineError> {
    command.param(key).ok_or_else(|| {
        PipelineError::Validation(format!(
            "parâmetro '{key}' ausente para o comando {}",
            command.kind
        ))
    })
}
