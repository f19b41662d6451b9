//! 管线集成测试：全部协作方替换为桩实现，不访问网络

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agent_relay::agents::{
    AgentApi, AgentDetails, AgentPage, AgentQuery, AgentSummary, ApiError, Sleeper,
};
use agent_relay::config::AppConfig;
use agent_relay::core::{CommandPipeline, PipelineBuilder, DEFAULT_GREETING};
use agent_relay::llm::{Completion, LlmClient, LlmError, ProviderUsageStats};
use agent_relay::memory::Message;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

/// 固定目录 + 记录提交内容的 Agent API 桩
#[derive(Default)]
struct StubAgentApi {
    submitted: Mutex<Vec<(String, Value)>>,
    submit_replies: Mutex<VecDeque<Result<Value, ApiError>>>,
    poll_replies: Mutex<VecDeque<Result<Value, ApiError>>>,
    list_calls: AtomicUsize,
}

impl StubAgentApi {
    fn replying(submits: Vec<Result<Value, ApiError>>, polls: Vec<Result<Value, ApiError>>) -> Arc<Self> {
        Arc::new(Self {
            submit_replies: Mutex::new(submits.into()),
            poll_replies: Mutex::new(polls.into()),
            ..Self::default()
        })
    }

    fn last_submission(&self) -> (String, Value) {
        self.submitted.lock().unwrap().last().cloned().unwrap()
    }
}

fn agent(id: &str, slug: &str, title: &str, description: &str, agent_type: &str) -> AgentSummary {
    AgentSummary {
        id: id.into(),
        slug: slug.into(),
        title: title.into(),
        description: description.into(),
        agent_type: agent_type.into(),
    }
}

fn catalogue() -> Vec<AgentSummary> {
    vec![
        agent("53", "e-mail-de-venda-Sxtjz8", "E-mail de Venda", "Cria e-mails de venda persuasivos", "text"),
        agent("67", "transformar-texto-em-post-para-linkedin-mF37hV", "Post para LinkedIn", "Transforma textos em posts para o LinkedIn", "text"),
        agent("3176", "multi-chat-S7C0WU", "Multi Chat", "Chat com vários modelos", "chat"),
        agent("4001", "assistente-juridico-Q1w2E3", "Assistente Jurídico", "Tira dúvidas jurídicas", "chat"),
    ]
}

#[async_trait]
impl AgentApi for StubAgentApi {
    async fn list_agents(&self, _query: &AgentQuery) -> Result<AgentPage, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        // 模拟忽略 type 参数的远程端
        Ok(AgentPage {
            data: catalogue(),
            total: 4,
        })
    }

    async fn get_agent(&self, agent_id: &str) -> Result<AgentDetails, ApiError> {
        let summary = catalogue()
            .into_iter()
            .find(|a| a.id == agent_id)
            .ok_or(ApiError::Status {
                status: 404,
                body: r#"{"message":"Not found"}"#.into(),
            })?;
        Ok(AgentDetails {
            summary,
            questions: Vec::new(),
        })
    }

    async fn execute(&self, agent_id: &str, payload: &Value, _timeout: Duration) -> Result<Value, ApiError> {
        self.submitted
            .lock()
            .unwrap()
            .push((agent_id.to_string(), payload.clone()));
        self.submit_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({"output": "ok"})))
    }

    async fn execution_status(&self, _agent_id: &str, _execution_id: &str) -> Result<Value, ApiError> {
        self.poll_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({"status": "processing"})))
    }
}

struct InstantSleeper;

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, _duration: Duration) {}
}

/// 固定回复或固定失败的 LLM 桩
struct StubLlm {
    model: &'static str,
    fail: bool,
    calls: AtomicUsize,
}

impl StubLlm {
    fn ok(model: &'static str) -> Arc<Self> {
        Arc::new(Self {
            model,
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            model: "primary",
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LlmClient for StubLlm {
    async fn complete(&self, messages: &[Message]) -> Result<Completion, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(LlmError::ApiError("connection reset".into()));
        }
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        Ok(Completion::new(format!("resposta para: {last}"), self.model))
    }
}

fn config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.intent.llm_fallback = false;
    cfg
}

fn pipeline(api: Arc<StubAgentApi>, primary: Arc<StubLlm>, secondary: Arc<StubLlm>) -> CommandPipeline {
    PipelineBuilder::new(config())
        .with_agent_api(api)
        .with_providers(primary, Some(secondary as Arc<dyn LlmClient>))
        .with_sleeper(Arc::new(InstantSleeper))
        .build()
        .unwrap()
}

fn default_pipeline(api: Arc<StubAgentApi>) -> CommandPipeline {
    pipeline(api, StubLlm::ok("main"), StubLlm::ok("backup"))
}

#[tokio::test]
async fn test_list_by_type_filters_locally() {
    let api = StubAgentApi::replying(vec![], vec![]);
    let reply = default_pipeline(api).handle("listar agentes tipo chat").await;

    assert!(reply.contains("Multi Chat"));
    assert!(reply.contains("Assistente Jurídico"));
    assert!(!reply.contains("E-mail de Venda"));
}

#[tokio::test]
async fn test_list_by_keyword_requires_every_keyword() {
    let api = StubAgentApi::replying(vec![], vec![]);
    let reply = default_pipeline(api).handle("listar agentes contendo post linkedin").await;

    assert!(reply.contains("Post para LinkedIn"));
    assert!(!reply.contains("Multi Chat"));
}

#[tokio::test]
async fn test_search_by_term() {
    let api = StubAgentApi::replying(vec![], vec![]);
    let reply = default_pipeline(api).handle("buscar agentes para jurídicas").await;

    assert!(reply.contains("Assistente Jurídico"));
    assert!(!reply.contains("Multi Chat"));
}

#[tokio::test]
async fn test_agent_details_resolves_alias_first() {
    let api = StubAgentApi::replying(vec![], vec![]);
    let reply = default_pipeline(api.clone())
        .handle("detalhes do agente e-mail-de-venda-Sxtjz8")
        .await;

    assert!(reply.contains("E-mail de Venda"));
    assert!(reply.contains("ID: 53"));
    assert_eq!(api.list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_sales_email_shortcut_fills_schema() {
    let api = StubAgentApi::replying(
        vec![Ok(json!({"responses": [{"id": 9, "status": "succeeded", "output": "Assunto: conheça o CRM"}]}))],
        vec![],
    );
    let reply = default_pipeline(api.clone())
        .handle("criar email de venda para: CRM simples")
        .await;

    assert!(reply.contains("Assunto: conheça o CRM"));
    let (agent_id, payload) = api.last_submission();
    assert_eq!(agent_id, "53");
    assert_eq!(payload["diferenciais-do-produto"], "CRM simples");
    assert_eq!(payload["nome-do-produto"], "TESS AI");
    assert_eq!(payload["waitExecution"], true);
}

#[tokio::test]
async fn test_dashboard_url_uses_greeting_and_overrides() {
    let api = StubAgentApi::replying(vec![Ok(json!({"output": "Oi! Em que posso ajudar?"}))], vec![]);
    let reply = default_pipeline(api.clone())
        .handle("@https://agno.pareto.io/pt-BR/dashboard/user/ai/chat/ai-chat/professional-dev-ai?temperature=0.2&model=gpt-4o")
        .await;

    assert!(reply.contains("Em que posso ajudar"));
    let (agent_id, payload) = api.last_submission();
    assert_eq!(agent_id, "3238");
    assert_eq!(payload["model"], "gpt-4o");
    assert_eq!(payload["temperature"], "0.2");
    assert_eq!(payload["tools"], "internet");
    assert_eq!(payload["messages"][0]["content"], DEFAULT_GREETING);
}

#[tokio::test]
async fn test_execution_polls_until_completed() {
    let api = StubAgentApi::replying(
        vec![Ok(json!({"responses": [{"id": 41, "status": "starting"}]}))],
        vec![
            Ok(json!({"status": "processing"})),
            Ok(json!({"status": "processing"})),
            Ok(json!({"status": "completed", "output": "Post pronto"})),
        ],
    );
    let reply = default_pipeline(api)
        .handle("transformar texto em post para linkedin: lançamos a versão 2.0")
        .await;

    assert!(reply.contains("Post pronto"), "{reply}");
}

#[tokio::test]
async fn test_polling_exhaustion_is_reported_as_timeout() {
    let api = StubAgentApi::replying(vec![Ok(json!({"responses": [{"id": 41}]}))], vec![]);
    let reply = default_pipeline(api).handle(r#"executar 67 "texto qualquer""#).await;

    assert!(reply.starts_with("⏱️"), "{reply}");
}

#[tokio::test]
async fn test_asynchronous_mode_reports_execution_id_without_polling() {
    let api = StubAgentApi::replying(
        vec![Ok(json!({"responses": [{"id": 41, "status": "starting"}]}))],
        vec![Ok(json!({"status": "completed", "output": "não deveria ser lido"}))],
    );
    let mut cfg = config();
    cfg.agents.wait_for_completion = false;
    let pipeline = PipelineBuilder::new(cfg)
        .with_agent_api(api.clone())
        .with_providers(StubLlm::ok("main"), None)
        .with_sleeper(Arc::new(InstantSleeper))
        .build()
        .unwrap();

    let reply = pipeline.handle(r#"executar 67 "texto qualquer""#).await;

    assert!(reply.contains("iniciada (execução 41)"), "{reply}");
    assert_eq!(api.last_submission().1["waitExecution"], false);
    assert_eq!(api.poll_replies.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_question_mentioning_usar_com_texto_stays_chat() {
    let api = StubAgentApi::replying(vec![], vec![]);
    let reply = default_pipeline(api.clone())
        .handle("posso usar markdown com texto simples?")
        .await;

    assert!(reply.starts_with("resposta para:"), "{reply}");
    assert!(api.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_message_is_validation_error() {
    let api = StubAgentApi::replying(vec![], vec![]);
    let reply = default_pipeline(api.clone())
        .handle("executar agente do agno e-mail-de-venda-Sxtjz8")
        .await;

    assert!(reply.starts_with("❌"), "{reply}");
    assert!(api.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_turn_times_out_without_crashing() {
    let api = StubAgentApi::replying(vec![], vec![]);
    let token = CancellationToken::new();
    token.cancel();
    let reply = default_pipeline(api)
        .handle_with_cancel(r#"executar 53 "CRM""#, &token)
        .await;

    assert!(reply.starts_with("⏱️"), "{reply}");
}

#[tokio::test]
async fn test_chat_falls_back_to_secondary_and_counts_usage() {
    let api = StubAgentApi::replying(vec![], vec![]);
    let primary = StubLlm::failing();
    let secondary = StubLlm::ok("backup");
    let pipeline = pipeline(api, primary.clone(), secondary.clone());

    let reply = pipeline.handle("qual a capital da França?").await;
    assert!(reply.contains("qual a capital da França?"));
    assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    assert_eq!(pipeline.history_len(), 2);

    let usage = pipeline.handle("uso de modelos").await;
    assert!(usage.contains("backup: 1"), "{usage}");

    pipeline.clear_history();
    assert_eq!(pipeline.history_len(), 0);
}

#[tokio::test]
async fn test_both_providers_down_is_single_error_line() {
    let api = StubAgentApi::replying(vec![], vec![]);
    let reply = pipeline(api, StubLlm::failing(), StubLlm::failing())
        .handle("me conte uma piada")
        .await;

    assert!(reply.starts_with("❌"));
    assert!(!reply.contains('\n'));
}

#[tokio::test]
async fn test_classifier_fallback_through_gateway() {
    /// 把任何输入都分类为“listar_agentes”的 LLM
    struct ListingClassifier;

    #[async_trait]
    impl LlmClient for ListingClassifier {
        async fn complete(&self, _messages: &[Message]) -> Result<Completion, LlmError> {
            Ok(Completion::new(
                r#"{"is_command": true, "command": "listar_agentes", "params": {}}"#,
                "classifier",
            ))
        }
    }

    let stats = Arc::new(ProviderUsageStats::new());
    let api = StubAgentApi::replying(vec![], vec![]);
    let pipeline = PipelineBuilder::new(AppConfig::default())
        .with_agent_api(api)
        .with_providers(Arc::new(ListingClassifier), None)
        .with_usage_stats(stats.clone())
        .build()
        .unwrap();

    let reply = pipeline.handle("quais opções eu tenho por aqui").await;
    assert!(reply.contains("Agentes disponíveis"), "{reply}");
    assert_eq!(stats.snapshot().count("classifier"), 1);
}
