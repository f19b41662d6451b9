//! 执行请求体构建
//!
//! 纯函数：(AgentReference, 消息, URL 参数) -> JSON 请求体。
//! 批处理类 Agent 的字段结构来自按 canonical id 索引的 schema 注册表；
//! 注册表里没有的 Agent 走显式的 best-effort 模式（把消息复制到几个常见字段名）。

use serde_json::{json, Map, Value};

use super::directory::{AgentKind, AgentReference};
use crate::core::error::PipelineError;

/// 请求体中"是否等待执行完成"标志的字段名
pub const WAIT_FLAG_KEY: &str = "waitExecution";

const CHAT_DEFAULT_MODEL: &str = "tess-5-pro";
const CHAT_DEFAULT_TEMPERATURE: &str = "0.5";
const CHAT_DEFAULT_TOOLS: &str = "no-tools";

const BATCH_DEFAULT_MODEL: &str = "tess-ai-light";
const BATCH_DEFAULT_TEMPERATURE: f64 = 0.5;
const BATCH_DEFAULT_MAXLENGTH: u32 = 500;
const BATCH_LANGUAGE: &str = "Portuguese (Brazil)";

/// best-effort 模式下消息会被复制到的字段
pub const BEST_EFFORT_FIELDS: &[&str] = &["message", "text", "mensagem", "texto"];

/// 从仪表盘 URL 查询串解析出的参数，覆盖对话类 Agent 的默认值
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParams {
    pub model: Option<String>,
    pub temperature: Option<String>,
    pub tools: Option<String>,
}

impl UrlParams {
    pub fn is_empty(&self) -> bool {
        self.model.is_none() && self.temperature.is_none() && self.tools.is_none()
    }
}

/// 已知对话类 Agent 的模型参数覆盖
struct ChatOverride {
    id: &'static str,
    model: &'static str,
    temperature: &'static str,
    tools: &'static str,
}

const CHAT_OVERRIDES: &[ChatOverride] = &[
    ChatOverride {
        id: "3176",
        model: "claude-3-7-sonnet-latest-thinking",
        temperature: "1",
        tools: CHAT_DEFAULT_TOOLS,
    },
    ChatOverride {
        id: "3238",
        model: "claude-3-7-sonnet-latest",
        temperature: "0",
        tools: "internet",
    },
];

/// 批处理类 Agent 的字段描述
#[derive(Debug)]
pub struct BatchSchema {
    pub id: &'static str,
    pub temperature: f64,
    pub maxlength: u32,
    /// 用户消息写入的字段
    pub message_field: &'static str,
    /// 固定默认值字段
    pub defaults: &'static [(&'static str, &'static str)],
    /// 远程要求必须出现的字段（含 message_field）
    pub required: &'static [&'static str],
}

pub const BATCH_SCHEMAS: &[BatchSchema] = &[
    BatchSchema {
        id: "53",
        temperature: BATCH_DEFAULT_TEMPERATURE,
        maxlength: BATCH_DEFAULT_MAXLENGTH,
        message_field: "diferenciais-do-produto",
        defaults: &[
            ("nome-do-produto", "TESS AI"),
            ("url-do-produto", "https://tess.pareto.io"),
        ],
        required: &["nome-do-produto", "url-do-produto", "diferenciais-do-produto"],
    },
    BatchSchema {
        id: "52",
        temperature: BATCH_DEFAULT_TEMPERATURE,
        maxlength: BATCH_DEFAULT_MAXLENGTH,
        message_field: "novo-recurso",
        defaults: &[("produto", "TESS AI")],
        required: &["novo-recurso", "produto"],
    },
    BatchSchema {
        id: "67",
        temperature: BATCH_DEFAULT_TEMPERATURE,
        maxlength: BATCH_DEFAULT_MAXLENGTH,
        message_field: "texto",
        defaults: &[],
        required: &["texto"],
    },
    BatchSchema {
        id: "68",
        temperature: 1.0,
        maxlength: 750,
        message_field: "tema-do-anuncio",
        defaults: &[
            ("area-de-atucao-da-empresa", "Educação e Treinamento"),
            (
                "publico-alvo",
                "Profissionais buscando aprimoramento em marketing digital",
            ),
            ("ocasiao-especial", "Lançamento do curso"),
            (
                "descreva-o-produto-ou-servico",
                "Curso completo de marketing digital com conteúdo prático",
            ),
            ("company-name", "Academia de Marketing Digital"),
        ],
        required: &["tema-do-anuncio"],
    },
];

pub fn schema_for(canonical_id: &str) -> Option<&'static BatchSchema> {
    BATCH_SCHEMAS.iter().find(|s| s.id == canonical_id)
}

/// 请求体构建器
#[derive(Debug, Clone, Copy)]
pub struct PayloadBuilder {
    wait_for_completion: bool,
}

impl Default for PayloadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadBuilder {
    pub fn new() -> Self {
        Self {
            wait_for_completion: true,
        }
    }

    /// 异步模式：远程立即返回执行 ID，不等待结果
    pub fn asynchronous(mut self) -> Self {
        self.wait_for_completion = false;
        self
    }

    pub fn wait_for_completion(&self) -> bool {
        self.wait_for_completion
    }

    pub fn build(
        &self,
        agent: &AgentReference,
        message: &str,
        url_params: Option<&UrlParams>,
    ) -> Result<Value, PipelineError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(PipelineError::Validation(format!(
                "empty message for agent '{}'",
                agent.raw_name
            )));
        }

        let id = agent.target_id();
        let mut body = match agent.kind {
            AgentKind::Chat => self.chat_payload(id, message, url_params),
            AgentKind::Batch | AgentKind::Unknown => match schema_for(id) {
                Some(schema) => batch_payload(schema, message),
                None => {
                    tracing::warn!(agent = id, kind = ?agent.kind, "No field schema for agent, using best-effort payload");
                    best_effort_payload(message)
                }
            },
        };
        body.insert(WAIT_FLAG_KEY.into(), Value::Bool(self.wait_for_completion));
        Ok(Value::Object(body))
    }

    fn chat_payload(
        &self,
        id: &str,
        message: &str,
        url_params: Option<&UrlParams>,
    ) -> Map<String, Value> {
        let known = CHAT_OVERRIDES.iter().find(|o| o.id == id);
        let mut model = known.map_or(CHAT_DEFAULT_MODEL, |o| o.model).to_string();
        let mut temperature = known
            .map_or(CHAT_DEFAULT_TEMPERATURE, |o| o.temperature)
            .to_string();
        let mut tools = known.map_or(CHAT_DEFAULT_TOOLS, |o| o.tools).to_string();

        if let Some(params) = url_params {
            if let Some(m) = &params.model {
                model = m.clone();
            }
            if let Some(t) = &params.temperature {
                temperature = t.clone();
            }
            if let Some(t) = &params.tools {
                tools = t.clone();
            }
        }

        let mut body = Map::new();
        body.insert("temperature".into(), Value::String(temperature));
        body.insert("model".into(), Value::String(model));
        body.insert("tools".into(), Value::String(tools));
        body.insert(
            "messages".into(),
            json!([{ "role": "user", "content": message }]),
        );
        body
    }
}

fn batch_base(temperature: f64, maxlength: u32) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("temperature".into(), json!(temperature));
    body.insert("model".into(), json!(BATCH_DEFAULT_MODEL));
    body.insert("maxlength".into(), json!(maxlength));
    body.insert("language".into(), json!(BATCH_LANGUAGE));
    body
}

fn batch_payload(schema: &BatchSchema, message: &str) -> Map<String, Value> {
    let mut body = batch_base(schema.temperature, schema.maxlength);
    for (field, value) in schema.defaults {
        body.insert((*field).into(), json!(value));
    }
    body.insert(schema.message_field.into(), json!(message));
    body
}

fn best_effort_payload(message: &str) -> Map<String, Value> {
    let mut body = batch_base(BATCH_DEFAULT_TEMPERATURE, BATCH_DEFAULT_MAXLENGTH);
    for field in BEST_EFFORT_FIELDS {
        body.insert((*field).into(), json!(message));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::directory::KNOWN_AGENTS;

    fn reference(id: &str, kind: AgentKind) -> AgentReference {
        AgentReference {
            raw_name: id.into(),
            canonical_id: Some(id.into()),
            kind,
        }
    }

    #[test]
    fn test_chat_payload_ends_with_user_message() {
        let builder = PayloadBuilder::new();
        let chat_ids = KNOWN_AGENTS
            .iter()
            .filter(|a| a.kind == AgentKind::Chat)
            .map(|a| a.id)
            .chain(["9999"]);
        for id in chat_ids {
            let body = builder
                .build(&reference(id, AgentKind::Chat), "Olá mundo", None)
                .unwrap();
            let messages = body["messages"].as_array().unwrap();
            assert!(!messages.is_empty());
            let last = messages.last().unwrap();
            assert_eq!(last["role"], "user");
            assert_eq!(last["content"], "Olá mundo");
            assert_eq!(body[WAIT_FLAG_KEY], true);
        }
    }

    #[test]
    fn test_chat_overrides_and_url_params() {
        let builder = PayloadBuilder::new();
        let body = builder
            .build(&reference("3238", AgentKind::Chat), "oi", None)
            .unwrap();
        assert_eq!(body["model"], "claude-3-7-sonnet-latest");
        assert_eq!(body["temperature"], "0");
        assert_eq!(body["tools"], "internet");

        let params = UrlParams {
            model: Some("gpt-4o".into()),
            temperature: None,
            tools: Some("no-tools".into()),
        };
        let body = builder
            .build(&reference("3238", AgentKind::Chat), "oi", Some(&params))
            .unwrap();
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["temperature"], "0");
        assert_eq!(body["tools"], "no-tools");
    }

    #[test]
    fn test_batch_schemas_never_omit_required_fields() {
        let builder = PayloadBuilder::new();
        for schema in BATCH_SCHEMAS {
            let body = builder
                .build(&reference(schema.id, AgentKind::Batch), "conteúdo", None)
                .unwrap();
            for field in schema.required {
                let value = body.get(*field).and_then(Value::as_str).unwrap_or("");
                assert!(!value.is_empty(), "agent {} missing {}", schema.id, field);
            }
            assert_eq!(body[schema.message_field], "conteúdo");
        }
    }

    #[test]
    fn test_unknown_agent_uses_best_effort_fields() {
        let body = PayloadBuilder::new()
            .build(&reference("agente-x", AgentKind::Unknown), "oi", None)
            .unwrap();
        for field in BEST_EFFORT_FIELDS {
            assert_eq!(body[*field], "oi");
        }
        assert_eq!(body["language"], BATCH_LANGUAGE);
    }

    #[test]
    fn test_empty_message_is_validation_error() {
        let err = PayloadBuilder::new()
            .build(&reference("53", AgentKind::Batch), "   ", None)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn test_asynchronous_mode_clears_wait_flag() {
        let body = PayloadBuilder::new()
            .asynchronous()
            .build(&reference("67", AgentKind::Batch), "post", None)
            .unwrap();
        assert_eq!(body[WAIT_FLAG_KEY], false);
    }
}
