//! Agent 目录：把用户给出的 slug / 名称解析为远程 API 需要的数字 ID 与类型
//!
//! 解析顺序：
//! 1. 静态别名表（常用 slug -> id）
//! 2. 已经是纯数字则直接作为 canonical id
//! 3. 查询列表接口（第一页，page_size 有上限），按 slug 线性匹配，同时取得类型
//!
//! 都找不到时不报错，原样透传，远程 API 可能仍接受该名称。透传时 slug 为 `chat` 或以 `chat-`
//! 开头的按对话类处理，其余为 Unknown。

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::api::{AgentApi, AgentQuery};

/// Agent 类型：对话式 / 单次批处理式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Chat,
    Batch,
    Unknown,
}

impl AgentKind {
    /// 列表接口中的 type 字段：chat -> Chat，其它非空值（text / completion ...）-> Batch
    pub fn from_type(agent_type: &str) -> Self {
        match agent_type.trim().to_lowercase().as_str() {
            "" => AgentKind::Unknown,
            "chat" => AgentKind::Chat,
            _ => AgentKind::Batch,
        }
    }

    /// 透传名称的类型推断：chat / chat-* 视为对话类
    fn from_pass_through(name: &str) -> Self {
        let name = name.to_lowercase();
        if name == "chat" || name.starts_with("chat-") {
            AgentKind::Chat
        } else {
            AgentKind::Unknown
        }
    }
}

/// 一次执行中对某个 Agent 的引用；resolve 之后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReference {
    pub raw_name: String,
    pub canonical_id: Option<String>,
    pub kind: AgentKind,
}

impl AgentReference {
    fn resolved(raw_name: &str, canonical_id: impl Into<String>, kind: AgentKind) -> Self {
        Self {
            raw_name: raw_name.to_string(),
            canonical_id: Some(canonical_id.into()),
            kind,
        }
    }

    /// 发请求时使用的 ID（未解析时退回原始名称）
    pub fn target_id(&self) -> &str {
        self.canonical_id.as_deref().unwrap_or(&self.raw_name)
    }
}

/// 静态别名表中的一项
#[derive(Debug, Clone, Copy)]
pub struct KnownAgent {
    pub slug: &'static str,
    pub id: &'static str,
    pub kind: AgentKind,
}

pub const SALES_EMAIL_AGENT: &str = "53";
pub const FEATURE_TITLE_AGENT: &str = "52";
pub const LINKEDIN_POST_AGENT: &str = "67";

/// 常用 Agent 的 slug -> id
pub const KNOWN_AGENTS: &[KnownAgent] = &[
    KnownAgent { slug: "titulo-de-email-para-anuncio-de-novo-recurso-fDba8a", id: "52", kind: AgentKind::Batch },
    KnownAgent { slug: "e-mail-de-venda-Sxtjz8", id: "53", kind: AgentKind::Batch },
    KnownAgent { slug: "e-mail-de-solicitacao-de-review-pos-venda-ihvlWw", id: "55", kind: AgentKind::Batch },
    KnownAgent { slug: "palavras-chave-para-campanha-de-marca-96zlo7", id: "59", kind: AgentKind::Batch },
    KnownAgent { slug: "palavras-chave-para-campanha-de-produtosservicos-egK882", id: "60", kind: AgentKind::Batch },
    KnownAgent { slug: "transformar-texto-em-post-para-linkedin-mF37hV", id: "67", kind: AgentKind::Batch },
    KnownAgent { slug: "ideias-de-anuncios-para-o-youtube-ads-RVm1a8", id: "68", kind: AgentKind::Batch },
    KnownAgent { slug: "roteiro-para-anuncio-de-video-no-youtube-ads-9pdCVJ", id: "69", kind: AgentKind::Batch },
    KnownAgent { slug: "multi-chat-S7C0WU", id: "3176", kind: AgentKind::Chat },
    KnownAgent { slug: "professional-dev-ai", id: "3238", kind: AgentKind::Chat },
];

fn known_by_slug(slug: &str) -> Option<&'static KnownAgent> {
    KNOWN_AGENTS.iter().find(|a| a.slug == slug)
}

fn known_by_id(id: &str) -> Option<&'static KnownAgent> {
    KNOWN_AGENTS.iter().find(|a| a.id == id)
}

/// Agent 目录
pub struct AgentDirectory {
    api: Arc<dyn AgentApi>,
    page_size: u32,
}

impl AgentDirectory {
    pub fn new(api: Arc<dyn AgentApi>, page_size: u32) -> Self {
        Self { api, page_size }
    }

    /// 解析 Agent 引用；网络错误只记日志并降级为透传，从不向上传播
    pub async fn resolve(&self, raw_name: &str) -> AgentReference {
        let name = raw_name.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`');

        if let Some(known) = known_by_slug(name) {
            tracing::debug!(slug = name, id = known.id, "Resolved agent from alias table");
            return AgentReference::resolved(name, known.id, known.kind);
        }

        if !name.is_empty() && name.chars().all(|c| c.is_ascii_digit()) {
            let kind = known_by_id(name).map(|a| a.kind).unwrap_or(AgentKind::Unknown);
            return AgentReference::resolved(name, name, kind);
        }

        let query = AgentQuery::first_page(self.page_size);
        match self.api.list_agents(&query).await {
            Ok(page) => {
                if let Some(agent) = page.data.iter().find(|a| a.slug == name) {
                    tracing::info!(slug = name, id = %agent.id, agent_type = %agent.agent_type, "Resolved agent from listing");
                    return AgentReference::resolved(
                        name,
                        agent.id.clone(),
                        AgentKind::from_type(&agent.agent_type),
                    );
                }
                tracing::warn!(slug = name, "Agent not found in listing, passing name through");
            }
            Err(e) => {
                tracing::error!(slug = name, error = %e, "Agent listing failed, passing name through");
            }
        }

        AgentReference::resolved(name, name, AgentKind::from_pass_through(name))
    }
}
