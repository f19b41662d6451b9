//! 意图解析：仪表盘 URL -> 规则表 -> LLM 兜底
//!
//! LLM 兜底的任何失败（调用出错、回复无法解析、模型说不是指令）都返回 None，
//! 调用方把输入当普通聊天处理，分类层不可用时系统仍可聊天。

use std::sync::Arc;

use super::classifier::{classification_messages, parse_reply};
use super::command::{Command, CommandOrigin, CommandType};
use super::rules::RuleTable;
use crate::agents::dashboard_url::parse_dashboard_url;
use crate::llm::LlmClient;

/// 意图解析器
pub struct IntentResolver {
    rules: RuleTable,
    dashboard_host: String,
    classifier: Option<Arc<dyn LlmClient>>,
    /// 少于该词数的输入不送 LLM 分类
    min_tokens: usize,
}

impl IntentResolver {
    pub fn new(rules: RuleTable, dashboard_host: impl Into<String>) -> Self {
        Self {
            rules,
            dashboard_host: dashboard_host.into(),
            classifier: None,
            min_tokens: 2,
        }
    }

    /// 启用 LLM 兜底分类
    pub fn with_classifier(mut self, llm: Arc<dyn LlmClient>, min_tokens: usize) -> Self {
        self.classifier = Some(llm);
        self.min_tokens = min_tokens;
        self
    }

    /// 解析一行输入；None 表示普通聊天
    pub async fn detect(&self, text: &str) -> Option<Command> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        if let Some(link) = parse_dashboard_url(text, &self.dashboard_host) {
            let mut command = Command::new(CommandType::ExecutarAgente, text, CommandOrigin::DashboardUrl)
                .with_param("id", link.slug)
                .with_param("mensagem", link.message);
            let overrides = [
                ("model", link.params.model),
                ("temperature", link.params.temperature),
                ("tools", link.params.tools),
            ];
            for (key, value) in overrides {
                if let Some(value) = value {
                    command = command.with_param(key, value);
                }
            }
            tracing::info!(command = %command.kind, "Detected command from dashboard URL");
            return Some(command);
        }

        if let Some(hit) = self.rules.first_match(text) {
            tracing::info!(command = %hit.intent, rule = hit.rule, "Detected command via rule table");
            return Some(Command {
                kind: hit.intent,
                params: hit.params,
                source_text: text.to_string(),
                origin: CommandOrigin::Rule(hit.rule),
            });
        }

        self.classify(text).await
    }

    async fn classify(&self, text: &str) -> Option<Command> {
        let llm = self.classifier.as_ref()?;
        if text.split_whitespace().count() < self.min_tokens {
            return None;
        }

        let reply = match llm.complete(&classification_messages(text)).await {
            Ok(completion) => completion.content,
            Err(e) => {
                tracing::error!(error = %e, "Command classifier unavailable, treating input as chat");
                return None;
            }
        };

        match parse_reply(&reply) {
            Ok(Some(classification)) => {
                tracing::info!(command = %classification.kind, "Detected command via classifier");
                Some(Command {
                    kind: classification.kind,
                    params: classification.params,
                    source_text: text.to_string(),
                    origin: CommandOrigin::Classifier,
                })
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Classifier reply not usable, treating input as chat");
                None
            }
        }
    }
}
