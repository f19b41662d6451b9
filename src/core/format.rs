//! 面向用户的文本渲染（葡萄牙语）

use crate::agents::{AgentDetails, AgentReference, AgentSummary, ExecutionOutcome, ExecutionState};
use crate::llm::UsageSnapshot;

/// 列表最多显示的条目数
pub const MAX_LISTED: usize = 30;

pub fn render_agent_list(title: &str, agents: &[AgentSummary]) -> String {
    if agents.is_empty() {
        return format!("🔍 {title}\n\nNenhum agente encontrado.");
    }

    let mut out = format!("📋 {title} ({} encontrados)\n", agents.len());
    for (i, agent) in agents.iter().take(MAX_LISTED).enumerate() {
        out.push_str(&format!(
            "\n{}. {} [{}] (id: {}, slug: {})",
            i + 1,
            agent.title,
            if agent.agent_type.is_empty() { "?" } else { &agent.agent_type },
            agent.id,
            agent.slug
        ));
        let description = agent.description.trim();
        if !description.is_empty() {
            let short: String = description.chars().take(120).collect();
            let ellipsis = if description.chars().count() > 120 { "…" } else { "" };
            out.push_str(&format!("\n   {short}{ellipsis}"));
        }
    }
    if agents.len() > MAX_LISTED {
        out.push_str(&format!("\n\n... e mais {}", agents.len() - MAX_LISTED));
    }
    out
}

pub fn render_agent_details(details: &AgentDetails) -> String {
    let agent = &details.summary;
    let mut out = format!(
        "🤖 {}\nID: {}\nSlug: {}\nTipo: {}",
        agent.title, agent.id, agent.slug, agent.agent_type
    );
    if !agent.description.trim().is_empty() {
        out.push_str(&format!("\nDescrição: {}", agent.description.trim()));
    }
    if !details.questions.is_empty() {
        out.push_str("\n\nCampos:");
        for q in &details.questions {
            let marker = if q.required { " (obrigatório)" } else { "" };
            match q.description.as_deref().filter(|d| !d.trim().is_empty()) {
                Some(desc) => out.push_str(&format!("\n- {}{marker}: {desc}", q.name)),
                None => out.push_str(&format!("\n- {}{marker}", q.name)),
            }
        }
    }
    out
}

pub fn render_outcome(agent: &AgentReference, outcome: &ExecutionOutcome) -> String {
    let name = &agent.raw_name;
    match outcome.state() {
        ExecutionState::Succeeded => match outcome.output() {
            Some(output) => format!("✅ Resultado do agente {name}:\n\n{output}"),
            None => match outcome.execution_id() {
                Some(id) => format!(
                    "✅ Execução do agente {name} iniciada (execução {id}). O resultado ficará disponível no painel."
                ),
                None => format!("✅ Agente {name} executado, mas não retornou conteúdo."),
            },
        },
        ExecutionState::Failed => format!(
            "❌ Falha na execução do agente {name}: {}",
            outcome.error().unwrap_or("erro desconhecido")
        ),
        ExecutionState::TimedOut => format!(
            "⏱️ Tempo esgotado aguardando o agente {name}: {}",
            outcome.error().unwrap_or("sem resposta")
        ),
    }
}

pub fn render_usage(snapshot: &UsageSnapshot) -> String {
    if snapshot.total() == 0 {
        return "📊 Nenhum modelo foi utilizado nesta sessão.".to_string();
    }
    let mut out = format!("📊 Uso de modelos ({} chamadas)\n", snapshot.total());
    for (model, count) in &snapshot.counts {
        out.push_str(&format!("\n- {model}: {count}"));
    }
    if let Some(last) = &snapshot.last_model_used {
        out.push_str(&format!("\n\nÚltimo modelo usado: {last}"));
    }
    out
}

pub fn help_text() -> &'static str {
    "📚 Comandos disponíveis:

- listar agentes | listar agentes tipo chat | listar agentes contendo <palavras>
- listar agentes tipo <tipo> com <palavras>
- buscar agentes para <termo> | buscar agentes tipo <tipo> sobre <termo>
- detalhes do agente <id>
- executar <id> \"mensagem\" | executar agente <id> com mensagem <texto>
- transformar texto em post para linkedin: <texto>
- criar email de venda para: <produto>
- gerar título de email para: <recurso>
- @https://<painel>/.../<slug>?model=...&temperature=...&tools=...
- uso de modelos
- test_api_tess listar | chat | executar <id> <mensagem>

Digite 'limpar' para apagar o histórico ou 'sair' para encerrar."
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::agents::AgentKind;

    fn summary(i: usize) -> AgentSummary {
        AgentSummary {
            id: i.to_string(),
            slug: format!("agente-{i}"),
            title: format!("Agente {i}"),
            description: String::new(),
            agent_type: "text".into(),
        }
    }

    #[test]
    fn test_list_is_capped() {
        let agents: Vec<_> = (0..35).map(summary).collect();
        let out = render_agent_list("Agentes", &agents);
        assert!(out.contains("30. Agente 29"));
        assert!(!out.contains("Agente 30 ["));
        assert!(out.ends_with("... e mais 5"));
    }

    #[test]
    fn test_outcome_rendering() {
        let agent = AgentReference {
            raw_name: "e-mail-de-venda-Sxtjz8".into(),
            canonical_id: Some("53".into()),
            kind: AgentKind::Batch,
        };
        let ok = ExecutionOutcome::succeeded(Some("Olá!".into()), None);
        assert!(render_outcome(&agent, &ok).contains("Olá!"));

        let pending = ExecutionOutcome::succeeded(None, Some(json!({"responses": [{"id": 5}]})));
        assert!(render_outcome(&agent, &pending).contains("execução 5"));

        let failed = ExecutionOutcome::failed("HTTP 422: missing required fields: texto", None);
        let line = render_outcome(&agent, &failed);
        assert!(line.starts_with("❌") && !line.contains('\n'));
    }
}
