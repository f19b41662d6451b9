//! LLM 兜底分类：构造分类提示，并从模型的自由文本回复中提取 JSON
//!
//! 回复可以是 ```json 代码块，也可以是裸的 `{...}`；键名接受英文与葡萄牙语两套写法。

use std::collections::BTreeMap;

use serde_json::Value;

use super::command::{clean_value, CommandType};
use crate::core::error::PipelineError;
use crate::memory::Message;

const SYSTEM_PROMPT: &str =
    "Você é um assistente especializado em interpretar comandos para um sistema de agentes de IA. \
     Responda apenas com JSON.";

/// 构造分类提示（system + user）
pub fn classification_messages(text: &str) -> Vec<Message> {
    let intents = CommandType::ALL
        .iter()
        .map(|c| format!("- {}: {}", c.as_str(), c.description()))
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!(
        r#"Analise a mensagem do usuário e determine se ela contém um comando para o sistema de agentes.
Mensagem: "{text}"

Tipos de comando suportados (use exatamente estes nomes):
{intents}

Retorne a resposta no formato JSON:
```json
{{"is_command": true, "command": "nome_do_comando", "params": {{"param": "valor"}}}}
```

Para "executar_agente" os parâmetros são {{"id": "id_ou_slug_do_agente", "mensagem": "texto"}}.
Se não for um comando, retorne {{"is_command": false}}."#
    );

    vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)]
}

/// 分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: CommandType,
    pub params: BTreeMap<String, String>,
}

/// 解析模型回复
///
/// - `Ok(None)`：模型明确表示不是指令
/// - `Err(ClassificationAmbiguity)`：找不到 JSON、JSON 非法或指令名不在集合内
pub fn parse_reply(reply: &str) -> Result<Option<Classification>, PipelineError> {
    let json_text = extract_json(reply).ok_or_else(|| {
        PipelineError::ClassificationAmbiguity("no JSON object in model reply".to_string())
    })?;
    let value: Value = serde_json::from_str(json_text)
        .map_err(|e| PipelineError::ClassificationAmbiguity(format!("invalid JSON: {e}")))?;
    let object = value.as_object().ok_or_else(|| {
        PipelineError::ClassificationAmbiguity("JSON reply is not an object".to_string())
    })?;

    let command_name = ["command", "tipo_comando"]
        .iter()
        .find_map(|k| object.get(*k))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let is_command = ["is_command", "é_comando"]
        .iter()
        .find_map(|k| object.get(*k))
        .map(truthy)
        .unwrap_or(command_name.is_some());

    if !is_command {
        return Ok(None);
    }

    let name = command_name.ok_or_else(|| {
        PipelineError::ClassificationAmbiguity("command flagged but no command name".to_string())
    })?;
    let kind = CommandType::from_name(name).ok_or_else(|| {
        PipelineError::ClassificationAmbiguity(format!("unknown command '{name}'"))
    })?;

    let mut params = BTreeMap::new();
    if let Some(raw) = ["params", "parametros"]
        .iter()
        .find_map(|k| object.get(*k))
        .and_then(Value::as_object)
    {
        for (key, value) in raw {
            let text = match value {
                Value::String(s) => clean_value(s),
                Value::Null => continue,
                other => other.to_string(),
            };
            if text.is_empty() {
                continue;
            }
            let key = if key == "agent_id" { "id" } else { key.as_str() };
            params.insert(key.to_string(), text);
        }
    }

    Ok(Some(Classification { kind, params }))
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "sim" | "yes"),
        _ => false,
    }
}

/// ```json 代码块优先；否则取第一个 `{` 到最后一个 `}`
fn extract_json(reply: &str) -> Option<&str> {
    if let Some(start) = reply.find("```json") {
        let body = &reply[start + "```json".len()..];
        if let Some(end) = body.find("```") {
            let block = body[..end].trim();
            if !block.is_empty() {
                return Some(block);
            }
        }
    }
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_block_with_portuguese_keys() {
        let reply = "Claro!\n```json\n{\"é_comando\": true, \"tipo_comando\": \"executar_agente\", \
                     \"parametros\": {\"agent_id\": \"e-mail-de-venda-Sxtjz8\", \"mensagem\": \"CRM\"}}\n```";
        let c = parse_reply(reply).unwrap().unwrap();
        assert_eq!(c.kind, CommandType::ExecutarAgente);
        assert_eq!(c.params.get("id").map(String::as_str), Some("e-mail-de-venda-Sxtjz8"));
        assert_eq!(c.params.get("mensagem").map(String::as_str), Some("CRM"));
    }

    #[test]
    fn test_bare_object_with_english_keys() {
        let reply = r#"Resultado: {"is_command": true, "command": "listar_agentes_por_tipo", "params": {"tipo": "chat"}} fim"#;
        let c = parse_reply(reply).unwrap().unwrap();
        assert_eq!(c.kind, CommandType::ListarAgentesPorTipo);
        assert_eq!(c.params.get("tipo").map(String::as_str), Some("chat"));
    }

    #[test]
    fn test_not_a_command() {
        assert_eq!(parse_reply(r#"{"is_command": false}"#).unwrap(), None);
        assert_eq!(parse_reply(r#"{"é_comando": "false"}"#).unwrap(), None);
    }

    #[test]
    fn test_malformed_replies_are_ambiguous() {
        for reply in [
            "não sei",
            "{ is_command: true, command: listar }",
            r#"{"is_command": true}"#,
            r#"{"is_command": true, "command": "buscar_arquivos"}"#,
            "} texto {",
        ] {
            let err = parse_reply(reply).unwrap_err();
            assert!(
                matches!(err, PipelineError::ClassificationAmbiguity(_)),
                "reply {reply:?}"
            );
        }
    }

    #[test]
    fn test_prompt_lists_every_intent() {
        let messages = classification_messages("quero ver os agentes de chat");
        let prompt = &messages[1].content;
        for kind in CommandType::ALL {
            assert!(prompt.contains(kind.as_str()));
        }
        assert!(prompt.contains("quero ver os agentes de chat"));
    }
}
