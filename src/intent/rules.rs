//! 带优先级的规则表
//!
//! 每条规则 = {名字, 正则, 指令类型, 优先级, 示例}。按优先级从小到大求值，第一条命中的规则胜出，
//! 命名捕获组成为指令参数。匹配不区分大小写，除非正则以 `^` 开头否则在全文任意位置查找，
//! 所以更具体的规则必须排在更宽泛的规则之前；每条规则自带的示例必须由它自己命中（见测试）。

use std::collections::BTreeMap;

use regex::Regex;

use super::command::{clean_value, CommandType};

/// 规则的静态描述
struct RuleDef {
    name: &'static str,
    intent: CommandType,
    priority: u16,
    pattern: &'static str,
    example: &'static str,
}

const RULE_DEFS: &[RuleDef] = &[
    RuleDef {
        name: "shorthand_execute",
        intent: CommandType::ExecutarAgente,
        priority: 10,
        pattern: r"^test_api_tess\s+executar\s+(?P<id>[\w-]+)\s+(?P<mensagem>.+)$",
        example: "test_api_tess executar 53 CRM para pequenas empresas",
    },
    RuleDef {
        name: "shorthand_list_chat",
        intent: CommandType::ListarAgentesPorTipo,
        priority: 11,
        pattern: r"^test_api_tess\s+(?:listar\s+)?(?P<tipo>chat)$",
        example: "test_api_tess chat",
    },
    RuleDef {
        name: "shorthand_list",
        intent: CommandType::ListarAgentes,
        priority: 12,
        pattern: r"^test_api_tess\s+listar$",
        example: "test_api_tess listar",
    },
    RuleDef {
        name: "execute_quoted",
        intent: CommandType::ExecutarAgente,
        priority: 20,
        pattern: r#"^executar\s+(?P<id>[\w-]+)\s+["'](?P<mensagem>.+)["']$"#,
        example: r#"executar 53 "CRM para pequenas empresas""#,
    },
    RuleDef {
        name: "execute_with_message",
        intent: CommandType::ExecutarAgente,
        priority: 21,
        // 句首可省略 agente/template/modelo，句中必须带上
        pattern: r"(?:^(?:executar|rodar|usar)\s+(?:o\s+)?(?:(?:agente|template|modelo)\s+)?|\b(?:executar|rodar|usar)\s+(?:o\s+)?(?:agente|template|modelo)\s+)(?:do\s+)?(?:(?:tess|agno|tessai)\s+)?(?P<id>[\w-]+)\s+com\s+(?:a\s+)?(?:mensagem|texto):?\s+(?P<mensagem>.+)",
        example: r#"executar agente-x com mensagem "oi""#,
    },
    RuleDef {
        name: "execute_without_message",
        intent: CommandType::ExecutarAgente,
        priority: 22,
        pattern: r"^(?:executar|rodar|usar)\s+(?:o\s+)?(?:agente|template|modelo)\s+(?:do\s+)?(?:(?:tess|agno|tessai)\s+)?(?P<id>[\w-]+)$",
        example: "executar agente do agno e-mail-de-venda-Sxtjz8",
    },
    RuleDef {
        name: "linkedin_post",
        intent: CommandType::TransformarPostLinkedin,
        priority: 30,
        pattern: r"\b(?:transformar|converter|criar)\s+(?:esse\s+|este\s+)?(?:texto|conteúdo|conteudo|mensagem)\s+em\s+(?:post|publicação|publicacao)\s+(?:para|do)\s+linkedin:?\s*(?P<texto>.+)",
        example: "transformar texto em post para linkedin: lançamos a versão 2.0",
    },
    RuleDef {
        name: "sales_email",
        intent: CommandType::CriarEmailVenda,
        priority: 31,
        pattern: r"\b(?:criar|gerar|escrever)\s+(?:um\s+)?(?:email|e-mail|mail)\s+de\s+venda\s+(?:para|sobre):?\s*(?P<produto>.+)",
        example: "criar email de venda para: CRM simples",
    },
    RuleDef {
        name: "email_title",
        intent: CommandType::GerarTituloEmail,
        priority: 32,
        pattern: r"\b(?:gerar|criar)\s+(?:um\s+)?(?:título|titulo|assunto)\s+(?:de\s+)?(?:email|e-mail)(?:\s+para\s+(?:o\s+)?(?:anúncio|anuncio))?(?:\s+(?:para|sobre|de))?:?\s*(?P<recurso>.+)",
        example: "gerar título de email para: integração com MCP",
    },
    RuleDef {
        name: "agent_details",
        intent: CommandType::ObterAgente,
        priority: 40,
        pattern: r"\b(?:(?:detalhes|informações|informacoes|info)\s+(?:do\s+)?|(?:obter|detalhar|descrever)\s+(?:o\s+)?)(?:agente|template)\s+(?P<id>[\w-]+)",
        example: "detalhes do agente 53",
    },
    RuleDef {
        name: "search_by_type_and_term",
        intent: CommandType::BuscarAgentesPorTipoETermo,
        priority: 50,
        pattern: r"\b(?:buscar|procurar|encontrar|pesquisar)\s+(?:agentes?|templates?|modelos?)\s+(?:do\s+)?(?:tipo\s+)?(?P<tipo>chat|text|completion)(?:\s+(?:do|da|no|na)\s+(?:agno|tess|tessai))?\s+(?:com|sobre|para|de|relacionados?\s+(?:a|com|ao)):?\s+(?P<termo>[\w\s-]+)",
        example: "buscar agentes tipo chat sobre marketing",
    },
    RuleDef {
        name: "search_by_type",
        intent: CommandType::BuscarAgentesPorTipo,
        priority: 51,
        pattern: r"\b(?:buscar|procurar|encontrar|pesquisar)\s+(?:agentes?|templates?|modelos?)\s+(?:do\s+)?(?:tipo\s+)?(?P<tipo>chat|text|completion)\b",
        example: "buscar agentes do tipo chat",
    },
    RuleDef {
        name: "search_by_term",
        intent: CommandType::BuscarAgentes,
        priority: 52,
        pattern: r"\b(?:buscar|procurar|encontrar|pesquisar)\s+(?:agentes?|templates?|modelos?)\s+(?:(?:do\s+)?(?:agno|tess|tessai)\s+)?(?:com|sobre|para|de|relacionados?\s+(?:a|com|ao)):?\s+(?P<termo>[\w\s-]+)",
        example: "buscar agentes agno para email",
    },
    RuleDef {
        name: "list_by_type_and_keyword",
        intent: CommandType::ListarAgentesPorTipoEKeyword,
        priority: 60,
        pattern: r"\b(?:listar|mostrar|exibir|ver)\s+(?:os\s+)?(?:agentes?|templates?|modelos?)\s+(?:do\s+)?(?:tipo\s+)?(?P<tipo>chat|text|completion)(?:\s+(?:do|da|no|na)\s+(?:agno|tess|tessai))?\s+(?:com|contendo|sobre|relacionados?\s+(?:a|com|ao))\s+(?P<keyword>[\w\s-]+)",
        example: "listar agentes tipo chat com marketing",
    },
    RuleDef {
        name: "list_by_keyword",
        intent: CommandType::ListarAgentesPorKeyword,
        priority: 61,
        pattern: r"\b(?:listar|mostrar|exibir|ver)\s+(?:os\s+)?(?:agentes?|templates?|modelos?)\s+(?:com|contendo|sobre|relacionados?\s+(?:a|com|ao))\s+(?P<keyword>[\w\s-]+)",
        example: "listar agentes contendo email",
    },
    RuleDef {
        name: "list_by_type",
        intent: CommandType::ListarAgentesPorTipo,
        priority: 62,
        pattern: r"\b(?:listar|mostrar|exibir|ver|filtrar)\s+(?:os\s+)?(?:agentes?|templates?|modelos?)\s+(?:do\s+)?(?:tipo\s+)?(?P<tipo>chat|text|completion)\b",
        example: "listar agentes tipo chat",
    },
    RuleDef {
        name: "help",
        intent: CommandType::MostrarAjuda,
        priority: 70,
        pattern: r"\b(?:mostrar|ver|listar|exibir)\s+(?:os\s+)?(?:comandos|opções|opcoes|ajuda)\b",
        example: "mostrar comandos",
    },
    RuleDef {
        name: "help_short",
        intent: CommandType::MostrarAjuda,
        priority: 71,
        pattern: r"^(?:ajuda|help|\?)$",
        example: "ajuda",
    },
    RuleDef {
        name: "model_usage",
        intent: CommandType::UsoModelos,
        priority: 72,
        pattern: r"^(?:modelos|uso\s+de\s+modelos|uso_modelos|estatísticas\s+de\s+modelos|estatisticas\s+de\s+modelos)$",
        example: "uso de modelos",
    },
    RuleDef {
        name: "list_all",
        intent: CommandType::ListarAgentes,
        priority: 80,
        pattern: r"^(?:listar|mostrar|exibir|ver)\s+(?:todos\s+)?(?:os\s+)?(?:agentes?|templates?|modelos?)(?:\s+(?:do|da|no|na)\s+(?:agno|tess|tessai))?$",
        example: "listar agentes do agno",
    },
    RuleDef {
        name: "keyword_shorthand",
        intent: CommandType::ListarAgentesPorKeyword,
        priority: 81,
        pattern: r"^(?:(?:listar|mostrar|exibir|ver)\s+)?(?:agentes?|templates?)\s+(?P<keyword>[\w\s-]{3,})$",
        example: "agentes marketing digital",
    },
];

/// 编译后的规则
#[derive(Debug)]
pub struct Rule {
    pub name: &'static str,
    pub intent: CommandType,
    pub priority: u16,
    pub example: &'static str,
    pattern: Regex,
}

/// 命中结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule: &'static str,
    pub intent: CommandType,
    pub params: BTreeMap<String, String>,
}

/// 按优先级排序的规则表
#[derive(Debug)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    /// 内置规则表
    pub fn standard() -> Result<Self, regex::Error> {
        let mut rules = RULE_DEFS
            .iter()
            .map(|def| {
                Ok(Rule {
                    name: def.name,
                    intent: def.intent,
                    priority: def.priority,
                    example: def.example,
                    pattern: Regex::new(&format!("(?i){}", def.pattern))?,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        rules.sort_by_key(|r| r.priority);
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// 第一条命中的规则；空捕获不进入参数
    pub fn first_match(&self, text: &str) -> Option<RuleMatch> {
        let text = text.trim();
        self.rules.iter().find_map(|rule| {
            let caps = rule.pattern.captures(text)?;
            let params = rule
                .pattern
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    let value = clean_value(caps.name(name)?.as_str());
                    (!value.is_empty()).then(|| (name.to_string(), value))
                })
                .collect();
            Some(RuleMatch {
                rule: rule.name,
                intent: rule.intent,
                params,
            })
        })
    }
}
