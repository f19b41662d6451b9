//! 指令类型与结构化指令

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 封闭的指令集合；序列化名是稳定标识（规则表、LLM 分类提示与日志都使用它）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    /// 按词条搜索 {termo}
    BuscarAgentes,
    /// {tipo}
    BuscarAgentesPorTipo,
    /// {tipo, termo}
    BuscarAgentesPorTipoETermo,
    ListarAgentes,
    /// {tipo}
    ListarAgentesPorTipo,
    /// {keyword}
    ListarAgentesPorKeyword,
    /// {tipo, keyword}
    ListarAgentesPorTipoEKeyword,
    /// {id, mensagem}
    ExecutarAgente,
    /// {id}
    ObterAgente,
    /// {texto}
    TransformarPostLinkedin,
    /// {produto}
    CriarEmailVenda,
    /// {recurso}
    GerarTituloEmail,
    MostrarAjuda,
    UsoModelos,
}

impl CommandType {
    pub const ALL: [CommandType; 14] = [
        CommandType::BuscarAgentes,
        CommandType::BuscarAgentesPorTipo,
        CommandType::BuscarAgentesPorTipoETermo,
        CommandType::ListarAgentes,
        CommandType::ListarAgentesPorTipo,
        CommandType::ListarAgentesPorKeyword,
        CommandType::ListarAgentesPorTipoEKeyword,
        CommandType::ExecutarAgente,
        CommandType::ObterAgente,
        CommandType::TransformarPostLinkedin,
        CommandType::CriarEmailVenda,
        CommandType::GerarTituloEmail,
        CommandType::MostrarAjuda,
        CommandType::UsoModelos,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::BuscarAgentes => "buscar_agentes",
            CommandType::BuscarAgentesPorTipo => "buscar_agentes_por_tipo",
            CommandType::BuscarAgentesPorTipoETermo => "buscar_agentes_por_tipo_e_termo",
            CommandType::ListarAgentes => "listar_agentes",
            CommandType::ListarAgentesPorTipo => "listar_agentes_por_tipo",
            CommandType::ListarAgentesPorKeyword => "listar_agentes_por_keyword",
            CommandType::ListarAgentesPorTipoEKeyword => "listar_agentes_por_tipo_e_keyword",
            CommandType::ExecutarAgente => "executar_agente",
            CommandType::ObterAgente => "obter_agente",
            CommandType::TransformarPostLinkedin => "transformar_post_linkedin",
            CommandType::CriarEmailVenda => "criar_email_venda",
            CommandType::GerarTituloEmail => "gerar_titulo_email",
            CommandType::MostrarAjuda => "mostrar_ajuda",
            CommandType::UsoModelos => "uso_modelos",
        }
    }

    /// 按序列化名查找（大小写不敏感）
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// LLM 分类提示中的一句话说明（葡萄牙语，与用户语言一致）
    pub fn description(&self) -> &'static str {
        match self {
            CommandType::BuscarAgentes => "buscar agentes por um termo {termo}",
            CommandType::BuscarAgentesPorTipo => "buscar agentes de um tipo {tipo}: chat, text ou completion",
            CommandType::BuscarAgentesPorTipoETermo => "buscar agentes de um tipo com um termo {tipo, termo}",
            CommandType::ListarAgentes => "listar todos os agentes disponíveis",
            CommandType::ListarAgentesPorTipo => "listar agentes de um tipo {tipo}",
            CommandType::ListarAgentesPorKeyword => "listar agentes contendo palavras-chave {keyword}",
            CommandType::ListarAgentesPorTipoEKeyword => "listar agentes de um tipo contendo palavras-chave {tipo, keyword}",
            CommandType::ExecutarAgente => "executar um agente com uma mensagem {id, mensagem}",
            CommandType::ObterAgente => "obter detalhes de um agente {id}",
            CommandType::TransformarPostLinkedin => "transformar um texto em post para LinkedIn {texto}",
            CommandType::CriarEmailVenda => "criar um e-mail de venda para um produto {produto}",
            CommandType::GerarTituloEmail => "gerar título de e-mail para anúncio de recurso {recurso}",
            CommandType::MostrarAjuda => "mostrar os comandos disponíveis",
            CommandType::UsoModelos => "mostrar estatísticas de uso dos modelos",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 指令来源：规则表（带规则名）、仪表盘 URL 或 LLM 分类
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOrigin {
    Rule(&'static str),
    DashboardUrl,
    Classifier,
}

/// 从一行输入解析出的指令；被分发一次后即丢弃
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandType,
    pub params: BTreeMap<String, String>,
    pub source_text: String,
    pub origin: CommandOrigin,
}

impl Command {
    pub fn new(kind: CommandType, source_text: impl Into<String>, origin: CommandOrigin) -> Self {
        Self {
            kind,
            params: BTreeMap::new(),
            source_text: source_text.into(),
            origin,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// 取非空参数
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn is_from_url(&self) -> bool {
        self.origin == CommandOrigin::DashboardUrl
    }
}

/// 去掉首尾空白与引号
pub fn clean_value(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '“' | '”' | '`'))
        .trim()
        .to_string()
}
