//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `RELAY__*` 覆盖（双下划线表示嵌套，如 `RELAY__AGENTS__BASE_URL=...`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub agents: AgentsSection,
    pub intent: IntentSection,
}

/// [app] 段：应用名、聊天历史保留轮数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    pub max_context_turns: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            max_context_turns: 20,
        }
    }
}

/// [llm] 段：主提供方；[llm.secondary] 为备用提供方
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    #[serde(flatten)]
    pub primary: ProviderSection,
    pub secondary: ProviderSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            primary: ProviderSection::default(),
            secondary: ProviderSection {
                provider: "deepseek".to_string(),
                model: "deepseek-chat".to_string(),
                ..ProviderSection::default()
            },
        }
    }
}

/// 单个 OpenAI 兼容提供方
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    /// openai / arcee / deepseek / mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            temperature: 0.7,
            max_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

/// [agents] 段：远程 Agent API 端点、超时与轮询参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentsSection {
    pub base_url: String,
    /// 未设置时读取环境变量 TESS_API_KEY
    pub api_key: Option<String>,
    pub list_page_size: u32,
    pub list_timeout_secs: u64,
    pub submit_timeout_secs: u64,
    /// 首次提交因超时失败后唯一一次重试使用的超时
    pub retry_timeout_secs: u64,
    /// 仪表盘 URL 的主机名（用于识别 @https://<host>/... 快捷输入）
    pub dashboard_host: String,
    /// false 时提交后立即返回执行 ID，不轮询
    pub wait_for_completion: bool,
    pub polling: PollingSection,
}

impl Default for AgentsSection {
    fn default() -> Self {
        Self {
            base_url: "https://tess.pareto.io/api".to_string(),
            api_key: None,
            list_page_size: 50,
            list_timeout_secs: 30,
            submit_timeout_secs: 60,
            retry_timeout_secs: 120,
            dashboard_host: "agno.pareto.io".to_string(),
            wait_for_completion: true,
            polling: PollingSection::default(),
        }
    }
}

impl AgentsSection {
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("TESS_API_KEY").ok())
    }
}

/// [agents.polling] 段：固定间隔、有限次数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingSection {
    pub interval_secs: u64,
    pub max_attempts: u32,
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            max_attempts: 12,
        }
    }
}

impl PollingSection {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// [intent] 段：LLM 兜底开关与最短词数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntentSection {
    pub llm_fallback: bool,
    pub min_tokens: usize,
}

impl Default for IntentSection {
    fn default() -> Self {
        Self {
            llm_fallback: true,
            min_tokens: 2,
        }
    }
}

/// 从 config 目录加载配置，环境变量 RELAY__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 RELAY__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("RELAY")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
