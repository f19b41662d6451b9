//! 管线错误类型
//!
//! 每个组件在自身边界捕获协作方（HTTP 客户端、LLM）的错误，并转换为 PipelineError 后再交给上层；
//! 面向用户的格式化层只看到这里的变体，不会看到原始网络错误。

use thiserror::Error;

/// 指令解释与远程执行过程中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// 缺少或为空的必填输入；不重试，立即返回
    #[error("Validation error: {0}")]
    Validation(String),

    /// 超时、连接重置等；仅提交阶段会以更长超时重试一次
    #[error("Network error: {0}")]
    TransientNetwork(String),

    /// 远程任务明确返回失败（终态）
    #[error("Remote execution failed: {0}")]
    RemoteExecution(String),

    /// LLM 兜底未能给出可解析的指令；调用方静默降级为普通聊天
    #[error("Command classification failed: {0}")]
    ClassificationAmbiguity(String),

    /// 主备两个模型提供方都失败
    #[error("All providers failed (primary: {primary}; secondary: {secondary})")]
    ProviderUnavailable { primary: String, secondary: String },
}

impl PipelineError {
    /// 是否允许以延长的超时重试（只有网络类错误）
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::TransientNetwork(_))
    }

    /// 渲染为单行、带前缀、可直接展示给用户的错误信息
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Validation(msg) => format!("❌ Entrada inválida: {msg}"),
            PipelineError::TransientNetwork(msg) => format!("❌ Erro de rede: {msg}"),
            PipelineError::RemoteExecution(msg) => format!("❌ Falha na execução do agente: {msg}"),
            PipelineError::ClassificationAmbiguity(msg) => {
                format!("⚠️ Não foi possível interpretar o comando: {msg}")
            }
            PipelineError::ProviderUnavailable { primary, secondary } => format!(
                "❌ Nenhum provedor de IA disponível (primário: {primary}; secundário: {secondary})"
            ),
        }
    }
}
