//! 主备模型回退网关
//!
//! 先调用主提供方；任何失败（超时、API 错误、空响应）记 warn 后只切换一次到备用提供方，
//! 两者都失败时返回 ProviderUnavailable（携带两边的错误信息），不做更多重试。
//! 每次成功调用后按服务端回报的模型名计数。

use std::sync::Arc;

use async_trait::async_trait;

use super::{Completion, LlmClient, LlmError, ProviderUsageStats, UsageSnapshot};
use crate::core::PipelineError;
use crate::memory::Message;

/// 主备回退网关
pub struct ProviderGateway {
    primary: Arc<dyn LlmClient>,
    secondary: Option<Arc<dyn LlmClient>>,
    stats: Arc<ProviderUsageStats>,
}

impl ProviderGateway {
    pub fn new(
        primary: Arc<dyn LlmClient>,
        secondary: Option<Arc<dyn LlmClient>>,
        stats: Arc<ProviderUsageStats>,
    ) -> Self {
        Self {
            primary,
            secondary,
            stats,
        }
    }

    /// 生成回复：主 -> 备（至多一跳）
    pub async fn generate(&self, messages: &[Message]) -> Result<Completion, PipelineError> {
        let primary_err = match self.primary.complete(messages).await {
            Ok(completion) => return Ok(self.track(completion)),
            Err(e) => e,
        };

        let Some(secondary) = &self.secondary else {
            tracing::warn!(
                provider = self.primary.name(),
                error = %primary_err,
                "Primary provider failed and no secondary is configured"
            );
            return Err(PipelineError::ProviderUnavailable {
                primary: primary_err.to_string(),
                secondary: "not configured".to_string(),
            });
        };

        tracing::warn!(
            primary = self.primary.name(),
            secondary = secondary.name(),
            error = %primary_err,
            "Primary provider failed, falling back"
        );

        match secondary.complete(messages).await {
            Ok(completion) => Ok(self.track(completion)),
            Err(secondary_err) => {
                tracing::error!(error = %secondary_err, "Secondary provider failed too");
                Err(PipelineError::ProviderUnavailable {
                    primary: primary_err.to_string(),
                    secondary: secondary_err.to_string(),
                })
            }
        }
    }

    pub fn usage_stats(&self) -> UsageSnapshot {
        self.stats.snapshot()
    }

    fn track(&self, completion: Completion) -> Completion {
        self.stats.record(&completion.model);
        completion
    }
}

#[async_trait]
impl LlmClient for ProviderGateway {
    async fn complete(&self, messages: &[Message]) -> Result<Completion, LlmError> {
        self.generate(messages)
            .await
            .map_err(|e| LlmError::ApiError(e.to_string()))
    }

    fn name(&self) -> &str {
        "gateway"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct FailingClient {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for FailingClient {
        async fn complete(&self, _messages: &[Message]) -> Result<Completion, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::Timeout(60))
        }
    }

    struct FixedClient {
        model: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for FixedClient {
        async fn complete(&self, _messages: &[Message]) -> Result<Completion, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Completion::new("resposta", self.model))
        }
    }

    fn failing() -> Arc<FailingClient> {
        Arc::new(FailingClient {
            calls: AtomicUsize::new(0),
        })
    }

    fn fixed(model: &'static str) -> Arc<FixedClient> {
        Arc::new(FixedClient {
            model,
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_falls_back_to_secondary() {
        let primary = failing();
        let secondary = fixed("backup");
        let gateway = ProviderGateway::new(
            primary.clone(),
            Some(secondary.clone()),
            Arc::new(ProviderUsageStats::new()),
        );

        let completion = gateway.generate(&[Message::user("oi")]).await.unwrap();
        assert_eq!(completion.model, "backup");
        assert_eq!(gateway.usage_stats().count("backup"), 1);
        assert_eq!(gateway.usage_stats().last_model_used.as_deref(), Some("backup"));
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_primary_success_skips_secondary() {
        let secondary = fixed("backup");
        let gateway = ProviderGateway::new(
            fixed("main"),
            Some(secondary.clone()),
            Arc::new(ProviderUsageStats::new()),
        );

        gateway.generate(&[Message::user("oi")]).await.unwrap();
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
        assert_eq!(gateway.usage_stats().count("main"), 1);
    }

    #[tokio::test]
    async fn test_both_fail_single_hop() {
        let primary = failing();
        let secondary = failing();
        let gateway = ProviderGateway::new(
            primary.clone(),
            Some(secondary.clone()),
            Arc::new(ProviderUsageStats::new()),
        );

        let err = gateway.generate(&[Message::user("oi")]).await.unwrap_err();
        assert!(matches!(err, PipelineError::ProviderUnavailable { .. }));
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.usage_stats().total(), 0);
    }
}
