//! 模型使用统计
//!
//! 由网关在构造时持有（显式注入，而不是进程级单例），每次成功调用后对实际模型计数 +1，
//! 并记录最后一次使用的模型；展示层只读快照。

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// 每个模型的调用次数 + 最后使用的模型
#[derive(Debug, Default)]
pub struct ProviderUsageStats {
    inner: Mutex<UsageInner>,
}

#[derive(Debug, Default)]
struct UsageInner {
    counts: HashMap<String, u64>,
    last_model: Option<String>,
}

/// 只读快照（按模型名排序，便于展示）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub counts: BTreeMap<String, u64>,
    pub last_model_used: Option<String>,
}

impl UsageSnapshot {
    pub fn count(&self, model: &str) -> u64 {
        self.counts.get(model).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

impl ProviderUsageStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次成功调用
    pub fn record(&self, model: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            *inner.counts.entry(model.to_string()).or_insert(0) += 1;
            inner.last_model = Some(model.to_string());
        }
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        self.inner
            .lock()
            .map(|inner| UsageSnapshot {
                counts: inner.counts.iter().map(|(k, v)| (k.clone(), *v)).collect(),
                last_model_used: inner.last_model.clone(),
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_and_last_model() {
        let stats = ProviderUsageStats::new();
        stats.record("gpt-4o-mini");
        stats.record("deepseek-chat");
        stats.record("gpt-4o-mini");

        let snap = stats.snapshot();
        assert_eq!(snap.count("gpt-4o-mini"), 2);
        assert_eq!(snap.count("deepseek-chat"), 1);
        assert_eq!(snap.count("unknown"), 0);
        assert_eq!(snap.total(), 3);
        assert_eq!(snap.last_model_used.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn test_independent_instances() {
        let a = ProviderUsageStats::new();
        let b = ProviderUsageStats::new();
        a.record("m");
        assert_eq!(a.snapshot().count("m"), 1);
        assert_eq!(b.snapshot(), UsageSnapshot::default());
    }
}
