//! 会话监管：每轮输入一个取消令牌
//!
//! 每次处理用户输入前调用 begin_turn 换一个新 token；用户 Ctrl+C 时取消当前 token，
//! 正在轮询的执行会尽快以 TIMED_OUT 结束（远程任务本身不取消）。

use std::sync::Mutex;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// 会话级生命周期管理：当前轮次的取消令牌
#[derive(Debug)]
pub struct SessionSupervisor {
    current: Mutex<CancellationToken>,
}

impl SessionSupervisor {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(CancellationToken::new()),
        }
    }

    /// 开始新一轮：替换并返回新的 token（上一轮的取消状态不会泄漏到下一轮）
    pub fn begin_turn(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Ok(mut current) = self.current.lock() {
            *current = token.clone();
        }
        token
    }

    fn current_token(&self) -> CancellationToken {
        self.current
            .lock()
            .map(|t| t.clone())
            .unwrap_or_else(|_| CancellationToken::new())
    }

    /// 监听一次 Ctrl+C 并取消当前轮次的 token；调用方在本轮结束后 abort 返回的句柄
    pub fn spawn_interrupt_watcher(&self) -> JoinHandle<()> {
        let token = self.current_token();
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                tracing::info!("Received Ctrl+C, cancelling current command");
                token.cancel();
            }
        })
    }
}

impl Default for SessionSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_affects_only_current_turn() {
        let supervisor = SessionSupervisor::new();
        let first = supervisor.begin_turn();
        supervisor.current_token().cancel();
        assert!(first.is_cancelled());

        let second = supervisor.begin_turn();
        assert!(!second.is_cancelled());
        assert!(!supervisor.current_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_watcher_can_be_aborted_after_turn() {
        let supervisor = SessionSupervisor::new();
        let token = supervisor.begin_turn();
        let watcher = supervisor.spawn_interrupt_watcher();
        watcher.abort();
        assert!(watcher.await.unwrap_err().is_cancelled());
        assert!(!token.is_cancelled());
    }
}
