//! 执行编排器：提交 -> 解读即时响应 -> 有界轮询 -> 终态
//!
//! 状态机：Built -> Submitted -> {Succeeded, Failed, Polling} -> {Succeeded, Failed, TimedOut}
//!
//! - 提交超时只在失败原因恰好是超时时，以更长的超时重试一次
//! - 轮询固定间隔、有限次数；等待与状态查询都与取消令牌竞争，取消后返回 TimedOut
//! - 单次状态查询最长一个轮询间隔，超时计为一次失败的尝试
//! - 任何协作方错误都在此处转为 ExecutionOutcome，不会向调用方抛出

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::api::{AgentApi, ApiError};
use super::directory::{AgentKind, AgentReference};
use super::outcome::{describe_http_failure, failure_detail, value_as_id, ExecutionOutcome};
use crate::config::AgentsSection;

/// 轮询间隔的等待方式；测试中替换为立即返回的实现
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// 真实时钟
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// 一次执行请求；由调用方构建后交给编排器独占使用
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub agent: AgentReference,
    pub payload: Value,
    pub wait_for_completion: bool,
    pub timeout_seconds: u64,
}

/// 超时与轮询参数
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub retry_timeout: Duration,
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl OrchestratorSettings {
    pub fn from_config(cfg: &AgentsSection) -> Self {
        Self {
            retry_timeout: Duration::from_secs(cfg.retry_timeout_secs),
            poll_interval: cfg.polling.interval(),
            max_attempts: cfg.polling.max_attempts,
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&AgentsSection::default())
    }
}

enum Phase {
    Built,
    Submitted(Value),
    Polling { execution_id: String, attempt: u32 },
    Done(ExecutionOutcome),
}

pub struct ExecutionOrchestrator {
    api: Arc<dyn AgentApi>,
    sleeper: Arc<dyn Sleeper>,
    settings: OrchestratorSettings,
}

impl ExecutionOrchestrator {
    pub fn new(api: Arc<dyn AgentApi>, settings: OrchestratorSettings) -> Self {
        Self {
            api,
            sleeper: Arc::new(TokioSleeper),
            settings,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// 驱动状态机直到终态；取消令牌触发时返回 TimedOut（远程任务本身不会被取消）
    pub async fn execute(
        &self,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> ExecutionOutcome {
        let agent_id = request.agent.target_id().to_string();
        let mut phase = Phase::Built;

        loop {
            phase = match phase {
                Phase::Built => {
                    tracing::info!(agent = %agent_id, wait = request.wait_for_completion, "Submitting agent execution");
                    tracing::debug!(payload = %request.payload, "Execution payload");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Phase::Done(interrupted()),
                        submitted = self.submit(&agent_id, request) => match submitted {
                            Ok(response) => Phase::Submitted(response),
                            Err(outcome) => Phase::Done(outcome),
                        },
                    }
                }
                Phase::Submitted(response) => self.interpret_immediate(request, response),
                Phase::Polling {
                    execution_id,
                    attempt,
                } => {
                    if attempt >= self.settings.max_attempts {
                        tracing::warn!(agent = %agent_id, execution_id = %execution_id, attempts = attempt, "Polling attempts exhausted");
                        Phase::Done(ExecutionOutcome::timed_out(format!(
                            "execution {execution_id} still pending after {attempt} status checks"
                        )))
                    } else {
                        let log_id = execution_id.clone();
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => {
                                tracing::warn!(agent = %agent_id, execution_id = %log_id, "Polling interrupted by user");
                                Phase::Done(interrupted())
                            }
                            next = self.wait_and_poll(&agent_id, execution_id, attempt + 1) => next,
                        }
                    }
                }
                Phase::Done(outcome) => {
                    tracing::info!(agent = %agent_id, state = outcome.state().as_str(), "Execution finished");
                    return outcome;
                }
            };
        }
    }

    /// POST 提交；仅超时触发一次延长超时的重试（异步模式只提交一次）
    async fn submit(
        &self,
        agent_id: &str,
        request: &ExecutionRequest,
    ) -> Result<Value, ExecutionOutcome> {
        let first_timeout = Duration::from_secs(request.timeout_seconds);
        let result = match self
            .api
            .execute(agent_id, &request.payload, first_timeout)
            .await
        {
            Err(e) if e.is_timeout() && request.wait_for_completion => {
                tracing::warn!(
                    agent = %agent_id,
                    timeout_secs = self.settings.retry_timeout.as_secs(),
                    "Submission timed out, retrying once with extended timeout"
                );
                self.api
                    .execute(agent_id, &request.payload, self.settings.retry_timeout)
                    .await
            }
            other => other,
        };
        result.map_err(|e| submit_failure(agent_id, e))
    }

    fn interpret_immediate(&self, request: &ExecutionRequest, response: Value) -> Phase {
        if !response.is_object() {
            return Phase::Done(ExecutionOutcome::failed(
                "unexpected response shape from execute endpoint",
                Some(response),
            ));
        }

        if let Some(output) = response.get("output").and_then(output_text) {
            return Phase::Done(ExecutionOutcome::succeeded(Some(output), Some(response)));
        }

        if let Some(first) = response.pointer("/responses/0") {
            let status = status_of(first);
            if status == "failed" {
                let detail = failure_detail(first)
                    .unwrap_or_else(|| "remote job reported failure".to_string());
                return Phase::Done(ExecutionOutcome::failed(detail, Some(response)));
            }

            let output = first.get("output").and_then(output_text);
            let chat = request.agent.kind == AgentKind::Chat;
            if let Some(output) = output {
                if status == "succeeded" || status == "completed" || chat {
                    return Phase::Done(ExecutionOutcome::succeeded(Some(output), Some(response)));
                }
            }

            if let Some(execution_id) = first.get("id").and_then(value_as_id) {
                return self.pending(request, execution_id, response);
            }
        }

        if status_of(&response) == "failed" || response.get("error").is_some() {
            let detail = failure_detail(&response)
                .unwrap_or_else(|| "remote job reported failure".to_string());
            return Phase::Done(ExecutionOutcome::failed(detail, Some(response)));
        }

        if let Some(execution_id) = response.get("id").and_then(value_as_id) {
            return self.pending(request, execution_id, response);
        }

        Phase::Done(ExecutionOutcome::failed(
            "unexpected response shape from execute endpoint",
            Some(response),
        ))
    }

    fn pending(&self, request: &ExecutionRequest, execution_id: String, response: Value) -> Phase {
        if !request.wait_for_completion {
            tracing::info!(execution_id = %execution_id, "Asynchronous submission accepted");
            return Phase::Done(ExecutionOutcome::succeeded(None, Some(response)));
        }
        tracing::info!(execution_id = %execution_id, "Execution pending, entering polling");
        Phase::Polling {
            execution_id,
            attempt: 0,
        }
    }

    /// 等待一个间隔后查询一次状态；单次查询最长也只占用一个轮询间隔
    async fn wait_and_poll(&self, agent_id: &str, execution_id: String, attempt: u32) -> Phase {
        self.sleeper.sleep(self.settings.poll_interval).await;
        let status = tokio::time::timeout(
            self.settings.poll_interval,
            self.api.execution_status(agent_id, &execution_id),
        )
        .await
        .unwrap_or(Err(ApiError::Timeout));
        self.interpret_poll(execution_id, attempt, status)
    }

    fn interpret_poll(
        &self,
        execution_id: String,
        attempt: u32,
        status: Result<Value, ApiError>,
    ) -> Phase {
        match status {
            Ok(body) => {
                let status = status_of(&body);
                match status.as_str() {
                    "completed" | "succeeded" => {
                        let output = body.get("output").and_then(output_text);
                        Phase::Done(ExecutionOutcome::succeeded(output, Some(body)))
                    }
                    "failed" => {
                        let detail = failure_detail(&body)
                            .unwrap_or_else(|| "remote job reported failure".to_string());
                        Phase::Done(ExecutionOutcome::failed(detail, Some(body)))
                    }
                    _ => {
                        tracing::info!(execution_id = %execution_id, attempt, status = %status, "Execution still pending");
                        Phase::Polling {
                            execution_id,
                            attempt,
                        }
                    }
                }
            }
            Err(e @ (ApiError::Timeout | ApiError::Transport(_))) => {
                tracing::warn!(execution_id = %execution_id, attempt, error = %e, "Status check failed, will retry");
                Phase::Polling {
                    execution_id,
                    attempt,
                }
            }
            Err(e) => Phase::Done(api_failure(e)),
        }
    }
}

fn interrupted() -> ExecutionOutcome {
    ExecutionOutcome::timed_out("wait interrupted by user; the remote job was not cancelled")
}

fn submit_failure(agent_id: &str, e: ApiError) -> ExecutionOutcome {
    tracing::error!(agent = %agent_id, error = %e, "Submission failed");
    match e {
        ApiError::Timeout => ExecutionOutcome::failed("submission timed out twice", None),
        other => api_failure(other),
    }
}

fn api_failure(e: ApiError) -> ExecutionOutcome {
    match e {
        ApiError::Status { status, body } => {
            let (message, raw) = describe_http_failure(status, &body);
            ExecutionOutcome::failed(message, raw)
        }
        ApiError::Decode(msg) => ExecutionOutcome::failed(format!("malformed JSON response: {msg}"), None),
        other => ExecutionOutcome::failed(other.to_string(), None),
    }
}

fn status_of(v: &Value) -> String {
    v.get("status")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase()
}

/// output 可能是字符串或任意 JSON；空字符串与 null 视为没有输出
fn output_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
