//! 远程执行的终态结果
//!
//! ExecutionOutcome 只能处于 Succeeded / Failed / TimedOut 三者之一，创建后不可修改。

use serde_json::Value;

/// 终态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Succeeded,
    Failed,
    TimedOut,
}

impl ExecutionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionState::Succeeded => "succeeded",
            ExecutionState::Failed => "failed",
            ExecutionState::TimedOut => "timed_out",
        }
    }
}

/// 编排器返回给调用方的终态值
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    state: ExecutionState,
    output: Option<String>,
    error: Option<String>,
    raw_response: Option<Value>,
}

impl ExecutionOutcome {
    pub fn succeeded(output: Option<String>, raw_response: Option<Value>) -> Self {
        Self {
            state: ExecutionState::Succeeded,
            output,
            error: None,
            raw_response,
        }
    }

    pub fn failed(error: impl Into<String>, raw_response: Option<Value>) -> Self {
        Self {
            state: ExecutionState::Failed,
            output: None,
            error: Some(error.into()),
            raw_response,
        }
    }

    pub fn timed_out(error: impl Into<String>) -> Self {
        Self {
            state: ExecutionState::TimedOut,
            output: None,
            error: Some(error.into()),
            raw_response: None,
        }
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn raw_response(&self) -> Option<&Value> {
        self.raw_response.as_ref()
    }

    /// 异步提交时远程返回的执行 ID（responses[0].id 或顶层 id）
    pub fn execution_id(&self) -> Option<String> {
        let raw = self.raw_response.as_ref()?;
        raw.pointer("/responses/0/id")
            .or_else(|| raw.get("id"))
            .and_then(value_as_id)
    }
}

/// 数字或字符串形式的 ID 统一为字符串
pub(crate) fn value_as_id(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// 从失败响应中提取错误描述：error.message / error 字符串 / message
pub fn failure_detail(body: &Value) -> Option<String> {
    if let Some(msg) = body.pointer("/error/message").and_then(Value::as_str) {
        return Some(msg.to_string());
    }
    if let Some(msg) = body.get("error").and_then(Value::as_str) {
        return Some(msg.to_string());
    }
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// 解析 422 校验错误 `{message, errors: {field: [msg, ..]}}`，返回首条信息含 "required" 的字段名
pub fn missing_required_fields(body: &Value) -> Vec<String> {
    let Some(errors) = body.get("errors").and_then(Value::as_object) else {
        return Vec::new();
    };
    errors
        .iter()
        .filter(|(_, messages)| {
            let first = match messages {
                Value::Array(items) => items.first().and_then(Value::as_str),
                Value::String(s) => Some(s.as_str()),
                _ => None,
            };
            first.is_some_and(|m| m.to_lowercase().contains("required"))
        })
        .map(|(field, _)| field.clone())
        .collect()
}

/// HTTP 错误状态码 + body 转为可读的错误文本（422 会列出缺失字段）
pub fn describe_http_failure(status: u16, body: &str) -> (String, Option<Value>) {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let Some(json) = parsed else {
        let snippet: String = body.chars().take(200).collect();
        return (format!("HTTP {status}: {snippet}"), None);
    };

    if status == 422 {
        let missing = missing_required_fields(&json);
        if !missing.is_empty() {
            return (
                format!("HTTP 422: missing required fields: {}", missing.join(", ")),
                Some(json),
            );
        }
    }
    let detail = failure_detail(&json).unwrap_or_else(|| json.to_string());
    (format!("HTTP {status}: {detail}"), Some(json))
}
