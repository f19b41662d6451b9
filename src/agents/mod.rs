//! 远程 Agent 执行：HTTP 协作方、目录解析、请求体构建、执行编排与终态结果

pub mod api;
pub mod dashboard_url;
pub mod directory;
pub mod http;
pub mod orchestrator;
pub mod outcome;
pub mod payload;

pub use api::{AgentApi, AgentDetails, AgentPage, AgentQuery, AgentSummary, ApiError};
pub use dashboard_url::{parse_dashboard_url, DashboardLink};
pub use directory::{AgentDirectory, AgentKind, AgentReference};
pub use http::HttpAgentApi;
pub use orchestrator::{
    ExecutionOrchestrator, ExecutionRequest, OrchestratorSettings, Sleeper, TokioSleeper,
};
pub use outcome::{ExecutionOutcome, ExecutionState};
pub use payload::{PayloadBuilder, UrlParams};
