//! 仪表盘 URL 快捷输入
//!
//! `@https://<host>/pt-BR/dashboard/user/ai/chat/ai-chat/professional-dev-ai?temperature=0&model=...&tools=internet`
//! 路径最后一段为 Agent slug，查询参数覆盖模型设置；URL 之后的文本作为消息。

use reqwest::Url;

use super::payload::UrlParams;

/// 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardLink {
    pub slug: String,
    pub params: UrlParams,
    pub message: String,
}

/// 输入不是指向 `host` 的仪表盘 URL 时返回 None
pub fn parse_dashboard_url(input: &str, host: &str) -> Option<DashboardLink> {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_prefix('@').unwrap_or(trimmed);
    let prefix = format!("https://{host}/");
    if !trimmed
        .get(..prefix.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(&prefix))
    {
        return None;
    }

    let (link, message) = match trimmed.split_once(char::is_whitespace) {
        Some((link, rest)) => (link, rest.trim()),
        None => (trimmed, ""),
    };

    let url = match Url::parse(link) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(error = %e, "Failed to parse dashboard URL");
            return None;
        }
    };

    let slug = url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()?
        .to_string();

    let mut params = UrlParams::default();
    for (key, value) in url.query_pairs() {
        let value = value.trim().to_string();
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            "model" => params.model = Some(value),
            "temperature" => params.temperature = Some(value),
            "tools" => params.tools = Some(value),
            _ => {}
        }
    }

    tracing::info!(slug = %slug, params = ?params, "Parsed dashboard URL");
    Some(DashboardLink {
        slug,
        params,
        message: message.to_string(),
    })
}
