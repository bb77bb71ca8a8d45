//! Shared HTTP plumbing for provider adapters: client construction and
//! status-code classification.

use std::time::Duration;

use reqwest::StatusCode;

use crate::error::{PipelineError, ProviderResult};

/// Longest slice of an error body carried into messages.
const BODY_EXCERPT_CHARS: usize = 200;

/// Build a client whose every request is bounded by `timeout`.
///
/// A default (no-timeout) client is used as a last-resort fallback if the
/// builder fails.
pub(crate) fn client_with_timeout(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Pass successful responses through; turn anything else into the matching
/// [`PipelineError`], consuming the body for context.
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    log::debug!("http: {provider} answered {status}");
    Err(map_status(provider, status, &body))
}

pub(crate) fn map_status(provider: &str, status: StatusCode, body: &str) -> PipelineError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PipelineError::ProviderAuth(format!(
            "{provider} authentication failed: {status}"
        )),
        StatusCode::TOO_MANY_REQUESTS => {
            PipelineError::ProviderRateLimited(format!("{provider} rate limit exceeded: {status}"))
        }
        StatusCode::REQUEST_TIMEOUT => PipelineError::ProviderTimeout,
        s if s.is_server_error() => PipelineError::ProviderOutage {
            provider: provider.to_string(),
            status: s.as_u16(),
        },
        s => PipelineError::ProviderRejected {
            provider: provider.to_string(),
            status: s.as_u16(),
            body: excerpt(body),
        },
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
