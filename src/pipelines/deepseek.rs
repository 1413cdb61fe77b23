use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::{timeout, Duration};
use std::sync::OnceLock;

use crate::config::completion::CompletionConfig;
use crate::error::ReplyError;
use crate::logging::{log_completion_call, log_timeout};
use crate::pipelines::perf;

/// Reusable HTTP client singleton (created once, reused for all requests)
static HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

fn get_http_client() -> &'static Client {
    HTTP_CLIENT.get_or_init(|| {
        Client::builder()
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to build tuned HTTP client, using defaults");
                Client::new()
            })
    })
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pull the first choice's content out of a completion body.
/// Missing choices, message or content all read as an empty string.
pub fn first_choice_content(body: &str) -> Result<String, ReplyError> {
    let parsed: ChatResponse = serde_json::from_str(body)?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .unwrap_or_default();
    Ok(content.trim().to_string())
}

/// Send `prompt` to the completion endpoint and return the raw first-choice text
pub async fn fetch_completion(config: &CompletionConfig, prompt: &str) -> Result<String, ReplyError> {
    let _perf = perf::PerfTimer::new("completion_call");
    let api_key = config.api_key()?;
    let timeout_duration = Duration::from_secs(config.timeout_secs);
    let start = std::time::Instant::now();

    let result = timeout(timeout_duration, send_request(config, &api_key, prompt)).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(Ok(content)) => {
            log_completion_call(&config.model, true, latency_ms);
            Ok(content)
        }
        Ok(Err(e)) => {
            log_completion_call(&config.model, false, latency_ms);
            Err(e.with_model(config.model.clone()))
        }
        Err(elapsed) => {
            log_timeout(&config.model, timeout_duration.as_secs());
            Err(ReplyError::from(elapsed).with_model(config.model.clone()))
        }
    }
}

async fn send_request(config: &CompletionConfig, api_key: &str, prompt: &str) -> Result<String, ReplyError> {
    let request = ChatRequest {
        model: &config.model,
        messages: vec![
            ChatMessage { role: "system", content: &config.system_prompt },
            ChatMessage { role: "user", content: prompt },
        ],
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        top_p: config.top_p,
    };

    let mut builder = get_http_client()
        .post(&config.endpoint)
        .bearer_auth(api_key)
        .json(&request);
    if let Some(ref referer) = config.referer {
        builder = builder.header("HTTP-Referer", referer);
    }
    if let Some(ref title) = config.title {
        builder = builder.header("X-Title", title);
    }

    let request_start = std::time::Instant::now();
    let response = builder.send().await?;
    perf::log_perf_with_context("completion_connect", request_start.elapsed().as_millis() as u64, &config.model);

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::error!(
            model = %config.model,
            status = status.as_u16(),
            body = %body,
            "DeepSeek API error"
        );
        return Err(ReplyError::new(format!("DeepSeek failed: {}", status.as_u16()), "http_status")
            .with_status(status.as_u16())
            .with_context(body));
    }

    first_choice_content(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_choice_content_is_trimmed() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  Hello  "}},{"message":{"content":"second"}}]}"#;
        assert_eq!(first_choice_content(body).unwrap(), "Hello");
    }

    #[test]
    fn test_first_choice_content_defaults_to_empty() {
        assert_eq!(first_choice_content(r#"{"choices":[]}"#).unwrap(), "");
        assert_eq!(first_choice_content(r#"{}"#).unwrap(), "");
        assert_eq!(first_choice_content(r#"{"choices":[{}]}"#).unwrap(), "");
        assert_eq!(first_choice_content(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap(), "");
    }

    #[test]
    fn test_first_choice_content_rejects_non_json() {
        let err = first_choice_content("<html>bad gateway</html>").unwrap_err();
        assert_eq!(err.stage, "json_parse");
    }

    #[test]
    fn test_request_body_shape() {
        let request = ChatRequest {
            model: "deepseek-chat",
            messages: vec![
                ChatMessage { role: "system", content: "sys" },
                ChatMessage { role: "user", content: "hi" },
            ],
            max_tokens: 2000,
            temperature: 0.5,
            top_p: 0.9,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "deepseek-chat");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"], "hi");
        assert_eq!(value["max_tokens"], 2000);
        assert_eq!(value["temperature"], 0.5);
    }
}
