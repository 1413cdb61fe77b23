use replyclean_lib::config::completion::CompletionConfig;
use replyclean_lib::pipelines::deepseek::fetch_completion;
use replyclean_lib::DeepSeekModel;

fn offline_config(api_key_env: &str) -> CompletionConfig {
    CompletionConfig {
        // nothing listens on the discard port locally
        endpoint: "http://127.0.0.1:9/chat/completions".to_string(),
        api_key_env: api_key_env.to_string(),
        timeout_secs: 5,
        ..CompletionConfig::default()
    }
}

#[tokio::test]
async fn test_missing_api_key_fails_before_request() {
    let config = offline_config("REPLYCLEAN_FETCHER_TEST_UNSET_KEY");
    let err = fetch_completion(&config, "hello").await.unwrap_err();
    assert_eq!(err.stage, "config");
    assert!(err.status.is_none());
}

#[tokio::test]
async fn test_unreachable_endpoint_is_an_error() {
    std::env::set_var("REPLYCLEAN_FETCHER_TEST_KEY", "sk-test");
    let config = offline_config("REPLYCLEAN_FETCHER_TEST_KEY");

    let err = fetch_completion(&config, "hello").await.unwrap_err();
    assert!(err.stage == "http" || err.stage == "timeout", "stage was {}", err.stage);
    assert_eq!(err.model.as_deref(), Some("deepseek-chat"));
}

#[tokio::test]
async fn test_ask_skips_normalization_on_fetch_failure() {
    let model = DeepSeekModel::new(offline_config("REPLYCLEAN_ASK_TEST_UNSET_KEY"));

    let result = model.ask("hello").await;
    assert!(result.is_err());
    assert_eq!(model.metrics().fetch_errors(), 1);
    assert_eq!(model.metrics().completions(), 0);
    assert_eq!(model.metrics().fallbacks(), 0);
}

/// Serve exactly one HTTP response on a local port and return its endpoint URL
async fn serve_once(status_line: &'static str, body: String) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        // read the whole request so closing the socket does not reset it
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        if name.eq_ignore_ascii_case("content-length") {
                            value.trim().parse::<usize>().ok()
                        } else {
                            None
                        }
                    })
                    .unwrap_or(0);
                if request.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        let response = format!(
            "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });

    format!("http://{}/chat/completions", addr)
}

fn stub_config(endpoint: String) -> CompletionConfig {
    std::env::set_var("REPLYCLEAN_STUB_TEST_KEY", "sk-test");
    CompletionConfig {
        endpoint,
        api_key_env: "REPLYCLEAN_STUB_TEST_KEY".to_string(),
        timeout_secs: 5,
        ..CompletionConfig::default()
    }
}

fn completion_body(content: &str) -> String {
    serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
    .to_string()
}

#[tokio::test]
async fn test_fetch_returns_trimmed_first_choice() {
    let endpoint = serve_once("HTTP/1.1 200 OK", completion_body("  raw text  ")).await;
    let raw = fetch_completion(&stub_config(endpoint), "hi").await.unwrap();
    assert_eq!(raw, "raw text");
}

#[tokio::test]
async fn test_fetch_surfaces_status_and_body() {
    let endpoint = serve_once(
        "HTTP/1.1 401 Unauthorized",
        r#"{"error":{"message":"bad key"}}"#.to_string(),
    )
    .await;
    let err = fetch_completion(&stub_config(endpoint), "hi").await.unwrap_err();
    assert_eq!(err.stage, "http_status");
    assert_eq!(err.status, Some(401));
    assert_eq!(err.message, "DeepSeek failed: 401");
    assert!(err.context.unwrap_or_default().contains("bad key"));
}

#[tokio::test]
async fn test_ask_normalizes_envelope() {
    let content = "```json\n{\"answer\": \"**Leave** is 20 days<|end_of_sentence|>\"}\n```";
    let endpoint = serve_once("HTTP/1.1 200 OK", completion_body(content)).await;
    let model = DeepSeekModel::new(stub_config(endpoint));

    let answer = model.ask("How much leave?").await.unwrap();
    assert_eq!(answer, "Leave is 20 days");
    assert_eq!(model.metrics().completions(), 1);
    assert_eq!(model.metrics().fallbacks(), 0);
}

#[tokio::test]
async fn test_ask_counts_fallbacks() {
    let endpoint = serve_once("HTTP/1.1 200 OK", completion_body("{}")).await;
    let model = DeepSeekModel::new(stub_config(endpoint));

    let answer = model.ask("anything").await.unwrap();
    assert_eq!(answer, replyclean_lib::FALLBACK_MESSAGE);
    assert_eq!(model.metrics().fallbacks(), 1);
}
