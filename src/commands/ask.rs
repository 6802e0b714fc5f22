use super::string_arg;
use crate::context::AppContext;
use crate::dispatch::CliCommand;
use crate::ui::CommandOutput;
use crate::utils::errors::CliError;
use crate::utils::resilience::{with_timeout, RetryPolicy};
use crate::Result;
use async_trait::async_trait;
use clap::{value_parser, Arg, ArgMatches};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// OpenAI-compatible chat completions route
pub const HUGGING_FACE_CHAT_URL: &str = "https://router.huggingface.co/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "meta-llama/Llama-3.2-3B-Instruct";
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
const MAX_TOKENS: u32 = 800;
const PROVIDER: &str = "huggingface";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// `ask <question> [-m model] [--timeout-ms N]`
pub struct AskCommand {
    endpoint: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl Default for AskCommand {
    fn default() -> Self {
        Self::new(HUGGING_FACE_CHAT_URL, reqwest::Client::new(), RetryPolicy::default())
    }
}

impl AskCommand {
    pub fn new<S: Into<String>>(endpoint: S, client: reqwest::Client, retry: RetryPolicy) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
            retry,
        }
    }

    async fn complete(&self, token: &str, model: &str, question: &str) -> Result<String> {
        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: question.to_string(),
            }],
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => CliError::authentication(format!(
                    "Hugging Face rejected the token ({})",
                    status
                )),
                404 => CliError::not_found(format!("model '{}' is not available", model)),
                429 => CliError::unknown("Rate limit hit. Try again in a few moments."),
                _ => CliError::unknown(format!("Hugging Face returned {}: {}", status, body.trim())),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| CliError::unknown("Hugging Face returned no choices"))
    }
}

#[async_trait]
impl CliCommand for AskCommand {
    fn name(&self) -> &str {
        "ask"
    }

    fn definition(&self) -> clap::Command {
        clap::Command::new("ask")
            .about("Ask the AI any question (one-time answer)")
            .arg(Arg::new("question").required(true))
            .arg(
                Arg::new("model")
                    .short('m')
                    .long("model")
                    .default_value(DEFAULT_MODEL)
                    .help("Model to use"),
            )
            .arg(
                Arg::new("timeout-ms")
                    .long("timeout-ms")
                    .value_name("MS")
                    .value_parser(value_parser!(u64).range(1..))
                    .help("Per-attempt timeout in milliseconds (default 15000)"),
            )
    }

    async fn run(&self, ctx: &AppContext, args: &ArgMatches) -> Result<CommandOutput> {
        let question = string_arg(args, "question").unwrap_or_default();
        if question.trim().is_empty() {
            return Err(CliError::validation("question", "must not be empty"));
        }
        let model = string_arg(args, "model").unwrap_or(DEFAULT_MODEL);
        let timeout = Duration::from_millis(
            args.get_one::<u64>("timeout-ms")
                .copied()
                .unwrap_or(DEFAULT_TIMEOUT_MS),
        );

        let token = ctx.require_secret(PROVIDER)?;
        tracing::debug!(model, timeout_ms = timeout.as_millis() as u64, "Sending chat completion");

        let answer = self
            .retry
            .execute(|| with_timeout(self.complete(token.expose(), model, question), timeout))
            .await?;

        Ok(CommandOutput::new(json!({ "status": "success", "model": model, "answer": answer }))
            .plain(answer.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use crate::credentials::Secret;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves canned responses in order, repeating the last; counts requests
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/v1/chat/completions", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let index = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = responses[index.min(responses.len() - 1)];

                let mut buffer = Vec::new();
                let mut chunk = [0u8; 4096];
                loop {
                    let n = socket.read(&mut chunk).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    buffer.extend_from_slice(&chunk[..n]);
                    let text = String::from_utf8_lossy(&buffer).to_string();
                    if let Some(split) = text.find("\r\n\r\n") {
                        let length = text[..split]
                            .lines()
                            .find_map(|l| {
                                l.to_lowercase()
                                    .strip_prefix("content-length:")
                                    .and_then(|v| v.trim().parse::<usize>().ok())
                            })
                            .unwrap_or(0);
                        if buffer.len() >= split + 4 + length {
                            break;
                        }
                    }
                }

                let response = format!(
                    "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        (url, hits)
    }

    fn command(url: &str) -> AskCommand {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        AskCommand::new(url, client, RetryPolicy::new(3, Duration::from_millis(10)))
    }

    const ANSWER: &str = r#"{"choices":[{"message":{"role":"assistant","content":"42"}}]}"#;

    #[tokio::test]
    async fn test_answer_after_transient_failure() {
        let (url, hits) = serve(vec![(503, "{}"), (200, ANSWER)]).await;
        let dir = tempfile::TempDir::new().unwrap();
        let ctx = testing::context(&dir);
        ctx.vault().store("default", PROVIDER, &Secret::new("hf_test")).unwrap();

        let output = testing::run(&command(&url), &ctx, &["what is six times seven?"])
            .await
            .unwrap();
        assert_eq!(output.data["answer"], "42");
        assert_eq!(output.data["model"], DEFAULT_MODEL);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_three_attempts() {
        let (url, hits) = serve(vec![(429, "{}")]).await;
        let dir = tempfile::TempDir::new().unwrap();
        let ctx = testing::context(&dir);
        ctx.vault().store("default", PROVIDER, &Secret::new("hf_test")).unwrap();

        let err = testing::run(&command(&url), &ctx, &["hello"]).await.unwrap_err();
        assert!(err.to_string().contains("Rate limit"));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_each_attempt_times_out() {
        // Accepts connections but never answers
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let dir = tempfile::TempDir::new().unwrap();
        let ctx = testing::context(&dir);
        ctx.vault().store("default", PROVIDER, &Secret::new("hf_test")).unwrap();

        let err = testing::run(&command(&url), &ctx, &["hello", "--timeout-ms", "50"])
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Timeout { timeout_ms: 50 }));
    }

    #[tokio::test]
    async fn test_missing_token_is_auth_error() {
        if token_in_env() {
            return;
        }
        let dir = tempfile::TempDir::new().unwrap();
        let err = testing::run(&command("http://127.0.0.1:9/"), &testing::context(&dir), &["hello"])
            .await
            .unwrap_err();
        assert_eq!(err.category(), "auth");
        assert!(err.to_string().contains("HUGGING_FACE_TOKEN"));
    }

    fn token_in_env() -> bool {
        crate::credentials::SecretResolver::env_vars(PROVIDER)
            .iter()
            .any(|var| std::env::var(var).map(|v| !v.trim().is_empty()).unwrap_or(false))
    }
}
