//! Streaming completion providers
//!
//! A provider turns a prompt into a lazy, finite sequence of text fragments.
//! Opening the stream fails outright on transport errors and non-success
//! statuses; errors after that arrive as an `Err` item.

pub mod gemini;
pub mod lines;
pub mod ollama;
pub mod openai;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;

use std::sync::Arc;

use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde_json::Value;

use crate::config::Config;
use crate::error::{ConciergeError, Result};
use crate::provider::Provider;
use lines::LineBuffer;

pub type FragmentStream = BoxStream<'static, Result<String>>;

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Display name, e.g. "Gemini"
    fn name(&self) -> &'static str;

    fn model(&self) -> &str;

    async fn open_stream(&self, prompt: &str) -> Result<FragmentStream>;
}

/// Build the configured provider, failing with a configuration error when
/// its credential is missing.
pub fn connect(
    config: &Config,
    provider: Provider,
    system_prompt: Option<String>,
) -> Result<Arc<dyn CompletionProvider>> {
    let model = config.model_for(provider);

    let client: Arc<dyn CompletionProvider> = match provider {
        Provider::Gemini => {
            let key = config.api_key(provider).ok_or_else(|| missing_key(provider))?;
            Arc::new(
                GeminiClient::new(&key)
                    .with_model(&model)
                    .with_system_prompt(system_prompt),
            )
        }
        Provider::OpenAI => {
            let key = config.api_key(provider).ok_or_else(|| missing_key(provider))?;
            Arc::new(
                OpenAIClient::new(&key)
                    .with_model(&model)
                    .with_system_prompt(system_prompt),
            )
        }
        Provider::Ollama => Arc::new(
            OllamaClient::new(config.ollama_url())
                .with_model(&model)
                .with_system_prompt(system_prompt),
        ),
    };

    tracing::info!(provider = client.name(), model = client.model(), "completion provider ready");
    Ok(client)
}

fn missing_key(provider: Provider) -> ConciergeError {
    ConciergeError::Config(format!(
        "API Key missing. Set {} or add {}_api_key to the config file.",
        provider.api_key_env().join(" or "),
        provider.as_str()
    ))
}

/// What one line of a streamed body means to the consumer
pub(crate) enum LineEvent {
    Text(String),
    Skip,
    Done,
}

/// Adapt a streaming HTTP body into fragments using a per-line parser
pub(crate) fn fragments_from_response(
    response: reqwest::Response,
    parse: fn(&str) -> Result<LineEvent>,
) -> FragmentStream {
    Box::pin(try_stream! {
        let mut body = response.bytes_stream();
        let mut lines = LineBuffer::new();
        let mut done = false;

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for line in lines.push(&chunk) {
                match parse(&line)? {
                    LineEvent::Text(text) => yield text,
                    LineEvent::Skip => {}
                    LineEvent::Done => {
                        done = true;
                        break;
                    }
                }
            }
            if done {
                break;
            }
        }

        if !done {
            if let Some(line) = lines.finish() {
                if let LineEvent::Text(text) = parse(&line)? {
                    yield text;
                }
            }
        }
    })
}

/// Turn a non-success response into an error carrying the provider's message
pub(crate) async fn api_error(provider: &'static str, response: reqwest::Response) -> ConciergeError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = error_message(&body)
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    ConciergeError::Api {
        provider,
        status: status.as_u16(),
        message,
    }
}

/// Extract `error.message` (or a bare string `error`) from a JSON body
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_nested_object() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body).as_deref(), Some("API key not valid."));
    }

    #[test]
    fn test_error_message_plain_string() {
        assert_eq!(
            error_message(r#"{"error":"model 'x' not found"}"#).as_deref(),
            Some("model 'x' not found")
        );
    }

    #[test]
    fn test_error_message_absent() {
        assert!(error_message("<html>bad gateway</html>").is_none());
        assert!(error_message(r#"{"ok":true}"#).is_none());
    }

    #[test]
    fn test_connect_without_key_is_config_error() {
        let config = Config {
            provider: Some("openai".to_string()),
            ..Config::default()
        };
        // OPENAI_API_KEY may be set on a developer machine
        if config.api_key(Provider::OpenAI).is_some() {
            return;
        }
        let err = connect(&config, Provider::OpenAI, None).err().unwrap();
        match err {
            ConciergeError::Config(message) => assert!(message.contains("OPENAI_API_KEY")),
            other => panic!("expected config error, got {other}"),
        }
    }

    #[test]
    fn test_connect_ollama_needs_no_key() {
        let config = Config::default();
        let client = connect(&config, Provider::Ollama, None).unwrap();
        assert_eq!(client.name(), "Ollama");
        assert_eq!(client.model(), "llama3.2:latest");
    }
}
