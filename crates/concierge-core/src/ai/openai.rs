use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{api_error, fragments_from_response, lines::sse_data, CompletionProvider, FragmentStream, LineEvent};
use crate::error::{ConciergeError, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    stream: bool,
}

#[derive(Deserialize)]
struct OpenAIChunk {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
    error: Option<OpenAIError>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    delta: OpenAIDelta,
}

#[derive(Deserialize)]
struct OpenAIDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIError {
    message: String,
}

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    system_prompt: Option<String>,
}

impl OpenAIClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: None,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "gpt-4o".to_string(),
            "gpt-4o-mini".to_string(),
            "gpt-4-turbo".to_string(),
            "gpt-3.5-turbo".to_string(),
        ]
    }

    fn build_request(&self, prompt: &str) -> OpenAIRequest {
        let mut messages = Vec::new();
        if let Some(system) = &self.system_prompt {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(OpenAIMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        OpenAIRequest {
            model: self.model.clone(),
            messages,
            stream: true,
        }
    }

    fn parse_line(line: &str) -> Result<LineEvent> {
        let Some(data) = sse_data(line) else {
            return Ok(LineEvent::Skip);
        };
        if data == "[DONE]" {
            return Ok(LineEvent::Done);
        }

        let chunk: OpenAIChunk = serde_json::from_str(data)?;
        if let Some(error) = chunk.error {
            return Err(ConciergeError::Stream(error.message));
        }

        match chunk.choices.into_iter().next().and_then(|c| c.delta.content) {
            Some(text) if !text.is_empty() => Ok(LineEvent::Text(text)),
            _ => Ok(LineEvent::Skip),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAIClient {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn open_stream(&self, prompt: &str) -> Result<FragmentStream> {
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.build_request(prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(self.name(), response).await);
        }

        Ok(fragments_from_response(response, Self::parse_line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use httpmock::prelude::*;

    fn delta(text: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"index\":0,\"delta\":{{\"content\":{}}}}}]}}\n\n",
            serde_json::to_string(text).unwrap()
        )
    }

    #[test]
    fn test_role_only_delta_is_skipped() {
        let line = r#"data: {"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert!(matches!(OpenAIClient::parse_line(line).unwrap(), LineEvent::Skip));
    }

    #[test]
    fn test_done_marker_ends_stream() {
        assert!(matches!(OpenAIClient::parse_line("data: [DONE]").unwrap(), LineEvent::Done));
    }

    #[test]
    fn test_system_prompt_goes_first() {
        let client = OpenAIClient::new("k").with_system_prompt(Some("facts".to_string()));
        let request = client.build_request("hi");
        assert!(request.stream);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[1].content, "hi");
    }

    #[tokio::test]
    async fn test_streams_until_done_marker() {
        let server = MockServer::start_async().await;
        let mut body = String::new();
        body.push_str("data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n");
        body.push_str(&delta("Hi"));
        body.push_str(&delta(" there"));
        body.push_str("data: [DONE]\n\n");
        body.push_str(&delta("ignored"));

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer sk-test");
                then.status(200).body(body);
            })
            .await;

        let client = OpenAIClient::new("sk-test").with_base_url(&server.base_url());
        let fragments: Vec<String> = client
            .open_stream("Hello")
            .await
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
            .await;

        mock.assert_async().await;
        assert_eq!(fragments.concat(), "Hi there");
    }

    #[tokio::test]
    async fn test_unauthorized_is_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(401)
                    .body(r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#);
            })
            .await;

        let client = OpenAIClient::new("nope").with_base_url(&server.base_url());
        let err = client.open_stream("Hello").await.err().unwrap();
        assert_eq!(err.to_string(), "OpenAI API error 401: Incorrect API key provided");
    }
}
