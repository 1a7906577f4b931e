use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{api_error, fragments_from_response, CompletionProvider, FragmentStream, LineEvent};
use crate::error::{ConciergeError, Result};

const DEFAULT_MODEL: &str = "llama3.2:latest";

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Deserialize)]
struct OllamaChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    system_prompt: Option<String>,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: None,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    /// Models pulled on the local server, from `/api/tags`
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(self.name(), response).await);
        }

        let tags: OllamaModelsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn parse_line(line: &str) -> Result<LineEvent> {
        let chunk: OllamaChunk = serde_json::from_str(line)?;
        if let Some(error) = chunk.error {
            return Err(ConciergeError::Stream(error));
        }

        if !chunk.response.is_empty() {
            // The final record may still carry text
            Ok(LineEvent::Text(chunk.response))
        } else if chunk.done {
            Ok(LineEvent::Done)
        } else {
            Ok(LineEvent::Skip)
        }
    }
}

#[async_trait]
impl CompletionProvider for OllamaClient {
    fn name(&self) -> &'static str {
        "Ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn open_stream(&self, prompt: &str) -> Result<FragmentStream> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: true,
            system: self.system_prompt.clone(),
        };

        let response = self.client.post(&url).json(&request).send().await?;

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

    #[tokio::test]
    async fn test_streams_ndjson_without_trailing_newline() {
        let server = MockServer::start_async().await;
        let body = concat!(
            "{\"model\":\"llama3.2\",\"response\":\"Hi\",\"done\":false}\n",
            "{\"model\":\"llama3.2\",\"response\":\" there\",\"done\":false}\n",
            "{\"model\":\"llama3.2\",\"response\":\"\",\"done\":true}"
        );
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).body(body);
            })
            .await;

        let client = OllamaClient::new(&server.base_url()).with_system_prompt(Some("facts".to_string()));
        let fragments: Vec<String> = client
            .open_stream("Hello")
            .await
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
            .await;

        mock.assert_async().await;
        assert_eq!(fragments, vec!["Hi", " there"]);
    }

    #[tokio::test]
    async fn test_missing_model_reports_server_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(404).body(r#"{"error":"model \"llama3.2:latest\" not found, try pulling it first"}"#);
            })
            .await;

        let client = OllamaClient::new(&server.base_url());
        let err = client.open_stream("Hello").await.err().unwrap();
        assert!(err.to_string().contains("not found, try pulling it first"));
    }

    #[tokio::test]
    async fn test_list_models() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/tags");
                then.status(200)
                    .body(r#"{"models":[{"name":"llama3.2:latest"},{"name":"gemma3:latest"}]}"#);
            })
            .await;

        let client = OllamaClient::new(&server.base_url());
        let models = client.list_models().await.unwrap();
        assert_eq!(models, vec!["llama3.2:latest", "gemma3:latest"]);
    }

    #[tokio::test]
    async fn test_list_models_server_error_is_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/tags");
                then.status(500).body(r#"{"error":"loading registry"}"#);
            })
            .await;

        let err = OllamaClient::new(&server.base_url()).list_models().await.unwrap_err();
        assert_eq!(err.to_string(), "Ollama API error 500: loading registry");
    }

    #[test]
    fn test_request_streams_with_system_prompt() {
        let request = OllamaRequest {
            model: DEFAULT_MODEL.to_string(),
            prompt: "hi".to_string(),
            stream: true,
            system: Some("facts".to_string()),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["stream"], true);
        assert_eq!(body["system"], "facts");
    }

    #[test]
    fn test_inline_error_record() {
        let err = OllamaClient::parse_line(r#"{"error":"out of memory"}"#).err().unwrap();
        assert!(matches!(err, ConciergeError::Stream(ref m) if m == "out of memory"));
    }
}
