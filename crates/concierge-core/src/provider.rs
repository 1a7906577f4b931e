use std::fmt;
use std::str::FromStr;

use crate::error::ConciergeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    #[default]
    Gemini,
    OpenAI,
    Ollama,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenAI => "openai",
            Provider::Ollama => "ollama",
        }
    }

    pub fn all() -> Vec<Provider> {
        vec![Provider::Gemini, Provider::OpenAI, Provider::Ollama]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini (Google)",
            Provider::OpenAI => "ChatGPT (OpenAI)",
            Provider::Ollama => "Ollama (Local)",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-2.5-flash",
            Provider::OpenAI => "gpt-4o-mini",
            Provider::Ollama => "llama3.2:latest",
        }
    }

    /// Environment variables checked for the credential, in order
    pub fn api_key_env(&self) -> &'static [&'static str] {
        match self {
            Provider::Gemini => &["GEMINI_API_KEY", "API_KEY"],
            Provider::OpenAI => &["OPENAI_API_KEY"],
            Provider::Ollama => &[],
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !self.api_key_env().is_empty()
    }
}

impl FromStr for Provider {
    type Err = ConciergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Provider::Gemini),
            "openai" | "chatgpt" => Ok(Provider::OpenAI),
            "ollama" => Ok(Provider::Ollama),
            other => {
                let known: Vec<&str> = Provider::all().iter().map(Provider::as_str).collect();
                Err(ConciergeError::Config(format!(
                    "unknown provider '{}', expected one of: {}",
                    other,
                    known.join(", ")
                )))
            }
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
