use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::llm::prompt::LlmPrompt;

pub const DEFAULT_URL: &str = "http://localhost:11434";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Local Ollama server, `/api/generate` without streaming.
#[derive(Clone)]
pub struct Ollama {
    base_url: String,
    model: String,
    http: Client,
}

impl Ollama {
    pub fn new(base_url: Option<String>, model: String, timeout_secs: u64) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            base_url: base_url.unwrap_or_else(|| DEFAULT_URL.into()),
            model,
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn run(&self, prompt: &LlmPrompt) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));

        let resp = self
            .http
            .post(url)
            .json(&GenerateRequest {
                model: &self.model,
                system: &prompt.system,
                prompt: &prompt.user,
                stream: false,
            })
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LlmError::Status {
                provider: "ollama",
                status: status.as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }

        let body: GenerateResponse = resp.json().map_err(|_| LlmError::Parse("Ollama"))?;

        Ok(body.response.trim().to_string())
    }
}
