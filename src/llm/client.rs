// src/llm/client.rs

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::{Provider, ProviderConfig};
use crate::error::LlmError;
use crate::llm::prompt::LlmPrompt;

const OPENAI_URL: &str = "https://api.openai.com/v1/responses";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

#[derive(Debug, Clone)]
pub struct LlmRunResult {
    pub text: String,
    pub prompt_hash: String,
    pub cached_tokens: Option<u64>,
}

/// Client for hosted providers (OpenAI, Anthropic).
#[derive(Clone)]
pub struct LlmClient {
    cfg: ProviderConfig,
    http: Client,
    use_cache: bool,
}

impl LlmClient {
    pub fn new(cfg: ProviderConfig, use_cache: bool) -> Result<Self, LlmError> {
        if cfg.provider == Provider::Ollama {
            return Err(LlmError::NotRemote(cfg.provider.name()));
        }
        if cfg.api_key.trim().is_empty() {
            return Err(LlmError::MissingKey(cfg.provider.name()));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;

        Ok(Self {
            cfg,
            http,
            use_cache,
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.cfg
    }

    /// Execute LLM request
    pub fn run(&self, prompt: &LlmPrompt) -> Result<LlmRunResult, LlmError> {
        let prompt_hash = prompt.hash();
        let (url, headers, body) =
            build_request(&self.cfg, prompt, &prompt_hash, self.use_cache)?;

        let mut req = self.http.post(url).json(&body);
        for (k, v) in headers {
            req = req.header(k, v);
        }

        let resp = req.send()?;
        let status = resp.status();
        let raw = resp.text()?;
        let json = decode(self.cfg.provider, status, &raw)?;

        let cached_tokens = json
            .pointer("/usage/prompt_tokens_details/cached_tokens")
            .or_else(|| json.pointer("/usage/cache_read_input_tokens"))
            .and_then(|v| v.as_u64());

        let text = extract_text(&self.cfg.provider, &json)?;

        Ok(LlmRunResult {
            text,
            prompt_hash,
            cached_tokens,
        })
    }
}

/// Status first: error pages from gateways are often HTML, not JSON.
fn decode(provider: Provider, status: StatusCode, raw: &str) -> Result<Value, LlmError> {
    if !status.is_success() {
        return Err(LlmError::Status {
            provider: provider.name(),
            status: status.as_u16(),
            body: raw.to_string(),
        });
    }

    serde_json::from_str(raw).map_err(|_| LlmError::Parse(provider.name()))
}

type Request = (String, Vec<(&'static str, String)>, Value);

pub(crate) fn build_request(
    cfg: &ProviderConfig,
    prompt: &LlmPrompt,
    prompt_hash: &str,
    use_cache: bool,
) -> Result<Request, LlmError> {
    match cfg.provider {
        Provider::Ollama => Err(LlmError::NotRemote(cfg.provider.name())),

        Provider::OpenAI => {
            let url = cfg.base_url.clone().unwrap_or_else(|| OPENAI_URL.into());

            let mut body = serde_json::json!({
                "model": cfg.model,
                "instructions": prompt.system,
                "input": prompt.user,
            });

            if use_cache {
                body["prompt_cache_key"] = prompt_hash.into();
                body["prompt_cache_retention"] = "24h".into();
            }

            Ok((
                url,
                vec![("Authorization", format!("Bearer {}", cfg.api_key))],
                body,
            ))
        }

        Provider::Anthropic => {
            let url = cfg.base_url.clone().unwrap_or_else(|| ANTHROPIC_URL.into());

            let body = serde_json::json!({
                "model": cfg.model,
                "max_tokens": MAX_TOKENS,
                "system": prompt.system,
                "messages": [
                    { "role": "user", "content": prompt.user }
                ]
            });

            Ok((
                url,
                vec![
                    ("x-api-key", cfg.api_key.clone()),
                    ("anthropic-version", ANTHROPIC_VERSION.into()),
                ],
                body,
            ))
        }
    }
}

pub(crate) fn extract_text(provider: &Provider, v: &Value) -> Result<String, LlmError> {
    match provider {
        Provider::Ollama => Err(LlmError::NotRemote(provider.name())),

        Provider::OpenAI => v
            .get("output")
            .and_then(|o| o.as_array())
            .and_then(|arr| {
                arr.iter().find_map(|item| {
                    item.get("content")?
                        .as_array()?
                        .iter()
                        .find_map(|c| c.get("text")?.as_str())
                })
            })
            .map(str::to_owned)
            .ok_or(LlmError::Parse("OpenAI")),

        Provider::Anthropic => v
            .pointer("/content/0/text")
            .and_then(|v| v.as_str())
            .map(str::to_owned)
            .ok_or(LlmError::Parse("Anthropic")),
    }
}
