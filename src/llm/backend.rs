use crate::config::{Provider, ProviderConfig};
use crate::error::LlmError;
use crate::llm::client::{LlmClient, LlmRunResult};
use crate::llm::ollama::Ollama;
use crate::llm::prompt::LlmPrompt;

/// Anything that turns a prompt into text. The pipeline only sees this.
pub trait Generate {
    fn generate(&self, prompt: &LlmPrompt) -> Result<LlmRunResult, LlmError>;
}

#[derive(Clone)]
pub enum LlmBackend {
    Ollama(Ollama),
    Remote(LlmClient),
}

impl LlmBackend {
    pub fn from_config(cfg: ProviderConfig, use_cache: bool) -> Result<Self, LlmError> {
        match cfg.provider {
            Provider::Ollama => Ok(LlmBackend::Ollama(Ollama::new(
                cfg.base_url,
                cfg.model,
                cfg.timeout_secs,
            )?)),
            Provider::OpenAI | Provider::Anthropic => {
                Ok(LlmBackend::Remote(LlmClient::new(cfg, use_cache)?))
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            LlmBackend::Ollama(o) => format!("ollama/{}", o.model()),
            LlmBackend::Remote(c) => {
                let cfg = c.config();
                format!("{}/{}", cfg.provider.name(), cfg.model)
            }
        }
    }
}

impl Generate for LlmBackend {
    fn generate(&self, prompt: &LlmPrompt) -> Result<LlmRunResult, LlmError> {
        match self {
            LlmBackend::Ollama(ollama) => {
                // Ollama has no cache metadata
                let text = ollama.run(prompt)?;

                Ok(LlmRunResult {
                    text,
                    prompt_hash: prompt.hash(),
                    cached_tokens: None,
                })
            }

            LlmBackend::Remote(client) => client.run(prompt),
        }
    }
}
