pub mod backend;
pub mod client;
pub mod ollama;
pub mod prompt;

pub use backend::{Generate, LlmBackend};
pub use client::LlmRunResult;
pub use prompt::LlmPrompt;
