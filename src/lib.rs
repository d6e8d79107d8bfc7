pub mod config;
pub mod error;
pub mod llm;
pub mod logger;
pub mod pipeline;
pub mod slice;

pub use error::{LlmError, Result, SliceError};
