use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{0} response parse failure")]
    Parse(&'static str),

    #[error("{0} is not served by the hosted-provider client")]
    NotRemote(&'static str),

    #[error("API key for {0} is not configured")]
    MissingKey(&'static str),
}

#[derive(Error, Debug)]
pub enum SliceError {
    #[error("cannot list {}: {source}", path.display())]
    ListDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read {}: {source}", path.display())]
    ReadSlice {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} request failed: {source}")]
    Llm {
        stage: &'static str,
        #[source]
        source: LlmError,
    },

    #[error("cannot write to stdout: {0}")]
    Console(#[source] std::io::Error),

    #[error("cannot write {}: {source}", path.display())]
    WriteReport {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl SliceError {
    /// Errors that end the run whatever the failure policy says.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SliceError::ListDir { .. } | SliceError::Console(_) | SliceError::Config(_)
        )
    }
}

pub type Result<T, E = SliceError> = std::result::Result<T, E>;
