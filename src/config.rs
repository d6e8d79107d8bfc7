//! Layered settings: defaults, then `config.toml`, then environment, then flags.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SliceError};

pub const DEFAULT_DIR: &str = "code_slices";
pub const DEFAULT_LIMIT: usize = 4;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    Ollama,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Ollama => "ollama",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAI => "gpt-5.2",
            Provider::Anthropic => "claude-sonnet-4-5",
            Provider::Ollama => "qwen2.5-coder",
        }
    }

    /// Environment variable holding the API key, if the provider needs one.
    fn key_var(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAI => Some("OPENAI_API_KEY"),
            Provider::Anthropic => Some("ANTHROPIC_API_KEY"),
            Provider::Ollama => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = SliceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "anthropic" => Ok(Provider::Anthropic),
            "ollama" => Ok(Provider::Ollama),
            other => Err(SliceError::Config(format!("unknown provider `{other}`"))),
        }
    }
}

/// What to do when reading a slice or an LLM call fails.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure and move on to the next slice.
    #[default]
    Skip,
    /// Stop the run with the error.
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub model: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub dir: PathBuf,
    pub limit: usize,
    pub on_error: FailurePolicy,
    pub out: Option<PathBuf>,
    pub dry_run: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_DIR),
            limit: DEFAULT_LIMIT,
            on_error: FailurePolicy::Skip,
            out: None,
            dry_run: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub run: RunSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct LlmSection {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RunSection {
    pub dir: Option<PathBuf>,
    pub limit: Option<usize>,
    pub on_error: Option<FailurePolicy>,
}

/// Values supplied on the command line. `None` leaves lower layers alone.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub dir: Option<PathBuf>,
    pub limit: Option<usize>,
    pub on_error: Option<FailurePolicy>,
    pub out: Option<PathBuf>,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub llm: ProviderConfig,
    pub run: RunConfig,
}

impl Settings {
    pub fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
        cli: Overrides,
    ) -> Result<Self> {
        let env_provider = env("SLICEFIX_PROVIDER")
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.parse::<Provider>())
            .transpose()?;

        let provider = cli
            .provider
            .or(env_provider)
            .or(file.llm.provider)
            .unwrap_or(Provider::OpenAI);

        let model = cli
            .model
            .or_else(|| env("SLICEFIX_MODEL"))
            .or(file.llm.model)
            .unwrap_or_else(|| provider.default_model().to_string());

        let base_url = cli
            .base_url
            .or_else(|| env("SLICEFIX_BASE_URL"))
            .or(file.llm.base_url);

        let api_key = provider
            .key_var()
            .and_then(|var| env(var))
            .or(file.llm.api_key)
            .unwrap_or_default();

        let limit = cli.limit.or(file.run.limit).unwrap_or(DEFAULT_LIMIT);
        if limit == 0 {
            return Err(SliceError::Config("limit must be at least 1".into()));
        }

        let llm = ProviderConfig {
            provider,
            model,
            api_key,
            base_url,
            timeout_secs: file.llm.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };

        let run = RunConfig {
            dir: cli
                .dir
                .or(file.run.dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DIR)),
            limit,
            on_error: cli.on_error.or(file.run.on_error).unwrap_or_default(),
            out: cli.out,
            dry_run: cli.dry_run,
        };

        Ok(Settings { llm, run })
    }
}

pub fn config_path() -> PathBuf {
    let mut dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.push("slicefix");
    dir.push("config.toml");
    dir
}

/// Read the TOML config. An explicit path must exist; the default one may not.
pub fn load_file(explicit: Option<&Path>) -> Result<FileConfig> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let p = config_path();
            if !p.exists() {
                return Ok(FileConfig::default());
            }
            p
        }
    };

    let raw = fs::read_to_string(&path)
        .map_err(|e| SliceError::Config(format!("{}: {e}", path.display())))?;

    parse_file(&raw).map_err(|e| match e {
        SliceError::Config(msg) => SliceError::Config(format!("{}: {msg}", path.display())),
        other => other,
    })
}

pub fn parse_file(raw: &str) -> Result<FileConfig> {
    toml::from_str(raw).map_err(|e| SliceError::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let s = Settings::resolve(FileConfig::default(), env_of(&[]), Overrides::default()).unwrap();
        assert_eq!(s.llm.provider, Provider::OpenAI);
        assert_eq!(s.llm.model, "gpt-5.2");
        assert_eq!(s.llm.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(s.llm.api_key.is_empty());
        assert_eq!(s.run.dir, PathBuf::from("code_slices"));
        assert_eq!(s.run.limit, 4);
        assert_eq!(s.run.on_error, FailurePolicy::Skip);
    }

    #[test]
    fn file_then_env_then_cli() {
        let file = parse_file(
            r#"
            [llm]
            provider = "anthropic"
            model = "from-file"
            api_key = "file-key"
            timeout_secs = 30

            [run]
            dir = "slices"
            limit = 2
            on_error = "abort"
            "#,
        )
        .unwrap();

        let env = env_of(&[("SLICEFIX_MODEL", "from-env"), ("ANTHROPIC_API_KEY", "env-key")]);
        let cli = Overrides {
            limit: Some(7),
            ..Overrides::default()
        };

        let s = Settings::resolve(file, env, cli).unwrap();
        assert_eq!(s.llm.provider, Provider::Anthropic);
        assert_eq!(s.llm.model, "from-env");
        assert_eq!(s.llm.api_key, "env-key");
        assert_eq!(s.llm.timeout_secs, 30);
        assert_eq!(s.run.dir, PathBuf::from("slices"));
        assert_eq!(s.run.limit, 7);
        assert_eq!(s.run.on_error, FailurePolicy::Abort);
    }

    #[test]
    fn key_variable_follows_provider() {
        let env = env_of(&[("OPENAI_API_KEY", "oa"), ("SLICEFIX_PROVIDER", "ollama")]);
        let s = Settings::resolve(FileConfig::default(), env, Overrides::default()).unwrap();
        assert_eq!(s.llm.provider, Provider::Ollama);
        assert_eq!(s.llm.model, "qwen2.5-coder");
        assert!(s.llm.api_key.is_empty());
    }

    #[test]
    fn unknown_env_provider_is_config_error() {
        let env = env_of(&[("SLICEFIX_PROVIDER", "gemini")]);
        let err = Settings::resolve(FileConfig::default(), env, Overrides::default()).unwrap_err();
        assert!(matches!(err, SliceError::Config(_)));
    }

    #[test]
    fn zero_limit_is_rejected() {
        let cli = Overrides {
            limit: Some(0),
            ..Overrides::default()
        };
        assert!(Settings::resolve(FileConfig::default(), env_of(&[]), cli).is_err());
    }

    #[test]
    fn malformed_toml_is_config_error() {
        assert!(matches!(parse_file("[llm\nmodel="), Err(SliceError::Config(_))));
        assert!(matches!(
            parse_file("[run]\non_error = \"retry\""),
            Err(SliceError::Config(_))
        ));
    }
}
