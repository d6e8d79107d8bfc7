use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use slicefix::config::{self, FailurePolicy, Overrides, Provider, Settings};
use slicefix::llm::LlmBackend;
use slicefix::pipeline::{self, Reporter};
use slicefix::{logger, Result, SliceError};

#[derive(Parser)]
#[command(
    name = "slicefix",
    version,
    about = "Complete C/C++ code slices with an LLM, then review the completed code."
)]
struct Cli {
    /// Directory holding `<prefix>_<source>.cpp_<function>.cpp` slices
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Stop after this many slices have been processed
    #[arg(long)]
    limit: Option<usize>,

    /// What to do when a slice cannot be read or a model call fails
    #[arg(long, value_enum)]
    on_error: Option<FailurePolicy>,

    #[arg(long, value_enum)]
    provider: Option<Provider>,

    #[arg(long)]
    model: Option<String>,

    #[arg(long)]
    base_url: Option<String>,

    /// Also write each stage's output into this directory
    #[arg(long)]
    out: Option<PathBuf>,

    /// Do not send a prompt cache key to the provider
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// List the slices that would be processed without calling the model
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Config file (default: <config dir>/slicefix/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let file = config::load_file(cli.config.as_deref())?;
    let overrides = Overrides {
        provider: cli.provider,
        model: cli.model,
        base_url: cli.base_url,
        dir: cli.dir,
        limit: cli.limit,
        on_error: cli.on_error,
        out: cli.out,
        dry_run: cli.dry_run,
    };
    let settings = Settings::resolve(file, |k| std::env::var(k).ok(), overrides)?;

    let mut reporter = Reporter::new(io::stdout().lock(), settings.run.out.clone());

    let summary = if settings.run.dry_run {
        pipeline::plan(&settings.run, &mut reporter)?
    } else {
        let backend = LlmBackend::from_config(settings.llm.clone(), !cli.no_cache)
            .map_err(|e| SliceError::Config(e.to_string()))?;

        tracing::info!(
            backend = %backend.describe(),
            dir = %settings.run.dir.display(),
            limit = settings.run.limit,
            "starting run"
        );

        pipeline::run(&backend, &settings.run, &mut reporter)?
    };

    tracing::info!(
        processed = summary.processed.len(),
        skipped = summary.skipped.len(),
        failed = summary.failed.len(),
        "run finished"
    );
    reporter.summary(&summary)
}
