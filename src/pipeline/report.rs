use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::{Result, SliceError};
use crate::pipeline::driver::{RunSummary, SliceFile};
use crate::pipeline::stages::Stage;

/// Where stage output goes: always the console writer, optionally a directory.
pub struct Reporter<W: Write> {
    out: W,
    save_dir: Option<PathBuf>,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, save_dir: Option<PathBuf>) -> Self {
        Self { out, save_dir }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn stage(&mut self, slice: &SliceFile, stage: Stage, text: &str) -> Result<()> {
        let header = match stage {
            Stage::Completion => format!("=== {} :: {} ===", slice.file_name, stage),
            Stage::Analysis => format!(
                "=== {} :: {} ({}::{}) ===",
                slice.file_name, stage, slice.name.source_name, slice.name.function_name
            ),
        };

        self.console(|out| {
            writeln!(out, "{header}")?;
            writeln!(out, "{}", text.trim_end())?;
            writeln!(out)
        })?;

        if let Some(dir) = &self.save_dir {
            save(dir, slice, stage, text)?;
        }

        Ok(())
    }

    pub fn planned(&mut self, slice: &SliceFile) -> Result<()> {
        self.console(|out| {
            writeln!(
                out,
                "would process {} (prefix={}, source={}, function={})",
                slice.file_name,
                slice.name.prefix,
                slice.name.source_name,
                slice.name.function_name
            )
        })
    }

    pub fn summary(&mut self, summary: &RunSummary) -> Result<()> {
        self.console(|out| {
            writeln!(
                out,
                "processed {}, skipped {}, failed {}",
                summary.processed.len(),
                summary.skipped.len(),
                summary.failed.len()
            )?;
            for failure in &summary.failed {
                writeln!(out, "  failed {}: {}", failure.file_name, failure.error)?;
            }
            Ok(())
        })
    }

    fn console(&mut self, f: impl FnOnce(&mut W) -> std::io::Result<()>) -> Result<()> {
        f(&mut self.out)
            .and_then(|_| self.out.flush())
            .map_err(SliceError::Console)
    }
}

fn save(dir: &Path, slice: &SliceFile, stage: Stage, text: &str) -> Result<()> {
    // The full file name keeps distinct slices apart even when their parts
    // would join to the same string.
    let stem = &slice.file_name;

    let (path, body) = match stage {
        Stage::Completion => (dir.join(format!("{stem}.completed.cpp")), text.to_string()),
        Stage::Analysis => (
            dir.join(format!("{stem}.analysis.md")),
            format!(
                "<!-- {} :: {} :: {} -->\n\n{}\n",
                slice.file_name,
                slice.name.function_name,
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                text.trim_end()
            ),
        ),
    };

    let write = || -> std::io::Result<()> {
        fs::create_dir_all(dir)?;
        fs::write(&path, body)
    };

    write().map_err(|source| SliceError::WriteReport {
        path: path.clone(),
        source,
    })?;

    tracing::debug!(path = %path.display(), %stage, "saved stage output");
    Ok(())
}
