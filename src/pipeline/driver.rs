//! Batch driver.
//!
//! One pass over the slice directory in file-name order:
//! filter by extension, match the slice naming, read, complete, analyze,
//! count. The pass ends as soon as `limit` slices have been processed.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{FailurePolicy, RunConfig};
use crate::error::{Result, SliceError};
use crate::llm::Generate;
use crate::pipeline::report::Reporter;
use crate::pipeline::stages::{analyze, complete, Stage};
use crate::slice::{classify, Classification, SliceName};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceFile {
    pub path: PathBuf,
    pub file_name: String,
    pub name: SliceName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotCpp,
    NotAFile,
    Unmatched,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::NotCpp => "not a .cpp file",
            SkipReason::NotAFile => "not a regular file",
            SkipReason::Unmatched => "does not match <prefix>_<source>.cpp_<function>.cpp",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub file_name: String,
    pub error: String,
}

/// What one run did. Owned by the driver for the length of the pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: Vec<String>,
    pub skipped: Vec<(String, SkipReason)>,
    pub failed: Vec<Failure>,
    pub quota_reached: bool,
}

/// A directory entry as seen at listing time.
struct Entry {
    path: PathBuf,
    is_file: bool,
}

enum Inspected {
    Skip(SkipReason),
    Candidate(SliceFile),
}

/// Process slices through both stages until the quota is met.
pub fn run<G, W>(llm: &G, cfg: &RunConfig, reporter: &mut Reporter<W>) -> Result<RunSummary>
where
    G: Generate + ?Sized,
    W: Write,
{
    drive(cfg, reporter, |slice, reporter| process(llm, slice, reporter))
}

/// Same selection and quota as [`run`], without reading files or calling the model.
pub fn plan<W: Write>(cfg: &RunConfig, reporter: &mut Reporter<W>) -> Result<RunSummary> {
    drive(cfg, reporter, |slice, reporter| reporter.planned(slice))
}

/// Read one slice and push it through completion then analysis.
///
/// Both stage texts go to the reporter; nothing is kept afterwards.
pub fn process<G, W>(llm: &G, slice: &SliceFile, reporter: &mut Reporter<W>) -> Result<()>
where
    G: Generate + ?Sized,
    W: Write,
{
    let code = read_slice(&slice.path)?;

    let completed = complete(llm, &code)?.text;
    reporter.stage(slice, Stage::Completion, &completed)?;

    let analysis = analyze(llm, &completed, &slice.name)?.text;
    reporter.stage(slice, Stage::Analysis, &analysis)?;

    Ok(())
}

/// Slices are mostly UTF-8, but older sources carry Latin-1 comments.
/// Those bytes are replaced rather than failing the slice.
fn read_slice(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| SliceError::ReadSlice {
        path: path.to_path_buf(),
        source,
    })?;

    match String::from_utf8(bytes) {
        Ok(code) => Ok(code),
        Err(e) => {
            tracing::warn!(
                file = %path.display(),
                valid_up_to = e.utf8_error().valid_up_to(),
                "slice is not valid UTF-8, replacing invalid bytes"
            );
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

fn drive<W, F>(cfg: &RunConfig, reporter: &mut Reporter<W>, mut each: F) -> Result<RunSummary>
where
    W: Write,
    F: FnMut(&SliceFile, &mut Reporter<W>) -> Result<()>,
{
    let entries = list(&cfg.dir)?;
    let mut summary = RunSummary::default();

    tracing::debug!(dir = %cfg.dir.display(), entries = entries.len(), "listed slice directory");

    for entry in entries {
        let file_name = entry
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let slice = match inspect(entry, &file_name) {
            Inspected::Candidate(slice) => slice,
            Inspected::Skip(reason) => {
                if reason == SkipReason::Unmatched {
                    tracing::info!(file = %file_name, "skipping: {reason}");
                } else {
                    tracing::debug!(file = %file_name, "skipping: {reason}");
                }
                summary.skipped.push((file_name, reason));
                continue;
            }
        };

        tracing::info!(
            file = %slice.file_name,
            source = %slice.name.source_name,
            function = %slice.name.function_name,
            "processing slice"
        );

        if let Err(e) = each(&slice, &mut *reporter) {
            if e.is_fatal() {
                return Err(e);
            }
            match cfg.on_error {
                FailurePolicy::Abort => return Err(e),
                FailurePolicy::Skip => {
                    tracing::warn!(file = %slice.file_name, error = %e, "slice failed, continuing");
                    summary.failed.push(Failure {
                        file_name: slice.file_name,
                        error: e.to_string(),
                    });
                    continue;
                }
            }
        }

        summary.processed.push(slice.file_name);

        if summary.processed.len() >= cfg.limit {
            tracing::info!(limit = cfg.limit, "quota reached, stopping");
            summary.quota_reached = true;
            break;
        }
    }

    Ok(summary)
}

fn list(dir: &Path) -> Result<Vec<Entry>> {
    let list_err = |source| SliceError::ListDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(list_err)? {
        let entry = entry.map_err(list_err)?;
        let path = entry.path();
        // Symlinks count as files when their target is one.
        let is_file = match entry.file_type() {
            Ok(ft) if ft.is_symlink() => path.is_file(),
            Ok(ft) => ft.is_file(),
            Err(_) => false,
        };
        entries.push(Entry { path, is_file });
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

fn inspect(entry: Entry, file_name: &str) -> Inspected {
    let name = match classify(file_name) {
        Classification::NotCpp => return Inspected::Skip(SkipReason::NotCpp),
        _ if !entry.is_file => return Inspected::Skip(SkipReason::NotAFile),
        Classification::Unmatched => return Inspected::Skip(SkipReason::Unmatched),
        Classification::Matched(name) => name,
    };

    Inspected::Candidate(SliceFile {
        path: entry.path,
        file_name: file_name.to_string(),
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_are_not_candidates() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("a_b.cpp_c.cpp")).unwrap();

        let entry = list(tmp.path()).unwrap().remove(0);
        assert!(!entry.is_file);
        assert!(matches!(
            inspect(entry, "a_b.cpp_c.cpp"),
            Inspected::Skip(SkipReason::NotAFile)
        ));
    }

    #[test]
    fn listing_is_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["c.txt", "a.txt", "b.txt"] {
            fs::write(tmp.path().join(name), "").unwrap();
        }

        let names: Vec<_> = list(tmp.path())
            .unwrap()
            .into_iter()
            .map(|e| e.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn missing_directory_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = RunConfig {
            dir: tmp.path().join("nope"),
            ..RunConfig::default()
        };
        let mut reporter = Reporter::new(Vec::new(), None);
        assert!(matches!(
            plan(&cfg, &mut reporter),
            Err(SliceError::ListDir { .. })
        ));
    }

    #[test]
    fn latin1_slice_is_read_lossily() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a_b.cpp_c.cpp");
        fs::write(&path, b"int f(); // caf\xe9\n").unwrap();

        let code = read_slice(&path).unwrap();
        assert_eq!(code, "int f(); // caf\u{fffd}\n");
    }

    #[test]
    fn missing_slice_is_read_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = read_slice(&tmp.path().join("gone_a.cpp_b.cpp")).unwrap_err();
        assert!(matches!(err, SliceError::ReadSlice { .. }));
        assert!(!err.is_fatal());
    }
}
