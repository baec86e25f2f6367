//! Concurrent parse stage of the ingestion pipeline.
//!
//! Each upload file gets its own tokio task, bounded by a semaphore so a
//! large batch cannot exhaust the runtime. Results are collected in input
//! order, so the caller can align parsed output with companion files by
//! index. Any timeout or unreadable file fails the whole batch; nothing
//! is written until every file has parsed cleanly.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use lexanno_core::parse::FileKind;
use lexanno_core::records::Record;
use tokio::sync::Semaphore;
use tracing::info;

use crate::config::IngestConfig;
use crate::error::{FileError, IngestError};

/// Parse a batch of same-kind upload files concurrently.
///
/// Returns one record vector per input path, index-aligned with `paths`.
/// Validation failures across all files are aggregated into one
/// [`IngestError::Validation`]; a file exceeding the configured time
/// limit fails the batch with [`IngestError::Timeout`].
pub async fn parse_all(
    config: &IngestConfig,
    kind: FileKind,
    paths: &[PathBuf],
    multiple_allowed: bool,
    companion_identifiers: Option<HashSet<String>>,
) -> Result<Vec<Vec<Record>>, IngestError> {
    let semaphore = Arc::new(Semaphore::new(config.max_parallel_files.max(1)));
    let companion = companion_identifiers.map(Arc::new);
    let limit = Duration::from_secs(config.task_timeout_secs);

    let mut handles = Vec::with_capacity(paths.len());
    for path in paths {
        let semaphore = Arc::clone(&semaphore);
        let companion = companion.clone();
        let path = path.clone();
        handles.push(tokio::spawn(async move {
            // Closing the semaphore is not part of this flow; acquire
            // only fails if it were.
            let _permit = semaphore
                .acquire()
                .await
                .map_err(|err| Task::System(err.to_string()))?;
            let label = file_label(&path);
            let parsed = tokio::time::timeout(limit, parse_one(kind, &path, multiple_allowed, companion))
                .await
                .map_err(|_| Task::Timeout(label.clone()))??;
            info!(file = %label, rows = parsed.len(), "parsed upload file");
            Ok::<Vec<Record>, Task>(parsed)
        }));
    }

    let mut files: Vec<Vec<Record>> = Vec::with_capacity(handles.len());
    let mut failures: Vec<FileError> = Vec::new();
    // join_all preserves input order, which keeps output aligned with
    // `paths` for companion-file matching.
    for joined in futures::future::join_all(handles).await {
        let joined =
            joined.map_err(|err| IngestError::system(format!("parse task panicked: {err}")))?;
        match joined {
            Ok(records) => files.push(records),
            Err(Task::Invalid(file_error)) => failures.push(file_error),
            Err(Task::Timeout(file)) => {
                return Err(IngestError::Timeout {
                    file,
                    limit_secs: config.task_timeout_secs,
                })
            }
            Err(Task::System(cause)) => return Err(IngestError::system(cause)),
        }
    }

    if kind == FileKind::Uses {
        check_lemma_disjointness(&files, paths, &mut failures);
    }

    if !failures.is_empty() {
        return Err(IngestError::Validation(failures));
    }
    Ok(files)
}

/// Per-task outcome before aggregation.
enum Task {
    Invalid(FileError),
    Timeout(String),
    System(String),
}

async fn parse_one(
    kind: FileKind,
    path: &Path,
    multiple_allowed: bool,
    companion: Option<Arc<HashSet<String>>>,
) -> Result<Vec<Record>, Task> {
    let label = file_label(path);
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| Task::System(format!("cannot read '{label}': {err}")))?;
    crate::parser::parse_file(kind, &label, &text, multiple_allowed, companion.as_deref())
        .map_err(Task::Invalid)
}

/// A lemma may not occur in two uses files of one batch; each file has a
/// single lemma by this point, so comparing the first rows suffices.
fn check_lemma_disjointness(
    files: &[Vec<Record>],
    paths: &[PathBuf],
    failures: &mut Vec<FileError>,
) {
    let mut seen: HashSet<&str> = HashSet::new();
    for (records, path) in files.iter().zip(paths) {
        let Some(lemma) = records.first().map(|r| r.lemma()) else {
            continue;
        };
        if !seen.insert(lemma) {
            failures.push(FileError::new(
                file_label(path),
                vec![lexanno_core::parse::RowError::new(
                    2,
                    format!("lemma '{lemma}' already appears in another uses file of this batch"),
                )],
            ));
        }
    }
}

pub(crate) fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
