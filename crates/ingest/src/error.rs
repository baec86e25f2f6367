//! Ingestion error taxonomy.
//!
//! Validation problems are values all the way up: a bad row is a
//! [`RowError`](lexanno_core::parse::RowError), a bad file aggregates
//! them into a [`FileError`], and a failed batch carries every file's
//! errors so the uploader can fix them all in one pass. Infrastructure
//! failures are collapsed into an opaque [`IngestError::System`] that
//! exposes only a correlation token; the underlying cause goes to the
//! log.

use std::fmt;

use chrono::Utc;
use lexanno_core::parse::RowError;
use lexanno_core::types::Timestamp;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// All validation failures of one upload file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    /// File name as submitted by the uploader.
    pub file: String,
    pub errors: Vec<RowError>,
}

impl FileError {
    pub fn new(file: impl Into<String>, errors: Vec<RowError>) -> Self {
        Self {
            file: file.into(),
            errors,
        }
    }
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.file)?;
        for error in &self.errors {
            writeln!(f, "  {error}")?;
        }
        Ok(())
    }
}

/// Top-level ingestion failure.
#[derive(Debug, Error)]
pub enum IngestError {
    /// One or more files failed validation. Nothing was written.
    #[error("validation failed in {} file(s)", .0.len())]
    Validation(Vec<FileError>),

    /// A file exceeded the per-file parse time limit. Nothing was written.
    #[error("parsing '{file}' exceeded the {limit_secs}s time limit")]
    Timeout { file: String, limit_secs: u64 },

    /// A user-correctable failure of a single interactive operation.
    #[error("{0}")]
    Invalid(String),

    /// An infrastructure failure. The cause is logged under `token`; the
    /// variant itself is safe to show to the uploader.
    #[error("internal error, reference {token}")]
    System { token: Uuid, occurred_at: Timestamp },
}

impl IngestError {
    /// Wrap an infrastructure failure: log the cause with a fresh
    /// correlation token and return the opaque variant.
    pub fn system(cause: impl fmt::Display) -> Self {
        let token = Uuid::new_v4();
        let occurred_at = Utc::now();
        error!(%token, cause = %cause, "ingestion failed");
        Self::System {
            token,
            occurred_at,
        }
    }

    /// Validation errors for a single file.
    pub fn single(file_error: FileError) -> Self {
        Self::Validation(vec![file_error])
    }
}

impl From<sqlx::Error> for IngestError {
    fn from(err: sqlx::Error) -> Self {
        Self::system(err)
    }
}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        Self::system(err)
    }
}

impl From<lexanno_core::error::CoreError> for IngestError {
    fn from(err: lexanno_core::error::CoreError) -> Self {
        use lexanno_core::error::CoreError;
        match err {
            // User-correctable domain failures keep their message.
            CoreError::Validation(_) | CoreError::Conflict(_) | CoreError::NotFound { .. } => {
                Self::Invalid(err.to_string())
            }
            CoreError::Internal(_) => Self::system(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_error_lists_rows_with_line_numbers() {
        let err = FileError::new(
            "uses.csv",
            vec![
                RowError::new(3, "wrong number of entries, expected 9, found 4"),
                RowError::new(7, "an index exceeds the context length"),
            ],
        );
        let rendered = err.to_string();
        assert!(rendered.starts_with("uses.csv:"));
        assert!(rendered.contains("line 3:"));
        assert!(rendered.contains("line 7:"));
    }

    #[test]
    fn system_errors_hide_the_cause() {
        let err = IngestError::system("connection refused");
        let rendered = err.to_string();
        assert!(!rendered.contains("connection refused"));
        assert!(rendered.contains("reference"));
    }

    #[test]
    fn validation_report_serializes_per_file() {
        let report = vec![FileError::new(
            "uses.csv",
            vec![RowError::new(3, "wrong number of entries, expected 9, found 4")],
        )];
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json[0]["file"], "uses.csv");
        assert_eq!(json[0]["errors"][0]["line"], 3);
    }
}
