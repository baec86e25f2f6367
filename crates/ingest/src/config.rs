//! Ingestion configuration loaded from environment variables.

/// Tunables for the concurrent parse stage.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Maximum number of files parsed concurrently (default: `8`).
    pub max_parallel_files: usize,
    /// Per-file parse time limit in seconds (default: `120`).
    pub task_timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_parallel_files: 8,
            task_timeout_secs: 120,
        }
    }
}

impl IngestConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default |
    /// |-----------------------------|---------|
    /// | `INGEST_MAX_PARALLEL_FILES` | `8`     |
    /// | `INGEST_TASK_TIMEOUT_SECS`  | `120`   |
    pub fn from_env() -> Self {
        let max_parallel_files: usize = std::env::var("INGEST_MAX_PARALLEL_FILES")
            .unwrap_or_else(|_| "8".into())
            .parse()
            .expect("INGEST_MAX_PARALLEL_FILES must be a valid usize");

        let task_timeout_secs: u64 = std::env::var("INGEST_TASK_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("INGEST_TASK_TIMEOUT_SECS must be a valid u64");

        Self {
            max_parallel_files,
            task_timeout_secs,
        }
    }
}
