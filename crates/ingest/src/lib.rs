//! Bulk ingestion for annotation projects.
//!
//! Upload files are parsed concurrently ([`pipeline`]), validated per
//! file ([`parser`]), and merged into the database in a single
//! transaction ([`merge`], [`upload`]). The interactive annotation flow
//! ([`process`]) shares the same merge rules.

pub mod config;
pub mod error;
pub mod merge;
pub mod parser;
pub mod pipeline;
pub mod process;
pub mod tutorial;
pub mod upload;

pub use config::IngestConfig;
pub use error::{FileError, IngestError};
