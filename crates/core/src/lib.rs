//! Pure domain logic for the word-use annotation platform.
//!
//! This crate has zero internal dependencies (no DB, no async, no I/O).
//! It provides:
//!
//! - The deterministic pair sequencer ([`sequencer`])
//! - Unordered use pairs ([`pair`])
//! - Upload record variants and row validation ([`records`], [`parse`])
//! - Legacy orthography normalization ([`normalize`])
//! - Typed annotation filters ([`filter`])
//! - Tutorial scoring via Spearman rank correlation ([`tutorial`])

pub mod context;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod pair;
pub mod parse;
pub mod records;
pub mod sequencer;
pub mod span;
pub mod tutorial;
pub mod types;
