//! Integration tests for the concurrent parse stage.
//!
//! Real files on disk, real tokio tasks; asserts ordering, error
//! aggregation across files, and the batch-level lemma rules.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use assert_matches::assert_matches;
use lexanno_core::parse::FileKind;
use lexanno_ingest::pipeline::parse_all;
use lexanno_ingest::{IngestConfig, IngestError};
use tempfile::TempDir;

const USES_HEADER: &str =
    "lemma\tpos\tdate\tgrouping\tidentifier\tdescription\tcontext\tindexes_target_token\tindexes_target_sentence";

fn use_line(lemma: &str, identifier: &str) -> String {
    format!("{lemma}\tNOUN\t1850\told\t{identifier}\t\tein kurzer Kontext\t0:3\t0:18")
}

fn write_uses_file(dir: &TempDir, name: &str, lemma: &str, identifiers: &[&str]) -> PathBuf {
    let mut text = String::from(USES_HEADER);
    for identifier in identifiers {
        text.push('\n');
        text.push_str(&use_line(lemma, identifier));
    }
    text.push('\n');
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

#[tokio::test]
async fn output_is_index_aligned_with_input_paths() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        write_uses_file(&dir, "bank.csv", "Bank", &["b1", "b2", "b3"]),
        write_uses_file(&dir, "blatt.csv", "Blatt", &["l1"]),
        write_uses_file(&dir, "schein.csv", "Schein", &["s1", "s2"]),
    ];

    // One permit forces the files through sequentially; order must still
    // match the input, not completion time.
    let config = IngestConfig {
        max_parallel_files: 1,
        ..IngestConfig::default()
    };
    let files = parse_all(&config, FileKind::Uses, &paths, false, None)
        .await
        .unwrap();

    assert_eq!(files.len(), 3);
    assert_eq!(files[0].len(), 3);
    assert_eq!(files[0][0].lemma(), "Bank");
    assert_eq!(files[1].len(), 1);
    assert_eq!(files[1][0].lemma(), "Blatt");
    assert_eq!(files[2].len(), 2);
    assert_eq!(files[2][0].lemma(), "Schein");
}

#[tokio::test]
async fn validation_errors_from_all_files_are_aggregated() {
    let dir = TempDir::new().unwrap();
    let good = write_uses_file(&dir, "bank.csv", "Bank", &["b1"]);
    let dup = write_uses_file(&dir, "blatt.csv", "Blatt", &["l1", "l1"]);
    let short = dir.path().join("schein.csv");
    fs::write(&short, format!("{USES_HEADER}\nSchein\tNOUN\n")).unwrap();

    let err = parse_all(
        &IngestConfig::default(),
        FileKind::Uses,
        &[good, dup, short],
        false,
        None,
    )
    .await
    .unwrap_err();

    let IngestError::Validation(failures) = err else {
        panic!("expected a validation failure");
    };
    assert_eq!(failures.len(), 2);
    let files: HashSet<&str> = failures.iter().map(|f| f.file.as_str()).collect();
    assert!(files.contains("blatt.csv"));
    assert!(files.contains("schein.csv"));
}

#[tokio::test]
async fn one_lemma_may_not_span_two_uses_files() {
    let dir = TempDir::new().unwrap();
    let first = write_uses_file(&dir, "bank1.csv", "Bank", &["b1"]);
    let second = write_uses_file(&dir, "bank2.csv", "Bank", &["b2"]);

    let err = parse_all(
        &IngestConfig::default(),
        FileKind::Uses,
        &[first, second],
        false,
        None,
    )
    .await
    .unwrap_err();

    let IngestError::Validation(failures) = err else {
        panic!("expected a validation failure");
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].file, "bank2.csv");
    assert!(failures[0].errors[0].message.contains("Bank"));
}

#[tokio::test]
async fn unreadable_files_fail_the_whole_batch() {
    let dir = TempDir::new().unwrap();
    let good = write_uses_file(&dir, "bank.csv", "Bank", &["b1"]);
    let missing = dir.path().join("missing.csv");

    let err = parse_all(
        &IngestConfig::default(),
        FileKind::Uses,
        &[good, missing],
        false,
        None,
    )
    .await
    .unwrap_err();
    assert_matches!(err, IngestError::System { .. });
}

#[tokio::test]
async fn companion_identifiers_gate_pair_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("instances.csv");
    fs::write(
        &path,
        "lemma\tidentifier1\tidentifier2\nBank\tb1\tb2\nBank\tb1\tb9\n",
    )
    .unwrap();

    let companion: HashSet<String> = ["b1".to_string(), "b2".to_string()].into();
    let err = parse_all(
        &IngestConfig::default(),
        FileKind::Instances,
        std::slice::from_ref(&path),
        false,
        Some(companion),
    )
    .await
    .unwrap_err();

    let IngestError::Validation(failures) = err else {
        panic!("expected a validation failure");
    };
    assert_eq!(failures[0].errors[0].line, 3);
    assert!(failures[0].errors[0].message.contains("b9"));
}
