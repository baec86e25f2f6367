//! Integration tests for the tutorial flow.
//!
//! Uploads a small gold standard from files and runs a session to both
//! outcomes.

use std::fs;
use std::path::PathBuf;

use lexanno_ingest::tutorial::{start_tutorial, upload_tutorial, TutorialUpload};
use lexanno_ingest::{IngestConfig, IngestError};
use sqlx::PgPool;
use tempfile::TempDir;

const USES_HEADER: &str =
    "lemma\tpos\tdate\tgrouping\tidentifier\tdescription\tcontext\tindexes_target_token\tindexes_target_sentence";
const ANNOTATIONS_HEADER: &str = "identifier1\tidentifier2\tannotator\tjudgment\tcomment\tlemma";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write_uses_file(dir: &TempDir, identifiers: &[&str]) -> PathBuf {
    let mut text = String::from(USES_HEADER);
    for identifier in identifiers {
        text.push_str(&format!(
            "\nMaus\tNOUN\t1850\told\t{identifier}\t\tein kurzer Kontext\t0:3\t0:18"
        ));
    }
    let path = dir.path().join("tutorial_uses.csv");
    fs::write(&path, text).unwrap();
    path
}

fn write_gold_file(dir: &TempDir, rows: &[(&str, &str, f32)]) -> PathBuf {
    let mut text = String::from(ANNOTATIONS_HEADER);
    for (id1, id2, judgment) in rows {
        text.push_str(&format!("\n{id1}\t{id2}\tgold\t{judgment}\t\tMaus"));
    }
    let path = dir.path().join("tutorial_gold.csv");
    fs::write(&path, text).unwrap();
    path
}

/// Upload a four-use tutorial with gold judgments over three pairs.
/// Returns the judgments in pair-identity order, which is the order a
/// session presents them.
async fn seed_tutorial(pool: &PgPool, dir: &TempDir, language: &str) -> Vec<f32> {
    let judgments = [
        ("t1", "t2", 1.0f32),
        ("t1", "t3", 3.0),
        ("t2", "t4", 4.0),
    ];
    let summary = upload_tutorial(
        pool,
        &IngestConfig::default(),
        TutorialUpload {
            language: language.to_string(),
            uses_file: write_uses_file(dir, &["t1", "t2", "t3", "t4"]),
            gold_file: write_gold_file(dir, &judgments),
        },
    )
    .await
    .unwrap();
    assert_eq!(summary.uses, 4);
    assert_eq!(summary.gold_annotations, 3);

    // Use ids ascend in file order, so pair-identity order matches the
    // gold file's row order here.
    judgments.iter().map(|(_, _, judgment)| *judgment).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn test_matching_judgments_pass_the_tutorial(pool: PgPool) {
    let dir = TempDir::new().unwrap();
    let gold = seed_tutorial(&pool, &dir, "de").await;

    let start = start_tutorial(&pool, "de").await.unwrap();
    assert_eq!(start.uses.len(), 4);
    assert_eq!(start.session.len(), gold.len());

    let mut session = start.session;
    for judgment in &gold {
        assert!(session.current_pair().is_some());
        session.record_judgment(f64::from(*judgment));
    }
    assert!(session.is_complete());

    let outcome = session.outcome().unwrap();
    assert!(outcome.passed);
    assert!(outcome.rho > 0.99);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_anticorrelated_judgments_fail_the_tutorial(pool: PgPool) {
    let dir = TempDir::new().unwrap();
    let gold = seed_tutorial(&pool, &dir, "de").await;

    let mut session = start_tutorial(&pool, "de").await.unwrap().session;
    for judgment in gold.iter().rev() {
        session.record_judgment(f64::from(*judgment));
    }

    let outcome = session.outcome().unwrap();
    assert!(!outcome.passed);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_one_tutorial_per_language(pool: PgPool) {
    let dir = TempDir::new().unwrap();
    seed_tutorial(&pool, &dir, "de").await;

    let err = upload_tutorial(
        &pool,
        &IngestConfig::default(),
        TutorialUpload {
            language: "de".to_string(),
            uses_file: write_uses_file(&dir, &["t1", "t2"]),
            gold_file: write_gold_file(&dir, &[("t1", "t2", 2.0)]),
        },
    )
    .await
    .unwrap_err();
    match err {
        IngestError::Invalid(message) => assert!(message.contains("already exists")),
        other => panic!("unexpected error: {other}"),
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_gold_judgments_must_carry_values(pool: PgPool) {
    let dir = TempDir::new().unwrap();

    let err = upload_tutorial(
        &pool,
        &IngestConfig::default(),
        TutorialUpload {
            language: "de".to_string(),
            uses_file: write_uses_file(&dir, &["t1", "t2", "t3"]),
            gold_file: write_gold_file(&dir, &[("t1", "t2", 2.0), ("t1", "t3", -1.0)]),
        },
    )
    .await
    .unwrap_err();

    let IngestError::Validation(failures) = err else {
        panic!("expected a validation failure");
    };
    assert_eq!(failures[0].errors[0].line, 3);
    assert!(failures[0].errors[0].message.contains("must carry a value"));

    // The failed upload left nothing behind.
    match start_tutorial(&pool, "de").await.unwrap_err() {
        IngestError::Invalid(message) => assert!(message.contains("de")),
        other => panic!("unexpected error: {other}"),
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_missing_language_is_reported(pool: PgPool) {
    let err = start_tutorial(&pool, "sv").await.unwrap_err();
    match err {
        IngestError::Invalid(message) => assert!(message.contains("sv")),
        other => panic!("unexpected error: {other}"),
    }
}
