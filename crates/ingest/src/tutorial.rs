//! Tutorial ingestion and session assembly.
//!
//! Tutorials live per language: a fixed set of uses plus gold judgments
//! for every pair, both brought in through the same file formats as
//! project uploads. Running a session is in-memory only; nothing about an
//! annotator's tutorial run is persisted.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use lexanno_core::pair::UsePair;
use lexanno_core::parse::{FileKind, RowError};
use lexanno_core::records::{AnnotationRecord, UseRecord, JUDGMENT_NONE};
use lexanno_core::tutorial::TutorialSession;
use lexanno_core::types::DbId;
use lexanno_db::models::tutorial::{CreateGoldAnnotation, CreateTutorialUse, TutorialUse};
use lexanno_db::repositories::TutorialRepo;
use lexanno_db::DbPool;
use tracing::info;

use crate::config::IngestConfig;
use crate::error::{FileError, IngestError};
use crate::pipeline::{file_label, parse_all};

/// A new-tutorial upload request: one uses file (presentation order) and
/// one gold judgments file in the annotations format.
pub struct TutorialUpload {
    pub language: String,
    pub uses_file: PathBuf,
    pub gold_file: PathBuf,
}

/// What a tutorial upload ended up writing.
#[derive(Debug)]
pub struct TutorialSummary {
    pub tutorial_id: DbId,
    pub uses: usize,
    pub gold_annotations: usize,
}

/// A ready-to-run tutorial: the uses to display and the session state.
#[derive(Debug)]
pub struct TutorialStart {
    pub uses: Vec<TutorialUse>,
    pub session: TutorialSession,
}

/// Create the tutorial for a language from upload files, in one
/// transaction. A language can carry only one tutorial.
pub async fn upload_tutorial(
    pool: &DbPool,
    config: &IngestConfig,
    request: TutorialUpload,
) -> Result<TutorialSummary, IngestError> {
    if TutorialRepo::find_by_language(pool, &request.language)
        .await?
        .is_some()
    {
        return Err(IngestError::Invalid(format!(
            "a tutorial for language '{}' already exists",
            request.language
        )));
    }

    let uses_files = parse_all(
        config,
        FileKind::Uses,
        std::slice::from_ref(&request.uses_file),
        false,
        None,
    )
    .await?;
    let use_records: Vec<UseRecord> = uses_files
        .into_iter()
        .flatten()
        .filter_map(|record| record.as_use().cloned())
        .collect();
    let identifiers: HashSet<String> = use_records
        .iter()
        .map(|record| record.identifier.clone())
        .collect();

    let gold_files = parse_all(
        config,
        FileKind::Annotations,
        std::slice::from_ref(&request.gold_file),
        false,
        Some(identifiers),
    )
    .await?;
    let gold_records: Vec<AnnotationRecord> = gold_files
        .into_iter()
        .flatten()
        .filter_map(|record| record.as_annotation().cloned())
        .collect();

    let mut tx = pool.begin().await?;
    let tutorial = TutorialRepo::create(&mut tx, &request.language).await?;

    // File order is presentation order.
    let inputs: Vec<CreateTutorialUse> = use_records
        .iter()
        .enumerate()
        .map(|(position, record)| CreateTutorialUse {
            tutorial_id: tutorial.id,
            position: position as i32,
            context: record.context.clone(),
            token_start: record.token_span.start as i32,
            token_end: record.token_span.end as i32,
            sentence_start: record.sentence_span.start as i32,
            sentence_end: record.sentence_span.end as i32,
        })
        .collect();
    let ids = TutorialRepo::insert_uses(&mut tx, &inputs).await?;
    let id_of: HashMap<&str, DbId> = use_records
        .iter()
        .map(|record| record.identifier.as_str())
        .zip(ids.iter().copied())
        .collect();

    let gold = resolve_gold(tutorial.id, &gold_records, &id_of)
        .map_err(|errors| IngestError::single(FileError::new(file_label(&request.gold_file), errors)))?;
    TutorialRepo::insert_gold_annotations(&mut tx, &gold).await?;
    tx.commit().await?;

    info!(
        language = %request.language,
        uses = ids.len(),
        gold = gold.len(),
        "tutorial upload committed"
    );
    Ok(TutorialSummary {
        tutorial_id: tutorial.id,
        uses: ids.len(),
        gold_annotations: gold.len(),
    })
}

/// Resolve gold rows to insert DTOs. The parse stage has already
/// cross-referenced identifiers; what remains is the gold-specific rules
/// (a judgment value is mandatory, one judgment per pair).
fn resolve_gold(
    tutorial_id: DbId,
    records: &[AnnotationRecord],
    id_of: &HashMap<&str, DbId>,
) -> Result<Vec<CreateGoldAnnotation>, Vec<RowError>> {
    let mut errors: Vec<RowError> = Vec::new();
    let mut seen: HashMap<UsePair, usize> = HashMap::new();
    let mut gold = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let line = index + 2;
        if record.judgment == JUDGMENT_NONE {
            errors.push(RowError::new(line, "a gold judgment must carry a value"));
            continue;
        }
        // Membership and distinctness were checked at parse.
        let (Some(&a), Some(&b)) = (
            id_of.get(record.identifier1.as_str()),
            id_of.get(record.identifier2.as_str()),
        ) else {
            errors.push(RowError::new(line, "identifier does not occur in the uses file"));
            continue;
        };
        let Ok(pair) = UsePair::new(a, b) else {
            errors.push(RowError::new(line, "a pair must reference two distinct uses"));
            continue;
        };
        if let Some(first) = seen.insert(pair, line) {
            errors.push(RowError::new(
                line,
                format!("duplicate gold pair (first on line {first})"),
            ));
            continue;
        }
        gold.push(CreateGoldAnnotation {
            tutorial_id,
            pair,
            judgment: record.judgment,
        });
    }

    if errors.is_empty() {
        Ok(gold)
    } else {
        Err(errors)
    }
}

/// Assemble the tutorial configured for a language.
///
/// The session's pairs come from the gold annotations; the returned uses
/// are in presentation order for display alongside.
pub async fn start_tutorial(
    pool: &DbPool,
    language: &str,
) -> Result<TutorialStart, IngestError> {
    let tutorial = TutorialRepo::find_by_language(pool, language)
        .await?
        .ok_or_else(|| {
            IngestError::Invalid(format!(
                "no tutorial is configured for language '{language}'"
            ))
        })?;

    let uses = TutorialRepo::list_uses(pool, tutorial.id).await?;
    let gold = TutorialRepo::list_gold_annotations(pool, tutorial.id).await?;

    let mut items = Vec::with_capacity(gold.len());
    for row in gold {
        let pair = UsePair::new(row.use1_id, row.use2_id)
            .map_err(|_| IngestError::system("gold annotation with identical use ids"))?;
        items.push((pair, f64::from(row.judgment)));
    }

    Ok(TutorialStart {
        uses,
        session: TutorialSession::new(items),
    })
}
