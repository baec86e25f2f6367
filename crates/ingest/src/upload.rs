//! Upload orchestration: parse, create, merge, all in one transaction.
//!
//! Three entry points mirror what uploaders actually do: bring up a new
//! project from files, add further lemmas to an existing project, and
//! merge externally collected annotations into an existing project. Each
//! call is one transaction; a failing file rolls back everything.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use chrono::Utc;
use lexanno_core::error::CoreError;
use lexanno_core::parse::{FileKind, RowError};
use lexanno_core::pair::UsePair;
use lexanno_core::records::{AnnotationRecord, Record};
use lexanno_core::types::DbId;
use lexanno_db::models::annotation::Annotation;
use lexanno_db::models::instance::CreateInstance;
use lexanno_db::models::project::{CreateProject, Project};
use lexanno_db::models::uses::CreateUse;
use lexanno_db::repositories::{
    InstanceRepo, LemmaRepo, ProjectRepo, UseRepo, UserRepo,
};
use lexanno_db::DbPool;
use tracing::info;

use crate::config::IngestConfig;
use crate::error::{FileError, IngestError};
use crate::merge::{AnnotationMergeEngine, MergeContext, MergePlan};
use crate::pipeline::parse_all;

/// Files accompanying the uses files of a project upload.
pub enum CompanionFiles {
    None,
    /// Curated pair files, index-aligned with the uses files.
    Instances(Vec<PathBuf>),
    /// Annotation files merged right after creation.
    Annotations(Vec<PathBuf>),
}

/// A new-project upload request.
pub struct ProjectUpload {
    pub name: String,
    pub language: String,
    pub created_by: DbId,
    pub uses_files: Vec<PathBuf>,
    pub companion: CompanionFiles,
}

/// What an upload ended up writing.
#[derive(Debug, Default)]
pub struct UploadSummary {
    pub project_id: DbId,
    pub lemmas: usize,
    pub uses: usize,
    pub instances: usize,
    pub annotations_written: usize,
    pub annotations_skipped: usize,
}

/// Create a project from upload files.
///
/// The project gets `all_possible_pairs` exactly when it is uploaded
/// with uses files only. Instance files and annotation files both pin
/// the project to curated pairs: for annotation companions, every
/// imported pair is stored as an instance.
pub async fn upload_project(
    pool: &DbPool,
    config: &IngestConfig,
    request: ProjectUpload,
) -> Result<UploadSummary, IngestError> {
    if ProjectRepo::find_by_name(pool, &request.name).await?.is_some() {
        return Err(IngestError::Invalid(format!(
            "a project named '{}' already exists",
            request.name
        )));
    }

    let uses_files = parse_all(config, FileKind::Uses, &request.uses_files, false, None).await?;
    let identifiers = all_identifiers(&uses_files);

    let companion = match &request.companion {
        CompanionFiles::None => ParsedCompanion::None,
        CompanionFiles::Instances(paths) => {
            if paths.len() != request.uses_files.len() {
                return Err(IngestError::Invalid(format!(
                    "expected one instances file per uses file, got {} for {}",
                    paths.len(),
                    request.uses_files.len()
                )));
            }
            let files =
                parse_all(config, FileKind::Instances, paths, false, Some(identifiers)).await?;
            ParsedCompanion::Instances(paths.clone(), files)
        }
        CompanionFiles::Annotations(paths) => {
            let files =
                parse_all(config, FileKind::Annotations, paths, false, Some(identifiers)).await?;
            ParsedCompanion::Annotations(paths.clone(), files)
        }
    };

    let annotators = match &companion {
        ParsedCompanion::Annotations(_, files) => {
            resolve_annotators(pool, files.iter().flatten()).await?
        }
        _ => HashMap::new(),
    };

    let mut tx = pool.begin().await?;
    let project = ProjectRepo::create(
        &mut tx,
        &CreateProject {
            name: request.name,
            language: request.language,
            created_by: request.created_by,
            all_possible_pairs: matches!(companion, ParsedCompanion::None),
        },
    )
    .await?;

    let mut summary = UploadSummary {
        project_id: project.id,
        ..UploadSummary::default()
    };
    let mut ctx = fresh_context(&project, annotators);
    create_lemmas_and_uses(&mut tx, &project, &uses_files, &mut ctx, &mut summary).await?;

    match companion {
        ParsedCompanion::None => {}
        ParsedCompanion::Instances(paths, files) => {
            create_instances(&mut tx, &project, &paths, &files, &ctx, &mut summary, instance_triple)
                .await?;
        }
        ParsedCompanion::Annotations(paths, files) => {
            // Imported pairs become the project's curated instances, so
            // annotators sequence over exactly what was judged.
            create_instances(
                &mut tx,
                &project,
                &paths,
                &files,
                &ctx,
                &mut summary,
                annotation_triple,
            )
            .await?;
            merge_annotation_files(&mut tx, &paths, &files, &mut ctx, &mut summary).await?;
        }
    }

    tx.commit().await?;
    info!(
        project_id = summary.project_id,
        lemmas = summary.lemmas,
        uses = summary.uses,
        instances = summary.instances,
        annotations = summary.annotations_written,
        "project upload committed"
    );
    Ok(summary)
}

/// Add further lemmas (uses, optionally instances) to an existing
/// project. Lemmas already present in the project are rejected.
pub async fn upload_words_to_existing_project(
    pool: &DbPool,
    config: &IngestConfig,
    project_id: DbId,
    uses_paths: &[PathBuf],
    instances_paths: Option<&[PathBuf]>,
) -> Result<UploadSummary, IngestError> {
    let project = ProjectRepo::find_by_id(pool, project_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "project",
            id: project_id,
        })?;

    let uses_files = parse_all(config, FileKind::Uses, uses_paths, false, None).await?;

    let mut conflicts: Vec<FileError> = Vec::new();
    for (records, path) in uses_files.iter().zip(uses_paths) {
        let Some(lemma) = records.first().map(|record| record.lemma()) else {
            continue;
        };
        if LemmaRepo::find_by_project_and_lemma(pool, project_id, lemma)
            .await?
            .is_some()
        {
            conflicts.push(FileError::new(
                crate::pipeline::file_label(path),
                vec![RowError::new(
                    2,
                    format!("lemma '{lemma}' already exists in the project"),
                )],
            ));
        }
    }
    if !conflicts.is_empty() {
        return Err(IngestError::Validation(conflicts));
    }

    let instance_files = match instances_paths {
        Some(paths) => {
            if paths.len() != uses_paths.len() {
                return Err(IngestError::Invalid(format!(
                    "expected one instances file per uses file, got {} for {}",
                    paths.len(),
                    uses_paths.len()
                )));
            }
            let identifiers = all_identifiers(&uses_files);
            Some((
                paths.to_vec(),
                parse_all(config, FileKind::Instances, paths, false, Some(identifiers)).await?,
            ))
        }
        None => None,
    };

    let mut tx = pool.begin().await?;
    let mut summary = UploadSummary {
        project_id,
        ..UploadSummary::default()
    };
    let mut ctx = fresh_context(&project, HashMap::new());
    create_lemmas_and_uses(&mut tx, &project, &uses_files, &mut ctx, &mut summary).await?;
    if let Some((paths, files)) = instance_files {
        create_instances(&mut tx, &project, &paths, &files, &ctx, &mut summary, instance_triple)
            .await?;
    }
    tx.commit().await?;
    Ok(summary)
}

/// Merge annotation files into an existing project.
///
/// Rows may span the project's lemmas; identifiers resolve against the
/// project's stored uses.
pub async fn upload_annotations_to_existing_project(
    pool: &DbPool,
    config: &IngestConfig,
    project_id: DbId,
    annotation_paths: &[PathBuf],
) -> Result<UploadSummary, IngestError> {
    if ProjectRepo::find_by_id(pool, project_id).await?.is_none() {
        return Err(CoreError::NotFound {
            entity: "project",
            id: project_id,
        }
        .into());
    }

    let files = parse_all(config, FileKind::Annotations, annotation_paths, true, None).await?;
    let records: Vec<AnnotationRecord> = files
        .iter()
        .flatten()
        .filter_map(|record| record.as_annotation().cloned())
        .collect();

    let mut ctx = MergeContext::load(pool, project_id, &records).await?;
    let keys = AnnotationMergeEngine::consulted_keys(&records, &ctx);
    ctx.backfill(pool, &keys).await?;

    let mut tx = pool.begin().await?;
    let mut summary = UploadSummary {
        project_id,
        ..UploadSummary::default()
    };
    merge_annotation_files(&mut tx, annotation_paths, &files, &mut ctx, &mut summary).await?;
    tx.commit().await?;
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

enum ParsedCompanion {
    None,
    Instances(Vec<PathBuf>, Vec<Vec<Record>>),
    Annotations(Vec<PathBuf>, Vec<Vec<Record>>),
}

/// All use identifiers of a parsed batch, for companion cross-reference.
fn all_identifiers(files: &[Vec<Record>]) -> HashSet<String> {
    files
        .iter()
        .flatten()
        .filter_map(|record| record.as_use())
        .map(|record| record.identifier.clone())
        .collect()
}

/// A merge context over a project that has no stored annotations yet
/// (or whose lookups will be filled in as lemmas and uses are created).
fn fresh_context(project: &Project, annotators: HashMap<String, DbId>) -> MergeContext {
    MergeContext {
        project_id: project.id,
        lemma_ids: HashMap::new(),
        use_ids: HashMap::new(),
        annotators,
        existing: HashMap::new(),
    }
}

async fn resolve_annotators(
    pool: &DbPool,
    records: impl Iterator<Item = &Record>,
) -> Result<HashMap<String, DbId>, sqlx::Error> {
    let usernames: Vec<String> = records
        .filter_map(|record| record.as_annotation())
        .map(|record| record.annotator.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    UserRepo::ids_by_usernames(pool, &usernames).await
}

/// Create one lemma per uses file plus its uses, extending the context's
/// lookup maps with the new rows.
async fn create_lemmas_and_uses(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    project: &Project,
    files: &[Vec<Record>],
    ctx: &mut MergeContext,
    summary: &mut UploadSummary,
) -> Result<(), IngestError> {
    for records in files {
        let uses: Vec<_> = records
            .iter()
            .filter_map(|record| record.as_use())
            .collect();
        let Some(first) = uses.first() else {
            continue;
        };

        let lemma = LemmaRepo::create(tx, project.id, &first.lemma).await?;
        let inputs: Vec<CreateUse> = uses
            .iter()
            .map(|record| CreateUse::from_record(lemma.id, record))
            .collect();
        let ids = UseRepo::insert_batch(tx, &inputs).await?;

        for (record, id) in uses.iter().zip(&ids) {
            ctx.use_ids
                .insert((lemma.lemma.clone(), record.identifier.clone()), *id);
        }
        ctx.lemma_ids.insert(lemma.lemma.clone(), lemma.id);
        summary.lemmas += 1;
        summary.uses += ids.len();
    }
    Ok(())
}

/// Resolve a row's `(lemma, identifier, identifier)` triple to a lemma id
/// and a canonical pair via the context maps.
fn resolve_pair(
    ctx: &MergeContext,
    lemma: &str,
    identifier1: &str,
    identifier2: &str,
    line: usize,
) -> Result<(DbId, UsePair), RowError> {
    let Some(&lemma_id) = ctx.lemma_ids.get(lemma) else {
        return Err(RowError::new(line, format!("unknown lemma '{lemma}'")));
    };
    let resolve = |identifier: &str| {
        ctx.use_ids
            .get(&(lemma.to_string(), identifier.to_string()))
            .copied()
            .ok_or_else(|| {
                RowError::new(
                    line,
                    format!("identifier '{identifier}' does not occur in lemma '{lemma}'"),
                )
            })
    };
    let a = resolve(identifier1)?;
    let b = resolve(identifier2)?;
    let pair = UsePair::new(a, b)
        .map_err(|_| RowError::new(line, "a pair must reference two distinct uses"))?;
    Ok((lemma_id, pair))
}

/// Create curated pairs from parsed rows, resolving identifiers against
/// the context maps. `extract` picks the `(lemma, identifier, identifier)`
/// triple out of a record, so instance files and annotation files (where
/// each judged pair becomes an instance) share the path. Duplicate pairs
/// collapse into one row.
async fn create_instances(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    project: &Project,
    paths: &[PathBuf],
    files: &[Vec<Record>],
    ctx: &MergeContext,
    summary: &mut UploadSummary,
    extract: fn(&Record) -> Option<(&str, &str, &str)>,
) -> Result<(), IngestError> {
    let mut failures: Vec<FileError> = Vec::new();
    for (records, path) in files.iter().zip(paths) {
        let mut errors: Vec<RowError> = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let line = index + 2;
            let Some((lemma, identifier1, identifier2)) = extract(record) else {
                continue;
            };
            match resolve_pair(ctx, lemma, identifier1, identifier2, line) {
                Ok((lemma_id, pair)) => {
                    let inserted = InstanceRepo::create(
                        tx,
                        &CreateInstance {
                            project_id: project.id,
                            lemma_id,
                            pair,
                        },
                    )
                    .await?;
                    if inserted {
                        summary.instances += 1;
                    }
                }
                Err(error) => errors.push(error),
            }
        }
        if !errors.is_empty() {
            failures.push(FileError::new(
                crate::pipeline::file_label(path),
                errors,
            ));
        }
    }
    if !failures.is_empty() {
        return Err(IngestError::Validation(failures));
    }
    Ok(())
}

/// Triple extractor for instance rows.
fn instance_triple(record: &Record) -> Option<(&str, &str, &str)> {
    record.as_instance().map(|instance| {
        (
            instance.lemma.as_str(),
            instance.identifier1.as_str(),
            instance.identifier2.as_str(),
        )
    })
}

/// Triple extractor for annotation rows.
fn annotation_triple(record: &Record) -> Option<(&str, &str, &str)> {
    record.as_annotation().map(|annotation| {
        (
            annotation.lemma.as_str(),
            annotation.identifier1.as_str(),
            annotation.identifier2.as_str(),
        )
    })
}

/// Plan and apply each annotation file against the shared context, so a
/// later file sees what an earlier file wrote.
async fn merge_annotation_files(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    paths: &[PathBuf],
    files: &[Vec<Record>],
    ctx: &mut MergeContext,
    summary: &mut UploadSummary,
) -> Result<(), IngestError> {
    let mut failures: Vec<FileError> = Vec::new();
    for (records, path) in files.iter().zip(paths) {
        let annotations: Vec<AnnotationRecord> = records
            .iter()
            .filter_map(|record| record.as_annotation().cloned())
            .collect();
        let plan = AnnotationMergeEngine::plan(&annotations, ctx);
        if !plan.errors.is_empty() {
            failures.push(FileError::new(
                crate::pipeline::file_label(path),
                plan.errors,
            ));
            continue;
        }
        remember_writes(ctx, &plan);
        let outcome = AnnotationMergeEngine::apply(tx, &plan).await?;
        summary.annotations_written += outcome.written;
        summary.annotations_skipped += outcome.skipped;
    }
    if !failures.is_empty() {
        return Err(IngestError::Validation(failures));
    }
    Ok(())
}

/// Record a plan's writes in the cache so a later file of the same batch
/// treats them as stored. Placeholder ids; the cache is only consulted
/// for presence.
fn remember_writes(ctx: &mut MergeContext, plan: &MergePlan) {
    for write in &plan.writes {
        let annotation = Annotation {
            id: 0,
            annotator_id: write.annotator_id,
            use1_id: write.pair.first(),
            use2_id: write.pair.second(),
            judgment: write.judgment,
            comment: write.comment.clone(),
            judged_at: Utc::now(),
        };
        ctx.existing.insert(annotation.key(), annotation);
    }
}
