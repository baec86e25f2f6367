//! File schemas and pure row parsing for the three upload formats.
//!
//! Files are tab-delimited UTF-8 with a mandatory header row whose column
//! names and order must match the schema exactly. A parser is a pure
//! function from a raw row to a [`Record`] variant or a [`RowError`];
//! callers collect row results into an aggregate instead of aborting on
//! the first bad row.

use std::fmt;

use serde::Serialize;

use crate::normalize::normalize;
use crate::records::{is_valid_judgment, AnnotationRecord, InstanceRecord, Record, UseRecord};
use crate::span::Span;

/// Column delimiter of all upload files.
pub const DELIMITER: char = '\t';

/// Expected columns of a `uses.csv` file, in order.
pub const USE_COLUMNS: &[&str] = &[
    "lemma",
    "pos",
    "date",
    "grouping",
    "identifier",
    "description",
    "context",
    "indexes_target_token",
    "indexes_target_sentence",
];

/// Expected columns of an `instances.csv` file, in order.
pub const INSTANCE_COLUMNS: &[&str] = &["lemma", "identifier1", "identifier2"];

/// Expected columns of an `annotations.csv` file, in order.
pub const ANNOTATION_COLUMNS: &[&str] = &[
    "identifier1",
    "identifier2",
    "annotator",
    "judgment",
    "comment",
    "lemma",
];

/// The three upload file types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Uses,
    Instances,
    Annotations,
}

impl FileKind {
    /// Canonical file name for this kind.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Uses => "uses.csv",
            Self::Instances => "instances.csv",
            Self::Annotations => "annotations.csv",
        }
    }

    /// The mandatory content columns, in order.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::Uses => USE_COLUMNS,
            Self::Instances => INSTANCE_COLUMNS,
            Self::Annotations => ANNOTATION_COLUMNS,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// A validation failure for one row, carrying the 1-based line number of
/// the offending row (the header is line 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

impl RowError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Validate the header row: at least as many columns as the schema, and
/// the schema's names in the schema's order. Extra trailing columns are
/// tolerated (exports append system columns).
pub fn check_header(kind: FileKind, header: &[&str]) -> Result<(), String> {
    let expected = kind.columns();
    if header.len() < expected.len() {
        return Err(format!(
            "wrong number of columns in header, expected {:?}, found {}",
            expected,
            header.len()
        ));
    }
    for (i, want) in expected.iter().enumerate() {
        if header[i] != *want {
            return Err(format!(
                "wrong column order, expected '{}' at position {}, found '{}'",
                want,
                i + 1,
                header[i]
            ));
        }
    }
    Ok(())
}

/// Parse one data row into a record, performing all single-row structural
/// validation. `line` is the 1-based line number used in error messages.
pub fn parse_row(kind: FileKind, line: usize, fields: &[&str]) -> Result<Record, RowError> {
    let expected = kind.columns().len();
    if fields.len() < expected {
        return Err(RowError::new(
            line,
            format!(
                "wrong number of entries, expected {expected}, found {}",
                fields.len()
            ),
        ));
    }
    match kind {
        FileKind::Uses => parse_use_row(line, fields).map(Record::Use),
        FileKind::Instances => Ok(Record::Instance(InstanceRecord {
            lemma: fields[0].to_string(),
            identifier1: fields[1].to_string(),
            identifier2: fields[2].to_string(),
        })),
        FileKind::Annotations => parse_annotation_row(line, fields).map(Record::Annotation),
    }
}

fn parse_use_row(line: usize, fields: &[&str]) -> Result<UseRecord, RowError> {
    // Normalize before any validation that depends on character offsets.
    let context = normalize(fields[6]);
    let token_span =
        Span::parse(fields[7]).map_err(|message| RowError::new(line, message))?;
    let sentence_span =
        Span::parse(fields[8]).map_err(|message| RowError::new(line, message))?;

    let context_len = context.chars().count();
    if !token_span.fits(context_len) || !sentence_span.fits(context_len) {
        return Err(RowError::new(line, "an index exceeds the context length"));
    }
    if !token_span.within(&sentence_span) {
        return Err(RowError::new(
            line,
            "the target token span is not contained in the target sentence span",
        ));
    }

    Ok(UseRecord {
        lemma: fields[0].to_string(),
        pos: fields[1].to_string(),
        date: fields[2].to_string(),
        grouping: fields[3].to_string(),
        identifier: fields[4].to_string(),
        description: fields[5].to_string(),
        context,
        token_span,
        sentence_span,
    })
}

fn parse_annotation_row(line: usize, fields: &[&str]) -> Result<AnnotationRecord, RowError> {
    let judgment: f32 = fields[3].parse().map_err(|_| {
        RowError::new(line, format!("judgment '{}' is not a number", fields[3]))
    })?;
    if !is_valid_judgment(judgment) {
        return Err(RowError::new(
            line,
            format!("judgment {judgment} is outside the 0..=4 scale (or -1 for none)"),
        ));
    }
    Ok(AnnotationRecord {
        lemma: fields[5].to_string(),
        identifier1: fields[0].to_string(),
        identifier2: fields[1].to_string(),
        annotator: fields[2].to_string(),
        judgment,
        comment: fields[4].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn header_must_match_exactly_in_order() {
        assert!(check_header(FileKind::Instances, &["lemma", "identifier1", "identifier2"]).is_ok());
        // Extra system columns are tolerated.
        assert!(check_header(
            FileKind::Instances,
            &["lemma", "identifier1", "identifier2", "id"]
        )
        .is_ok());
        assert!(check_header(FileKind::Instances, &["lemma", "identifier2", "identifier1"]).is_err());
        assert!(check_header(FileKind::Instances, &["lemma", "identifier1"]).is_err());
    }

    #[test]
    fn short_rows_are_rejected_with_line_number() {
        let err = parse_row(FileKind::Annotations, 7, &["u1", "u2"]).unwrap_err();
        assert_eq!(err.line, 7);
        assert!(err.message.contains("wrong number of entries"));
    }

    #[test]
    fn use_row_parses_and_normalizes_context() {
        let fields = [
            "Schein",
            "NOUN",
            "1857",
            "old",
            "use-1",
            "",
            "der Schein tru\u{0364}gt oft",
            "4:10",
            "0:19",
        ];
        let record = parse_row(FileKind::Uses, 2, &fields).unwrap();
        let use_record = record.as_use().unwrap();
        assert_eq!(use_record.context, "der Schein trügt oft");
        assert_eq!(use_record.token_span, Span { start: 4, end: 10 });
    }

    #[test]
    fn use_row_span_exceeding_context_is_rejected() {
        let fields = [
            "Schein", "NOUN", "1857", "old", "use-1", "", "kurz", "0:3", "0:99",
        ];
        let err = parse_row(FileKind::Uses, 3, &fields).unwrap_err();
        assert!(err.message.contains("exceeds the context length"));
    }

    #[test]
    fn use_row_token_outside_sentence_is_rejected() {
        let fields = [
            "Schein",
            "NOUN",
            "1857",
            "old",
            "use-1",
            "",
            "ein langer Kontext hier",
            "0:10",
            "5:20",
        ];
        let err = parse_row(FileKind::Uses, 4, &fields).unwrap_err();
        assert!(err.message.contains("not contained"));
    }

    #[test]
    fn normalization_happens_before_offset_checks() {
        // "Wa\u{017F}\u{017F}er" is 6 chars raw but 6 -> "Wasser" is also 6;
        // use the combining form instead: "tru\u{0364}gt" is 6 chars raw,
        // 5 after normalization.
        let fields = [
            "Schein", "NOUN", "1857", "old", "use-1", "", "tru\u{0364}gt", "0:5", "0:5",
        ];
        let record = parse_row(FileKind::Uses, 2, &fields).unwrap();
        assert_eq!(record.as_use().unwrap().context, "trügt");
    }

    #[test]
    fn annotation_row_parses_judgment() {
        let fields = ["u1", "u2", "anna", "3.0", "clear case", "Schein"];
        let record = parse_row(FileKind::Annotations, 2, &fields).unwrap();
        let annotation = record.as_annotation().unwrap();
        assert_eq!(annotation.judgment, 3.0);
        assert_eq!(annotation.lemma, "Schein");
    }

    #[test]
    fn annotation_row_rejects_bad_judgments() {
        let bad = ["u1", "u2", "anna", "seven", "", "Schein"];
        assert_matches!(parse_row(FileKind::Annotations, 2, &bad), Err(_));
        let out_of_scale = ["u1", "u2", "anna", "5.0", "", "Schein"];
        assert_matches!(parse_row(FileKind::Annotations, 2, &out_of_scale), Err(_));
        let sentinel = ["u1", "u2", "anna", "-1", "", "Schein"];
        assert!(parse_row(FileKind::Annotations, 2, &sentinel).is_ok());
    }
}
