//! Whole-file validation on top of the row parser.
//!
//! [`parse_file`] runs the header check and every row of one upload file,
//! then applies the file-level rules: duplicate detection, the
//! single-lemma rule, and cross-referencing pair identifiers against a
//! companion use set. All failures for the file come back in one
//! [`FileError`] so the uploader can fix them in a single pass.

use std::collections::{HashMap, HashSet};

use lexanno_core::parse::{check_header, parse_row, FileKind, RowError, DELIMITER};
use lexanno_core::records::Record;

use crate::error::FileError;

/// Parse and validate the full text of one upload file.
///
/// `multiple_allowed` lifts the single-lemma rule (annotation files of an
/// existing project may span lemmas). `companion_identifiers`, when
/// given, is the set of use identifiers the file's pair references must
/// resolve against.
pub fn parse_file(
    kind: FileKind,
    file: &str,
    text: &str,
    multiple_allowed: bool,
    companion_identifiers: Option<&HashSet<String>>,
) -> Result<Vec<Record>, FileError> {
    let mut lines = text.lines();
    let header = match lines.next() {
        Some(line) if !line.trim().is_empty() => line,
        _ => {
            return Err(FileError::new(
                file,
                vec![RowError::new(1, "file is empty")],
            ))
        }
    };

    let mut errors: Vec<RowError> = Vec::new();
    let header_fields: Vec<&str> = header.split(DELIMITER).collect();
    if let Err(message) = check_header(kind, &header_fields) {
        // Without a valid header, row-level errors would be noise.
        return Err(FileError::new(file, vec![RowError::new(1, message)]));
    }

    let mut records: Vec<Record> = Vec::new();
    // Duplicate identities already seen in this file, mapped to the line
    // that introduced them.
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut file_lemma: Option<String> = None;

    for (offset, raw) in lines.enumerate() {
        let line = offset + 2;
        if raw.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = raw.split(DELIMITER).collect();
        let record = match parse_row(kind, line, &fields) {
            Ok(record) => record,
            Err(error) => {
                errors.push(error);
                continue;
            }
        };

        if !multiple_allowed {
            match &file_lemma {
                None => file_lemma = Some(record.lemma().to_string()),
                Some(expected) if record.lemma() != expected => {
                    errors.push(RowError::new(
                        line,
                        format!(
                            "lemma '{}' differs from the file's lemma '{expected}'",
                            record.lemma()
                        ),
                    ));
                    continue;
                }
                Some(_) => {}
            }
        }

        match &record {
            Record::Use(r) => {
                let key = format!("{}\t{}", r.lemma, r.identifier);
                if let Some(first) = seen.insert(key, line) {
                    errors.push(RowError::new(
                        line,
                        format!(
                            "duplicate use identifier '{}' (first on line {first})",
                            r.identifier
                        ),
                    ));
                    continue;
                }
            }
            Record::Instance(r) => {
                if r.identifier1 == r.identifier2 {
                    errors.push(RowError::new(
                        line,
                        "a pair must reference two distinct uses",
                    ));
                    continue;
                }
                if let Some(unknown) =
                    unknown_identifier(companion_identifiers, [&r.identifier1, &r.identifier2])
                {
                    errors.push(RowError::new(
                        line,
                        format!("identifier '{unknown}' does not occur in the uses file"),
                    ));
                    continue;
                }
                let (a, b) = r.pair_key();
                let key = format!("{}\t{a}\t{b}", r.lemma);
                if let Some(first) = seen.insert(key, line) {
                    errors.push(RowError::new(
                        line,
                        format!("duplicate pair (first on line {first})"),
                    ));
                    continue;
                }
            }
            Record::Annotation(r) => {
                if r.identifier1 == r.identifier2 {
                    errors.push(RowError::new(
                        line,
                        "a pair must reference two distinct uses",
                    ));
                    continue;
                }
                if let Some(unknown) =
                    unknown_identifier(companion_identifiers, [&r.identifier1, &r.identifier2])
                {
                    errors.push(RowError::new(
                        line,
                        format!("identifier '{unknown}' does not occur in the uses file"),
                    ));
                    continue;
                }
                let (annotator, a, b) = r.identity();
                let key = format!("{annotator}\t{a}\t{b}");
                if let Some(first) = seen.insert(key, line) {
                    errors.push(RowError::new(
                        line,
                        format!(
                            "duplicate annotation by '{}' for this pair (first on line {first})",
                            r.annotator
                        ),
                    ));
                    continue;
                }
            }
        }

        records.push(record);
    }

    if !errors.is_empty() {
        return Err(FileError::new(file, errors));
    }
    Ok(records)
}

fn unknown_identifier<'a>(
    companion: Option<&HashSet<String>>,
    identifiers: [&'a str; 2],
) -> Option<&'a str> {
    let companion = companion?;
    identifiers
        .into_iter()
        .find(|identifier| !companion.contains(*identifier))
}

#[cfg(test)]
mod tests {
    use super::*;

    const USES_HEADER: &str =
        "lemma\tpos\tdate\tgrouping\tidentifier\tdescription\tcontext\tindexes_target_token\tindexes_target_sentence";

    fn use_line(lemma: &str, identifier: &str) -> String {
        format!("{lemma}\tNOUN\t1850\told\t{identifier}\t\tein kurzer Kontext\t0:3\t0:18")
    }

    #[test]
    fn valid_uses_file_parses_in_order() {
        let text = format!(
            "{USES_HEADER}\n{}\n{}\n",
            use_line("Bank", "u1"),
            use_line("Bank", "u2")
        );
        let records = parse_file(FileKind::Uses, "uses.csv", &text, false, None).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].as_use().unwrap().identifier, "u1");
        assert_eq!(records[1].as_use().unwrap().identifier, "u2");
    }

    #[test]
    fn empty_file_is_rejected() {
        let err = parse_file(FileKind::Uses, "uses.csv", "", false, None).unwrap_err();
        assert_eq!(err.errors[0].line, 1);
        assert!(err.errors[0].message.contains("empty"));
    }

    #[test]
    fn bad_header_short_circuits_row_checks() {
        let text = "lemma\tidentifier\nBank\tu1\n";
        let err = parse_file(FileKind::Uses, "uses.csv", text, false, None).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].line, 1);
    }

    #[test]
    fn duplicate_identifier_cites_both_lines() {
        let text = format!(
            "{USES_HEADER}\n{}\n{}\n{}\n",
            use_line("Bank", "u1"),
            use_line("Bank", "u2"),
            use_line("Bank", "u1")
        );
        let err = parse_file(FileKind::Uses, "uses.csv", &text, false, None).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].line, 4);
        assert!(err.errors[0].message.contains("first on line 2"));
    }

    #[test]
    fn second_lemma_in_a_uses_file_is_rejected() {
        let text = format!(
            "{USES_HEADER}\n{}\n{}\n",
            use_line("Bank", "u1"),
            use_line("Blatt", "u2")
        );
        let err = parse_file(FileKind::Uses, "uses.csv", &text, false, None).unwrap_err();
        assert_eq!(err.errors[0].line, 3);
        assert!(err.errors[0].message.contains("Blatt"));
    }

    #[test]
    fn multiple_errors_are_all_collected() {
        let text = format!(
            "{USES_HEADER}\nBank\tNOUN\n{}\n{}\n",
            use_line("Bank", "u1"),
            use_line("Bank", "u1")
        );
        let err = parse_file(FileKind::Uses, "uses.csv", &text, false, None).unwrap_err();
        assert_eq!(err.errors.len(), 2);
        assert_eq!(err.errors[0].line, 2);
        assert_eq!(err.errors[1].line, 4);
    }

    #[test]
    fn instance_identifiers_must_resolve_against_the_companion() {
        let companion: HashSet<String> = ["u1".to_string(), "u2".to_string()].into();
        let good = "lemma\tidentifier1\tidentifier2\nBank\tu1\tu2\n";
        assert!(
            parse_file(FileKind::Instances, "instances.csv", good, false, Some(&companion))
                .is_ok()
        );

        let bad = "lemma\tidentifier1\tidentifier2\nBank\tu1\tu9\n";
        let err =
            parse_file(FileKind::Instances, "instances.csv", bad, false, Some(&companion))
                .unwrap_err();
        assert!(err.errors[0].message.contains("u9"));
    }

    #[test]
    fn self_pairs_are_rejected() {
        let text = "lemma\tidentifier1\tidentifier2\nBank\tu1\tu1\n";
        let err = parse_file(FileKind::Instances, "instances.csv", text, false, None).unwrap_err();
        assert!(err.errors[0].message.contains("distinct"));
    }

    #[test]
    fn duplicate_annotation_identity_ignores_identifier_order() {
        let text = "identifier1\tidentifier2\tannotator\tjudgment\tcomment\tlemma\n\
                    u1\tu2\tanna\t3.0\t\tBank\n\
                    u2\tu1\tanna\t1.0\t\tBank\n";
        let err =
            parse_file(FileKind::Annotations, "annotations.csv", text, true, None).unwrap_err();
        assert_eq!(err.errors[0].line, 3);
        assert!(err.errors[0].message.contains("anna"));
    }

    #[test]
    fn annotations_may_span_lemmas_when_allowed() {
        let text = "identifier1\tidentifier2\tannotator\tjudgment\tcomment\tlemma\n\
                    u1\tu2\tanna\t3.0\t\tBank\n\
                    u3\tu4\tanna\t2.0\t\tBlatt\n";
        let records =
            parse_file(FileKind::Annotations, "annotations.csv", text, true, None).unwrap();
        assert_eq!(records.len(), 2);
    }
}
