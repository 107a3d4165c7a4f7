//! Positional merge of validation results back onto the original comments.

use std::collections::HashMap;

use serde::Serialize;
use warden_core::{LibraryChangeType, PerCommentResult, ReviewComment};

/// Diagnostic record for a comment whose body was replaced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeNote {
    /// Position of the corrected comment.
    pub position: usize,
    /// Library the correction concerns, when reported.
    pub library: Option<String>,
    /// Change category, when reported.
    pub change_type: Option<LibraryChangeType>,
}

/// Comments after merging, plus one note per replaced body.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Same length and order as the input.
    pub comments: Vec<ReviewComment>,
    /// Corrections that were applied.
    pub notes: Vec<MergeNote>,
    /// Positions whose result is library related, duplicates and unknown ids
    /// excluded.
    pub library_related: usize,
}

/// Merge `results` onto `original` by positional id.
///
/// Only a result that is library related, flagged for validation, and
/// carries a non-blank replacement changes anything; that position gets a
/// new comment with the replacement body. Every other position is copied
/// unchanged. When the backend repeats an id, the first result wins.
///
/// # Examples
///
/// ```
/// use warden_core::{PerCommentResult, ReviewComment};
/// use warden_review::merge::merge_results;
///
/// let original = vec![ReviewComment {
///     path: "src/App.tsx".into(),
///     line: 3,
///     start_line: None,
///     body: "uses react 17 pattern".into(),
///     kind: "suggestion".into(),
/// }];
/// let results: Vec<PerCommentResult> = serde_json::from_str(r#"[{
///     "id": "0",
///     "is_library_related": true,
///     "needs_validation": true,
///     "enhanced_comment": "Use React 18 concurrent features"
/// }]"#).unwrap();
///
/// let merged = merge_results(&original, &results);
/// assert_eq!(merged.comments[0].body, "Use React 18 concurrent features");
/// assert_eq!(original[0].body, "uses react 17 pattern");
/// ```
pub fn merge_results(original: &[ReviewComment], results: &[PerCommentResult]) -> MergeOutcome {
    let mut by_id: HashMap<&str, &PerCommentResult> = HashMap::with_capacity(results.len());
    for result in results {
        by_id.entry(result.id.as_str()).or_insert(result);
    }

    let mut notes = Vec::new();
    let mut library_related = 0;
    let comments = original
        .iter()
        .enumerate()
        .map(|(position, comment)| {
            let id = position.to_string();
            let matched = by_id.get(id.as_str()).copied();
            if matched.is_some_and(|r| r.is_library_related) {
                library_related += 1;
            }
            let correction = matched.and_then(|r| r.correction().map(|text| (r, text)));
            let Some((result, text)) = correction else {
                return comment.clone();
            };

            let library = result.library_info.as_ref().map(|i| i.name.clone());
            let change_type = result.library_info.as_ref().map(|i| i.change_type);
            tracing::debug!(
                position,
                library = library.as_deref().unwrap_or("unknown"),
                change_type = %change_type.map(|c| c.to_string()).unwrap_or_default(),
                "replacing library comment with validated text"
            );
            notes.push(MergeNote {
                position,
                library,
                change_type,
            });
            comment.with_body(text)
        })
        .collect();

    MergeOutcome {
        comments,
        notes,
        library_related,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comments(n: usize) -> Vec<ReviewComment> {
        (0..n)
            .map(|i| ReviewComment {
                path: format!("src/file{i}.ts"),
                line: (i as u32) + 1,
                start_line: None,
                body: format!("body {i}"),
                kind: "issue".into(),
            })
            .collect()
    }

    fn result(id: &str, library: bool, validate: bool, text: Option<&str>) -> PerCommentResult {
        PerCommentResult {
            id: id.into(),
            is_library_related: library,
            needs_validation: validate,
            library_info: None,
            validation_result: None,
            enhanced_comment: text.map(String::from),
            processing_notes: Vec::new(),
        }
    }

    #[test]
    fn empty_results_copy_input() {
        let original = comments(3);
        let merged = merge_results(&original, &[]);
        assert_eq!(merged.comments, original);
        assert!(merged.notes.is_empty());
    }

    #[test]
    fn only_actionable_results_change_bodies() {
        let original = comments(5);
        let results = vec![
            result("0", true, true, Some("fixed 0")),
            result("1", true, false, Some("ignored: no validation needed")),
            result("2", false, true, Some("ignored: not library")),
            result("3", true, true, None),
        ];
        let merged = merge_results(&original, &results);
        assert_eq!(merged.comments.len(), 5);
        assert_eq!(merged.comments[0].body, "fixed 0");
        for i in 1..5 {
            assert_eq!(merged.comments[i], original[i]);
        }
        assert_eq!(merged.notes.len(), 1);
        assert_eq!(merged.notes[0].position, 0);
    }

    #[test]
    fn correction_keeps_location_fields() {
        let original = comments(2);
        let merged = merge_results(&original, &[result("1", true, true, Some("new"))]);
        assert_eq!(merged.comments[1].path, original[1].path);
        assert_eq!(merged.comments[1].line, original[1].line);
        assert_eq!(merged.comments[1].kind, original[1].kind);
    }

    #[test]
    fn unknown_and_out_of_range_ids_are_ignored() {
        let original = comments(2);
        let results = vec![
            result("7", true, true, Some("nowhere")),
            result("abc", true, true, Some("nowhere")),
            result("-1", true, true, Some("nowhere")),
        ];
        let merged = merge_results(&original, &results);
        assert_eq!(merged.comments, original);
    }

    #[test]
    fn first_duplicate_wins() {
        let original = comments(1);
        let results = vec![
            result("0", true, true, Some("first")),
            result("0", true, true, Some("second")),
        ];
        let merged = merge_results(&original, &results);
        assert_eq!(merged.comments[0].body, "first");
    }

    #[test]
    fn library_count_ignores_duplicates_and_unknown_ids() {
        let original = comments(2);
        let results = vec![
            result("0", true, false, None),
            result("0", true, true, Some("dup")),
            result("1", false, false, None),
            result("5", true, true, Some("nowhere")),
        ];
        let merged = merge_results(&original, &results);
        assert_eq!(merged.library_related, 1);
        assert!(merged.library_related <= original.len());
    }

    #[test]
    fn results_order_does_not_matter() {
        let original = comments(3);
        let results = vec![
            result("2", true, true, Some("two")),
            result("0", true, true, Some("zero")),
        ];
        let merged = merge_results(&original, &results);
        assert_eq!(merged.comments[0].body, "zero");
        assert_eq!(merged.comments[1], original[1]);
        assert_eq!(merged.comments[2].body, "two");
        let positions: Vec<usize> = merged.notes.iter().map(|n| n.position).collect();
        assert_eq!(positions, vec![0, 2]);
    }

    #[test]
    fn note_records_library_details() {
        let original = comments(1);
        let mut r = result("0", true, true, Some("Use lodash 4 imports"));
        r.library_info = Some(warden_core::LibraryInfo {
            name: "lodash".into(),
            version: Some("3.10.1".into()),
            methods: vec![],
            change_type: LibraryChangeType::BreakingChange,
            language: None,
            context: None,
        });
        let merged = merge_results(&original, &[r]);
        assert_eq!(merged.notes[0].library.as_deref(), Some("lodash"));
        assert_eq!(
            merged.notes[0].change_type,
            Some(LibraryChangeType::BreakingChange)
        );
    }
}
