//! Defensive extraction of the batch validation result from raw AI output.

use serde::Deserialize;
use warden_core::{PerCommentResult, WardenError};

#[derive(Deserialize)]
struct ValidationBatch {
    comments: Vec<PerCommentResult>,
}

/// Parse a raw AI response into per-comment results, in response order.
///
/// Accepts the JSON object on its own, wrapped in markdown code fences, or
/// embedded in surrounding prose. Embedded text must contain exactly one
/// distinct object matching the batch schema; objects nested inside a match
/// are not considered separately, and verbatim repeats of the same answer are
/// tolerated.
///
/// # Errors
///
/// Returns [`WardenError::ResponseParse`] if no matching object is found, or
/// if several matching objects disagree.
///
/// # Examples
///
/// ```
/// use warden_review::response::parse_validation_response;
///
/// let raw = "Here you go:\n```json\n{\"comments\": []}\n```";
/// assert!(parse_validation_response(raw).unwrap().is_empty());
///
/// assert!(parse_validation_response("no json here").is_err());
/// ```
pub fn parse_validation_response(raw: &str) -> Result<Vec<PerCommentResult>, WardenError> {
    let cleaned = strip_code_fences(raw);

    let whole_err = match serde_json::from_str::<ValidationBatch>(cleaned) {
        Ok(batch) => return Ok(batch.comments),
        Err(e) => e,
    };

    let mut found: Option<Vec<PerCommentResult>> = None;
    let mut resume = 0;
    for (start, _) in cleaned.match_indices('{') {
        if start < resume {
            continue;
        }
        let mut stream =
            serde_json::Deserializer::from_str(&cleaned[start..]).into_iter::<ValidationBatch>();
        let Some(Ok(batch)) = stream.next() else {
            continue;
        };
        resume = start + stream.byte_offset();
        tracing::debug!(offset = start, "located validation result inside surrounding text");

        if let Some(first) = &found {
            if *first != batch.comments {
                return Err(WardenError::ResponseParse(
                    "response contains several differing validation result objects".into(),
                ));
            }
        } else {
            found = Some(batch.comments);
        }
    }

    found.ok_or_else(|| {
        WardenError::ResponseParse(format!("no validation result object found ({whole_err})"))
    })
}

fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim();
        }
    }
    if let Some(rest) = trimmed.strip_prefix("```") {
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim();
        }
    }
    trimmed
}
