//! Library-validation records exchanged with the AI backend.
//!
//! Field names follow the wire contract of the batch validation response and
//! are therefore snake_case, unlike the camelCase types in [`crate::types`].

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// What kind of library change a comment talks about.
///
/// Unknown tags decode to [`LibraryChangeType::Other`].
///
/// # Examples
///
/// ```
/// use warden_core::LibraryChangeType;
///
/// let t: LibraryChangeType = serde_json::from_str("\"breaking_change\"").unwrap();
/// assert_eq!(t, LibraryChangeType::BreakingChange);
///
/// let odd: LibraryChangeType = serde_json::from_str("\"license\"").unwrap();
/// assert_eq!(odd, LibraryChangeType::Other);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryChangeType {
    /// Dependency version bump.
    VersionUpdate,
    /// Use of a library method or API.
    MethodUsage,
    /// Use of a deprecated API.
    Deprecation,
    /// Change that breaks existing callers.
    BreakingChange,
    /// Anything the backend invented.
    #[serde(other)]
    Other,
}

impl fmt::Display for LibraryChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryChangeType::VersionUpdate => write!(f, "version_update"),
            LibraryChangeType::MethodUsage => write!(f, "method_usage"),
            LibraryChangeType::Deprecation => write!(f, "deprecation"),
            LibraryChangeType::BreakingChange => write!(f, "breaking_change"),
            LibraryChangeType::Other => write!(f, "other"),
        }
    }
}

/// The library a comment refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryInfo {
    /// Package name.
    pub name: String,
    /// Version referenced by the code, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Methods or APIs touched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
    /// Category of the change.
    pub change_type: LibraryChangeType,
    /// Programming language of the usage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Free-text context from the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Where a piece of validation evidence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Code search across public repositories.
    CodeSearch,
    /// General web search.
    WebSearch,
    /// Official documentation lookup.
    DocsLookup,
}

/// One piece of evidence backing a validation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSource {
    /// Provenance of the snippet.
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// Retrieved content.
    pub content: String,
    /// Reliability in `[0.0, 1.0]`.
    #[serde(default)]
    pub reliability: f64,
    /// Link to the source, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Verdict on whether a comment's library claim holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// The original comment is accurate.
    pub is_correct: bool,
    /// Backend confidence.
    #[serde(default)]
    pub confidence: f64,
    /// Problems found with the comment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
    /// Suggested improvements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
    /// Evidence consulted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<ValidationSource>,
    /// How the code currently uses the library.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_usage: Option<String>,
    /// How it should use the library.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_usage: Option<String>,
    /// Breaking changes relevant to the comment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breaking_changes: Vec<String>,
    /// Documentation link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

/// Flattened classification of one comment.
///
/// # Examples
///
/// ```
/// use warden_core::LibraryClassification;
///
/// let c = LibraryClassification::default();
/// assert!(!c.is_library_related);
/// assert!(c.libraries.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryClassification {
    /// The comment concerns a third-party library.
    pub is_library_related: bool,
    /// Change category, when known.
    pub library_type: Option<LibraryChangeType>,
    /// Backend confidence, `0.0` when not reported.
    pub confidence: f64,
    /// Library names involved.
    pub libraries: Vec<String>,
}

/// The backend's answer for one positional comment id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerCommentResult {
    /// Position of the comment in the submitted batch, as a string.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// The comment concerns a third-party library.
    #[serde(default)]
    pub is_library_related: bool,
    /// The comment's library claim needs correcting.
    #[serde(default)]
    pub needs_validation: bool,
    /// Library details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_info: Option<LibraryInfo>,
    /// Validation verdict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_result: Option<ValidationResult>,
    /// Replacement comment text; only set when the original is wrong.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_comment: Option<String>,
    /// Backend notes about how the comment was handled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub processing_notes: Vec<String>,
}

impl PerCommentResult {
    /// Replacement text, if this result asks for one.
    ///
    /// Requires the comment to be library related, flagged for validation,
    /// and to carry a non-blank `enhanced_comment`.
    ///
    /// # Examples
    ///
    /// ```
    /// use warden_core::PerCommentResult;
    ///
    /// let result: PerCommentResult = serde_json::from_str(r#"{
    ///     "id": "0",
    ///     "is_library_related": true,
    ///     "needs_validation": true,
    ///     "enhanced_comment": "Use React 18 concurrent features"
    /// }"#).unwrap();
    /// assert_eq!(result.correction(), Some("Use React 18 concurrent features"));
    /// ```
    pub fn correction(&self) -> Option<&str> {
        if !self.is_library_related || !self.needs_validation {
            return None;
        }
        self.enhanced_comment
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    /// Derive the flattened classification view.
    pub fn classification(&self) -> LibraryClassification {
        LibraryClassification {
            is_library_related: self.is_library_related,
            library_type: self.library_info.as_ref().map(|info| info.change_type),
            confidence: self
                .validation_result
                .as_ref()
                .map(|v| v.confidence)
                .unwrap_or(0.0),
            libraries: self
                .library_info
                .iter()
                .map(|info| info.name.clone())
                .collect(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
