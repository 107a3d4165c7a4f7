use serde::Serialize;
use warden_core::{ReviewComment, WardenError};

use crate::llm::ChatMessage;

const SYSTEM_PROMPT: &str = "\
You validate AI-generated code review comments that may concern third-party \
libraries. For every comment you receive:

1. Decide whether it is library related: it talks about a dependency's \
version, API usage, deprecation, breaking change, or dependency status.
2. If it is library related, check the claim against authoritative sources \
(official documentation, release notes, real-world code). Use the code search \
and documentation lookup tools available to you; do not rely on memory alone.
3. If the comment is correct, leave it alone.
4. If the comment is wrong or outdated, write a corrected replacement.

Rules:
- Return exactly one result per input comment, echoing its id
- Set needs_validation to true only when the comment must be corrected
- enhanced_comment is ONLY for incorrect comments and contains ONLY the \
replacement comment text, with no validation narrative
- Never invent library versions or APIs you could not verify

Respond with a JSON object:
{
  \"comments\": [
    {
      \"id\": \"0\",
      \"is_library_related\": true,
      \"needs_validation\": true,
      \"library_info\": {
        \"name\": \"react\",
        \"version\": \"17.0.2\",
        \"methods\": [\"ReactDOM.render\"],
        \"change_type\": \"version_update\" | \"method_usage\" | \"deprecation\" | \"breaking_change\",
        \"language\": \"typescript\",
        \"context\": \"Short description of the usage\"
      },
      \"validation_result\": {
        \"is_correct\": false,
        \"confidence\": 0.0-1.0,
        \"issues\": [\"...\"],
        \"recommendations\": [\"...\"],
        \"current_usage\": \"...\",
        \"recommended_usage\": \"...\",
        \"breaking_changes\": [\"...\"],
        \"documentation\": \"https://...\"
      },
      \"enhanced_comment\": \"Replacement comment text\",
      \"processing_notes\": [\"...\"]
    }
  ]
}";

const TASK: &str = "classify_and_validate_library_comments";

const INSTRUCTION: &str = "Classify each comment, validate library-related ones against \
authoritative sources, and return one result per comment id.";

/// Build the fixed system prompt for the validation call.
///
/// # Examples
///
/// ```
/// use warden_review::prompt::build_system_prompt;
///
/// let prompt = build_system_prompt();
/// assert!(prompt.contains("enhanced_comment"));
/// ```
pub fn build_system_prompt() -> String {
    SYSTEM_PROMPT.to_string()
}

/// Payload sent as the user message of the batched validation call.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationRequest {
    /// Fixed task tag.
    pub task: String,
    /// `owner/repo`.
    pub repository: String,
    /// Comments addressed by positional id.
    pub comments: Vec<RequestComment>,
    /// What the backend must do with them.
    pub instruction: String,
    /// Additional free-text context.
    pub context: String,
}

/// One comment inside a [`ValidationRequest`].
#[derive(Debug, Clone, Serialize)]
pub struct RequestComment {
    /// Position in the submitted batch.
    pub id: String,
    /// File path.
    pub path: String,
    /// Line number.
    pub line: u32,
    /// Comment text.
    pub body: String,
    /// Comment category.
    #[serde(rename = "type")]
    pub kind: String,
    /// First line of a multi-line comment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
}

/// Build the batched request covering every comment, ids assigned by position.
///
/// # Examples
///
/// ```
/// use warden_core::ReviewComment;
/// use warden_review::prompt::build_validation_request;
///
/// let comments = vec![ReviewComment {
///     path: "src/App.tsx".into(),
///     line: 4,
///     start_line: None,
///     body: "uses react 17 pattern".into(),
///     kind: "suggestion".into(),
/// }];
/// let request = build_validation_request(&comments, "acme", "web", None);
/// assert_eq!(request.repository, "acme/web");
/// assert_eq!(request.comments[0].id, "0");
/// ```
pub fn build_validation_request(
    comments: &[ReviewComment],
    owner: &str,
    repo: &str,
    context: Option<&str>,
) -> ValidationRequest {
    let comments = comments
        .iter()
        .enumerate()
        .map(|(i, c)| RequestComment {
            id: i.to_string(),
            path: c.path.clone(),
            line: c.line,
            body: c.body.clone(),
            kind: c.kind.clone(),
            start_line: c.start_line,
        })
        .collect();

    ValidationRequest {
        task: TASK.into(),
        repository: format!("{owner}/{repo}"),
        comments,
        instruction: INSTRUCTION.into(),
        context: context
            .unwrap_or("Pull request review comments generated by an AI reviewer.")
            .into(),
    }
}

/// System and user messages for one validation call.
///
/// # Errors
///
/// Returns [`WardenError::Serialization`] if the request cannot be encoded.
pub fn build_messages(request: &ValidationRequest) -> Result<Vec<ChatMessage>, WardenError> {
    let payload = serde_json::to_string_pretty(request)?;
    Ok(vec![
        ChatMessage::system(build_system_prompt()),
        ChatMessage::user(payload),
    ])
}
