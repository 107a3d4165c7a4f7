use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use warden_core::{EnhancementConfig, PerCommentResult, ReviewComment, WardenError};

use crate::llm::ChatBackend;
use crate::merge::{merge_results, MergeNote};
use crate::prompt;
use crate::response::parse_validation_response;

/// Statistics about one enhancement run.
///
/// # Examples
///
/// ```
/// use warden_review::pipeline::EnhancementStats;
///
/// let stats = EnhancementStats {
///     comments_submitted: 4,
///     library_related: 2,
///     comments_enhanced: 1,
///     model_used: "gpt-4o".into(),
/// };
/// assert!(stats.comments_enhanced <= stats.library_related);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementStats {
    /// Comments sent to the backend.
    pub comments_submitted: usize,
    /// Results classified as library related.
    pub library_related: usize,
    /// Comments whose body was replaced.
    pub comments_enhanced: usize,
    /// Model identifier, empty when no call was made.
    pub model_used: String,
}

/// Result of [`CommentValidationPipeline::enhance_comments`].
///
/// `comments` always has the input's length and order. When `error` is set
/// the pipeline failed open and `comments` is the untouched input.
#[derive(Debug)]
pub struct EnhancementOutcome {
    /// Comments to deliver.
    pub comments: Vec<ReviewComment>,
    /// One note per corrected comment.
    pub notes: Vec<MergeNote>,
    /// Run statistics.
    pub stats: EnhancementStats,
    /// Why enhancement was abandoned, if it was.
    pub error: Option<WardenError>,
}

impl EnhancementOutcome {
    fn passthrough(comments: Vec<ReviewComment>, error: Option<WardenError>) -> Self {
        let stats = EnhancementStats {
            comments_submitted: if error.is_some() { comments.len() } else { 0 },
            ..EnhancementStats::default()
        };
        Self {
            comments,
            notes: Vec::new(),
            stats,
            error,
        }
    }

    /// `true` when the pipeline failed open.
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Post-processes generated review comments, correcting library claims.
///
/// Issues exactly one backend call per batch. Any failure along the way
/// returns the original comments together with the error; a partially merged
/// batch is never produced.
pub struct CommentValidationPipeline {
    backend: Arc<dyn ChatBackend>,
    config: EnhancementConfig,
}

impl CommentValidationPipeline {
    /// Create a pipeline over a chat backend.
    pub fn new(backend: Arc<dyn ChatBackend>, config: EnhancementConfig) -> Self {
        Self { backend, config }
    }

    /// Validate `comments` for `owner/repo` and merge corrections back.
    ///
    /// The backend call is bounded by the configured deadline; dropping the
    /// returned future cancels it.
    pub async fn enhance_comments(
        &self,
        comments: Vec<ReviewComment>,
        owner: &str,
        repo: &str,
    ) -> EnhancementOutcome {
        if comments.is_empty() {
            return EnhancementOutcome::passthrough(comments, None);
        }
        if !self.config.enabled {
            tracing::debug!(owner, repo, "comment enhancement disabled");
            return EnhancementOutcome::passthrough(comments, None);
        }

        let results = match self.validate(&comments, owner, repo).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(
                    owner,
                    repo,
                    comments = comments.len(),
                    error = %e,
                    "comment enhancement failed, delivering original comments"
                );
                return EnhancementOutcome::passthrough(comments, Some(e));
            }
        };

        let merged = merge_results(&comments, &results);
        let stats = EnhancementStats {
            comments_submitted: comments.len(),
            library_related: merged.library_related,
            comments_enhanced: merged.notes.len(),
            model_used: self.backend.model().to_string(),
        };
        tracing::info!(
            owner,
            repo,
            submitted = stats.comments_submitted,
            library_related = stats.library_related,
            enhanced = stats.comments_enhanced,
            "comment enhancement complete"
        );

        EnhancementOutcome {
            comments: merged.comments,
            notes: merged.notes,
            stats,
            error: None,
        }
    }

    async fn validate(
        &self,
        comments: &[ReviewComment],
        owner: &str,
        repo: &str,
    ) -> Result<Vec<PerCommentResult>, WardenError> {
        let request = prompt::build_validation_request(
            comments,
            owner,
            repo,
            self.config.context.as_deref(),
        );
        let messages = prompt::build_messages(&request)?;

        let raw = tokio::time::timeout(self.config.timeout(), self.backend.chat(messages))
            .await
            .map_err(|_| WardenError::Timeout(self.config.timeout_secs))??;

        parse_validation_response(&raw)
    }
}

impl fmt::Display for EnhancementOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Comment Enhancement")?;
        writeln!(f, "===================")?;
        if let Some(e) = &self.error {
            writeln!(f, "Enhancement skipped: {e}")?;
            writeln!(f, "{} comment(s) delivered unchanged.", self.comments.len())?;
            return Ok(());
        }
        writeln!(
            f,
            "Model: {} | Comments: {} | Library related: {} | Enhanced: {}\n",
            if self.stats.model_used.is_empty() {
                "-"
            } else {
                &self.stats.model_used
            },
            self.comments.len(),
            self.stats.library_related,
            self.stats.comments_enhanced,
        )?;
        for note in &self.notes {
            let c = &self.comments[note.position];
            writeln!(
                f,
                "[{}] {}:{} ({})",
                note.library.as_deref().unwrap_or("library"),
                c.path,
                c.line,
                note.change_type
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "unspecified".into()),
            )?;
            writeln!(f, "  {}", c.body)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, Role};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    fn comments() -> Vec<ReviewComment> {
        vec![
            ReviewComment {
                path: "src/App.tsx".into(),
                line: 4,
                start_line: None,
                body: "uses react 17 pattern".into(),
                kind: "suggestion".into(),
            },
            ReviewComment {
                path: "src/util.ts".into(),
                line: 20,
                start_line: Some(18),
                body: "off-by-one in loop".into(),
                kind: "issue".into(),
            },
        ]
    }

    /// Replays one canned answer and records every conversation it receives.
    struct Scripted {
        answer: Result<String, String>,
        calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl Scripted {
        fn ok(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(answer.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Err(message.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatBackend for Scripted {
        fn model(&self) -> &str {
            "gpt-4o"
        }

        async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, WardenError> {
            self.calls.lock().unwrap().push(messages);
            self.answer.clone().map_err(WardenError::Llm)
        }
    }

    fn pipeline(backend: Arc<Scripted>) -> CommentValidationPipeline {
        CommentValidationPipeline::new(backend, EnhancementConfig::default())
    }

    #[tokio::test]
    async fn empty_input_makes_no_call() {
        let backend = Scripted::ok(r#"{"comments": []}"#);
        let outcome = pipeline(backend.clone())
            .enhance_comments(Vec::new(), "o", "r")
            .await;
        assert!(outcome.comments.is_empty());
        assert!(outcome.error.is_none());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn disabled_pipeline_passes_through() {
        let backend = Scripted::ok(r#"{"comments": []}"#);
        let config = EnhancementConfig {
            enabled: false,
            ..EnhancementConfig::default()
        };
        let outcome = CommentValidationPipeline::new(backend.clone(), config)
            .enhance_comments(comments(), "o", "r")
            .await;
        assert_eq!(outcome.comments, comments());
        assert!(!outcome.is_degraded());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn one_call_for_the_whole_batch() {
        let backend = Scripted::ok(r#"{"comments": []}"#);
        let outcome = pipeline(backend.clone())
            .enhance_comments(comments(), "acme", "web")
            .await;
        assert_eq!(outcome.comments, comments());
        assert!(outcome.error.is_none());
        assert_eq!(outcome.stats.comments_submitted, 2);

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let messages = &calls[0];
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[1].content.contains("\"id\": \"0\""));
        assert!(messages[1].content.contains("\"id\": \"1\""));
        assert!(messages[1].content.contains("acme/web"));
    }

    #[tokio::test]
    async fn correction_is_merged_at_its_position() {
        let answer = r#"{"comments": [
            {"id": "0", "is_library_related": true, "needs_validation": true,
             "library_info": {"name": "react", "change_type": "version_update"},
             "enhanced_comment": "Use React 18 concurrent features"},
            {"id": "1", "is_library_related": false, "needs_validation": false}
        ]}"#;
        let outcome = pipeline(Scripted::ok(answer))
            .enhance_comments(comments(), "acme", "web")
            .await;

        assert!(outcome.error.is_none());
        assert_eq!(outcome.comments.len(), 2);
        assert_eq!(outcome.comments[0].body, "Use React 18 concurrent features");
        assert_eq!(outcome.comments[1], comments()[1]);
        assert_eq!(outcome.stats.library_related, 1);
        assert_eq!(outcome.stats.comments_enhanced, 1);
        assert_eq!(outcome.stats.model_used, "gpt-4o");
        assert_eq!(outcome.notes[0].library.as_deref(), Some("react"));
        assert!(outcome.to_string().contains("[react] src/App.tsx:4"));
    }

    #[tokio::test]
    async fn stats_never_exceed_submitted_comments() {
        let answer = r#"{"comments": [
            {"id": "0", "is_library_related": true},
            {"id": "0", "is_library_related": true},
            {"id": "0", "is_library_related": true},
            {"id": "9", "is_library_related": true}
        ]}"#;
        let outcome = pipeline(Scripted::ok(answer))
            .enhance_comments(comments(), "acme", "web")
            .await;
        assert!(outcome.error.is_none());
        assert_eq!(outcome.stats.library_related, 1);
        assert!(outcome.stats.library_related <= outcome.stats.comments_submitted);
    }

    #[tokio::test]
    async fn backend_failure_fails_open() {
        let backend = Scripted::failing("503 Service Unavailable");
        let outcome = pipeline(backend.clone())
            .enhance_comments(comments(), "o", "r")
            .await;
        assert_eq!(outcome.comments, comments());
        assert!(matches!(outcome.error, Some(WardenError::Llm(_))));
        assert!(outcome.notes.is_empty());
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn unparseable_answer_fails_open() {
        let outcome = pipeline(Scripted::ok("I could not complete the task."))
            .enhance_comments(comments(), "o", "r")
            .await;
        assert_eq!(outcome.comments, comments());
        assert!(matches!(outcome.error, Some(WardenError::ResponseParse(_))));
    }

    struct Hanging;

    #[async_trait]
    impl ChatBackend for Hanging {
        fn model(&self) -> &str {
            "hanging"
        }

        async fn chat(&self, _: Vec<ChatMessage>) -> Result<String, WardenError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expiry_fails_open() {
        let config = EnhancementConfig {
            timeout_secs: 5,
            ..EnhancementConfig::default()
        };
        let outcome = CommentValidationPipeline::new(Arc::new(Hanging), config)
            .enhance_comments(comments(), "o", "r")
            .await;
        assert_eq!(outcome.comments, comments());
        assert!(matches!(outcome.error, Some(WardenError::Timeout(5))));
    }

    #[test]
    fn display_reports_failures() {
        let outcome =
            EnhancementOutcome::passthrough(comments(), Some(WardenError::Timeout(120)));
        let text = outcome.to_string();
        assert!(text.contains("Enhancement skipped"));
        assert!(text.contains("2 comment(s) delivered unchanged"));
    }
}
