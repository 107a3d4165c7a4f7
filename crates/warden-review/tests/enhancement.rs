//! Integration test: comment batches through the validation pipeline with a
//! scripted backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use warden_core::{EnhancementConfig, ReviewComment, WardenError};
use warden_review::llm::{ChatBackend, ChatMessage};
use warden_review::pipeline::CommentValidationPipeline;

struct ScriptedBackend {
    reply: Result<&'static str, &'static str>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    fn replying(reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(message: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, _messages: Vec<ChatMessage>) -> Result<String, WardenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .map(String::from)
            .map_err(|m| WardenError::Llm(m.to_string()))
    }
}

fn batch() -> Vec<ReviewComment> {
    vec![
        ReviewComment {
            path: "src/index.tsx".into(),
            line: 3,
            start_line: None,
            body: "ReactDOM.render is the recommended API, keep it".into(),
            kind: "suggestion".into(),
        },
        ReviewComment {
            path: "src/api.ts".into(),
            line: 40,
            start_line: Some(35),
            body: "Missing error handling around fetch".into(),
            kind: "issue".into(),
        },
        ReviewComment {
            path: "package.json".into(),
            line: 12,
            start_line: None,
            body: "lodash 4.17.21 is current".into(),
            kind: "nitpick".into(),
        },
    ]
}

fn pipeline(backend: Arc<ScriptedBackend>) -> CommentValidationPipeline {
    CommentValidationPipeline::new(backend, EnhancementConfig::default())
}

#[tokio::test]
async fn outdated_react_advice_is_corrected_in_place() {
    let reply = r#"Sure. Here is the result:
```json
{"comments": [
  {"id": "0", "is_library_related": true, "needs_validation": true,
   "library_info": {"name": "react", "version": "18.2.0",
                    "methods": ["ReactDOM.render"], "change_type": "deprecation"},
   "validation_result": {"is_correct": false, "confidence": 0.95,
                         "recommended_usage": "createRoot(container).render(<App />)"},
   "enhanced_comment": "ReactDOM.render is legacy in React 18; use createRoot(container).render(<App />) instead."},
  {"id": "1", "is_library_related": false, "needs_validation": false},
  {"id": "2", "is_library_related": true, "needs_validation": false,
   "library_info": {"name": "lodash", "change_type": "version_update"},
   "enhanced_comment": "should be ignored"}
]}
```"#;
    let backend = ScriptedBackend::replying(reply);
    let outcome = pipeline(backend.clone())
        .enhance_comments(batch(), "acme", "web")
        .await;

    assert!(outcome.error.is_none());
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

    let original = batch();
    assert_eq!(outcome.comments.len(), original.len());
    assert!(outcome.comments[0].body.contains("createRoot"));
    assert_eq!(outcome.comments[0].path, original[0].path);
    assert_eq!(outcome.comments[0].line, original[0].line);
    assert_eq!(outcome.comments[1], original[1]);
    assert_eq!(outcome.comments[2], original[2]);

    assert_eq!(outcome.stats.comments_submitted, 3);
    assert_eq!(outcome.stats.library_related, 2);
    assert_eq!(outcome.stats.comments_enhanced, 1);
    assert_eq!(outcome.notes.len(), 1);
    assert_eq!(outcome.notes[0].position, 0);
}

#[tokio::test]
async fn responses_in_any_order_land_on_the_right_comment() {
    let reply = r#"{"comments": [
        {"id": 2, "is_library_related": true, "needs_validation": true,
         "enhanced_comment": "lodash 4.17.21 is the latest 4.x release."},
        {"id": 0, "is_library_related": false, "needs_validation": false}
    ]}"#;
    let outcome = pipeline(ScriptedBackend::replying(reply))
        .enhance_comments(batch(), "acme", "web")
        .await;

    let original = batch();
    assert_eq!(outcome.comments[0], original[0]);
    assert_eq!(outcome.comments[1], original[1]);
    assert_eq!(
        outcome.comments[2].body,
        "lodash 4.17.21 is the latest 4.x release."
    );
}

#[tokio::test]
async fn failures_return_the_input_unchanged() {
    let cases = [
        ScriptedBackend::failing("connection reset"),
        ScriptedBackend::replying("I'm unable to validate these comments right now."),
        ScriptedBackend::replying(r#"{"comments": [{"id": "0", "is_library_related": tr"#),
    ];

    for backend in cases {
        let outcome = pipeline(backend)
            .enhance_comments(batch(), "acme", "web")
            .await;
        assert_eq!(outcome.comments, batch());
        assert!(outcome.is_degraded());
        assert!(outcome.notes.is_empty());
    }
}

#[tokio::test]
async fn empty_batch_never_reaches_the_backend() {
    let backend = ScriptedBackend::replying(r#"{"comments": []}"#);
    let outcome = pipeline(backend.clone())
        .enhance_comments(Vec::new(), "acme", "web")
        .await;
    assert!(outcome.comments.is_empty());
    assert!(!outcome.is_degraded());
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}
