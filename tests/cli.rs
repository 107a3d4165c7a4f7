use std::process::Command;

fn warden(dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_warden"));
    cmd.current_dir(dir)
        .env_remove("GITHUB_TOKEN")
        .env_remove("GH_TOKEN")
        .env_remove("OPENAI_API_KEY");
    cmd
}

#[test]
fn branch_allowlist_glob_crosses_slashes() {
    let dir = tempfile::tempdir().unwrap();
    let output = warden(dir.path())
        .args(["branch", "release/v2/hotfix", "--allow", "release/*"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("allowed"), "unexpected output: {stdout}");
}

#[test]
fn branch_denylist_blocks_with_status_one() {
    let dir = tempfile::tempdir().unwrap();
    let output = warden(dir.path())
        .args(["branch", "docs/intro", "--deny", "docs/*", "--format", "json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["allowed"], false);
    assert_eq!(json["branch"], "docs/intro");
}

fn write_event(dir: &std::path::Path, action: &str, draft: bool) -> std::path::PathBuf {
    let event = serde_json::json!({
        "workflow": "CODE_REVIEW",
        "context": {
            "owner": "acme",
            "repo": "web",
            "number": 12,
            "action": action,
            "commitSha": "abc123",
            "installationId": 5
        },
        "setting": {
            "settings": { "reviewOnPush": true },
            "branchTargetingEnabled": true,
            "branchFilterMode": "allowlist",
            "branchPatterns": "[\"main\"]"
        },
        "details": {
            "state": "open",
            "draft": draft,
            "headSha": "abc123",
            "baseRef": "main"
        }
    });
    let path = dir.join("event.json");
    std::fs::write(&path, serde_json::to_string(&event).unwrap()).unwrap();
    path
}

#[test]
fn gate_accepts_eligible_event() {
    let dir = tempfile::tempdir().unwrap();
    let event = write_event(dir.path(), "synchronize", false);
    let output = warden(dir.path())
        .args(["gate", "--format", "json", "--event"])
        .arg(&event)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["accepted"], true);
    assert_eq!(json["workflow"], "CODE_REVIEW");
}

#[test]
fn gate_rejects_draft_event() {
    let dir = tempfile::tempdir().unwrap();
    let event = write_event(dir.path(), "opened", true);
    let output = warden(dir.path())
        .args(["gate", "--format", "json", "--event"])
        .arg(&event)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["accepted"], false);
    assert!(json["reason"].as_str().unwrap().contains("draft"));
}

#[test]
fn gate_without_details_needs_a_token() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("event.json");
    std::fs::write(
        &path,
        r#"{"workflow": "PR_SUMMARY", "context": {"owner": "a", "repo": "b", "number": 1,
            "action": "opened", "commitSha": "x", "installationId": 1}}"#,
    )
    .unwrap();
    let output = warden(dir.path())
        .args(["gate", "--event"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("GitHub token"));
}

#[test]
fn enhance_rejects_malformed_repo() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("comments.json");
    std::fs::write(&path, "[]").unwrap();
    let output = warden(dir.path())
        .args(["enhance", "--repo", "not-a-repo", "--comments"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn enhance_passes_empty_batch_through_without_network() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("comments.json");
    std::fs::write(&path, "[]").unwrap();
    let output = warden(dir.path())
        .args(["enhance", "--repo", "acme/web", "--format", "json", "--comments"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["comments"], serde_json::json!([]));
    assert!(json["error"].is_null());
}
