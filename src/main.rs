use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use miette::{Context, IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};

use warden_core::{
    FilterMode, OutputFormat, PullRequestContext, PullRequestDetails, RepoWorkflowSetting,
    ReviewComment, WardenConfig, WorkflowKind,
};
use warden_gate::branch::BranchTargetingFilter;
use warden_gate::checkrun::{CheckRunTerminator, StaleCommit};
use warden_gate::eligibility::{EligibilityGate, GateVerdict, RejectReason};
use warden_gate::github::GitHubClient;
use warden_review::llm::LlmClient;
use warden_review::pipeline::CommentValidationPipeline;

#[derive(Parser)]
#[command(
    name = "warden",
    version,
    about = "Eligibility gating and library-aware comment validation for PR review",
    long_about = "Warden decides whether an automated PR workflow should run for an event,\n\
                   and validates generated review comments that make claims about libraries.\n\n\
                   Examples:\n  \
                     warden gate --event event.json          Decide whether to run a workflow\n  \
                     warden branch main --allow 'release/*'  Check a branch against patterns\n  \
                     warden enhance --comments c.json --repo acme/web\n  \
                     warden init                             Create a .warden.toml config file"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .warden.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text  Human-readable summaries (default)\n  \
                         json  Machine-readable JSON with camelCase keys"
    )]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Decide whether a workflow runs for a pull request event
    #[command(long_about = "Decide whether a workflow runs for a pull request event.\n\n\
        Reads a JSON event with `workflow`, `context`, `setting` and optional `details`.\n\
        When `details` is absent the live PR state is fetched from GitHub.\n\
        Exits with status 1 when the event is rejected.\n\n\
        Examples:\n  warden gate --event event.json\n  cat event.json | warden gate --format json")]
    Gate {
        /// Read the event from file instead of stdin
        #[arg(long)]
        event: Option<PathBuf>,
    },
    /// Evaluate branch targeting for one target branch
    #[command(long_about = "Evaluate branch targeting for one target branch.\n\n\
        Patterns are glob strings; `*` also matches `/`.\n\n\
        Examples:\n  warden branch main --allow main --allow 'release/*'\n  warden branch docs/intro --deny 'docs/*'")]
    Branch {
        /// Target branch name
        branch: String,

        /// Allowlist pattern (repeatable)
        #[arg(long, conflicts_with = "deny")]
        allow: Vec<String>,

        /// Denylist pattern (repeatable)
        #[arg(long)]
        deny: Vec<String>,
    },
    /// Validate library claims in generated review comments
    #[command(long_about = "Validate library claims in generated review comments.\n\n\
        Reads a JSON array of comments (`path`, `line`, `startLine`, `body`, `type`),\n\
        sends them to the configured LLM in one batch and prints the merged result.\n\
        Any failure delivers the comments unchanged.\n\n\
        Examples:\n  warden enhance --comments comments.json --repo acme/web")]
    Enhance {
        /// Read comments from file instead of stdin
        #[arg(long)]
        comments: Option<PathBuf>,

        /// Repository as owner/repo
        #[arg(long)]
        repo: String,
    },
    /// Create a default .warden.toml configuration file
    #[command(long_about = "Create a default .warden.toml configuration file.\n\n\
        Fails if .warden.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// A PR event as handed to `warden gate`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GateEvent {
    workflow: WorkflowKind,
    context: PullRequestContext,
    #[serde(default)]
    setting: RepoWorkflowSetting,
    details: Option<PullRequestDetails>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GateReport {
    workflow: WorkflowKind,
    accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

const DEFAULT_CONFIG: &str = r#"# Warden Configuration

[llm]
# OpenAI-compatible endpoint; api_key falls back to OPENAI_API_KEY
# provider picks the default base_url: "openai", "ollama" or "openrouter"
# provider = "openai"
# model = "gpt-4o"
# base_url = "https://api.openai.com"
# timeout_secs = 120

[enhancement]
# enabled = true
# timeout_secs = 120
# context = "TypeScript monorepo using React 18"

[gate]
# termination_timeout_secs = 30
# check_run_names = ["AI Code Review"]

[github]
# token falls back to GITHUB_TOKEN, then GH_TOKEN
# api_url = "https://api.github.com"
"#;

fn read_input(file: &Option<PathBuf>, what: &str) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err(format!("reading {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .into_diagnostic()
                .wrap_err(format!("reading {what} from stdin"))?;
            Ok(buf)
        }
    }
}

fn load_config(path: &Option<PathBuf>) -> Result<WardenConfig> {
    let mut config = match path {
        Some(path) => WardenConfig::from_file(path).into_diagnostic()?,
        None => {
            let default_path = Path::new(".warden.toml");
            if default_path.exists() {
                WardenConfig::from_file(default_path).into_diagnostic()?
            } else {
                WardenConfig::default()
            }
        }
    };
    config.apply_env();
    Ok(config)
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

async fn run_gate(config: &WardenConfig, event: GateEvent, format: OutputFormat) -> Result<bool> {
    let github = match config.github.token {
        Some(_) => Some(GitHubClient::new(&config.github, &config.gate).into_diagnostic()?),
        None => None,
    };

    let details = match (event.details, &github) {
        (Some(details), _) => details,
        (None, Some(client)) => client
            .pull_request_details(
                &event.context.owner,
                &event.context.repo,
                event.context.number,
            )
            .await
            .into_diagnostic()?,
        (None, None) => miette::bail!(
            "event has no `details` and no GitHub token is configured to fetch them"
        ),
    };

    let gate = EligibilityGate::new(&config.gate);
    let verdict = gate.evaluate(event.workflow, &event.context, &event.setting, &details);

    // A one-shot process would drop a detached task on exit, so stale check
    // runs are cancelled inline here instead.
    if let (GateVerdict::Reject(RejectReason::StaleCommit { .. }), Some(client)) =
        (&verdict, &github)
    {
        if event.workflow == WorkflowKind::CodeReview {
            terminate_inline(client, &event.context, config).await;
        }
    }

    let report = GateReport {
        workflow: event.workflow,
        accepted: verdict.is_accepted(),
        reason: match &verdict {
            GateVerdict::Accept => None,
            GateVerdict::Reject(reason) => Some(reason.to_string()),
        },
    };
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        }
        OutputFormat::Text => {
            println!(
                "{} for {}#{}: {verdict}",
                event.workflow,
                event.context.full_name(),
                event.context.number
            );
        }
    }
    Ok(report.accepted)
}

async fn terminate_inline(
    terminator: &dyn CheckRunTerminator,
    ctx: &PullRequestContext,
    config: &WardenConfig,
) {
    let commit = StaleCommit {
        installation_id: ctx.installation_id,
        owner: ctx.owner.clone(),
        repo: ctx.repo.clone(),
        sha: ctx.commit_sha.clone(),
    };
    let timeout = config.gate.termination_timeout();
    match tokio::time::timeout(timeout, terminator.terminate_stale_check_runs(&commit)).await {
        Ok(Ok(count)) => tracing::info!(sha = %commit.sha, count, "terminated stale check runs"),
        Ok(Err(e)) => tracing::warn!(sha = %commit.sha, error = %e, "failed to terminate stale check runs"),
        Err(_) => tracing::warn!(sha = %commit.sha, "stale check-run termination timed out"),
    }
}

fn run_branch(branch: &str, allow: Vec<String>, deny: Vec<String>, format: OutputFormat) -> Result<bool> {
    let (mode, patterns) = if allow.is_empty() {
        (FilterMode::Denylist, deny)
    } else {
        (FilterMode::Allowlist, allow)
    };
    let setting = RepoWorkflowSetting {
        branch_targeting_enabled: true,
        branch_filter_mode: mode,
        branch_patterns: serde_json::to_string(&patterns).into_diagnostic()?,
        ..RepoWorkflowSetting::default()
    };
    let evaluation = BranchTargetingFilter::evaluate(&setting, branch);

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "branch": branch,
                "allowed": evaluation.is_allowed(),
                "decision": evaluation.decision.to_string(),
                "skippedPatterns": evaluation.skipped_patterns,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        OutputFormat::Text => {
            let verb = if evaluation.is_allowed() { "allowed" } else { "blocked" };
            println!("{branch}: {verb} ({})", evaluation.decision);
            for pattern in &evaluation.skipped_patterns {
                eprintln!("  skipped invalid pattern: {pattern}");
            }
        }
    }
    Ok(evaluation.is_allowed())
}

async fn run_enhance(
    config: &WardenConfig,
    input: &str,
    repo: &str,
    format: OutputFormat,
) -> Result<()> {
    let Some((owner, name)) = repo.split_once('/') else {
        miette::bail!("--repo must be owner/repo, got '{repo}'");
    };
    let comments: Vec<ReviewComment> = serde_json::from_str(input)
        .into_diagnostic()
        .wrap_err("parsing review comments")?;

    if config.llm.api_key.is_none() && config.llm.provider.eq_ignore_ascii_case("openai") {
        eprintln!("hint: no LLM API key found; set OPENAI_API_KEY or [llm].api_key in .warden.toml");
    }

    let client = LlmClient::new(&config.llm).into_diagnostic()?;
    let pipeline = CommentValidationPipeline::new(Arc::new(client), config.enhancement.clone());
    let outcome = pipeline.enhance_comments(comments, owner, name).await;

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "comments": outcome.comments,
                "notes": outcome.notes,
                "stats": outcome.stats,
                "error": outcome.error.as_ref().map(|e| e.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        OutputFormat::Text => print!("{outcome}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Gate { ref event } => {
            let config = load_config(&cli.config)?;
            let raw = read_input(event, "event")?;
            let event: GateEvent = serde_json::from_str(&raw)
                .into_diagnostic()
                .wrap_err("parsing gate event")?;
            if !run_gate(&config, event, cli.format).await? {
                std::process::exit(1);
            }
        }
        Command::Branch {
            ref branch,
            ref allow,
            ref deny,
        } => {
            if !run_branch(branch, allow.clone(), deny.clone(), cli.format)? {
                std::process::exit(1);
            }
        }
        Command::Enhance {
            ref comments,
            ref repo,
        } => {
            let config = load_config(&cli.config)?;
            let input = read_input(comments, "comments")?;
            run_enhance(&config, &input, repo, cli.format).await?;
        }
        Command::Init => {
            let path = Path::new(".warden.toml");
            if path.exists() {
                miette::bail!(".warden.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .warden.toml with default configuration");
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "warden", &mut std::io::stdout());
        }
    }

    Ok(())
}
