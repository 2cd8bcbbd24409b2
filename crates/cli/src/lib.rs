use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use scout_protocol::{
    serialize_json_pretty, ErrorEnvelope, Focus, HybridSearchParams, SemanticSearchParams,
};
use scout_search::{
    RetrievalConfig, RetrievalEngine, RetrievalOutcome, ResultFormatter, SearchError,
    WorkspaceStatus,
};
use scout_vector_client::HttpBackend;
use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const EXIT_FAILURE: u8 = 1;
const EXIT_INDEX_NOT_READY: u8 = 3;
const EXIT_CANCELLED: u8 = 130;

fn print_stdout(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "scout")]
#[command(about = "Hybrid semantic and structural code search", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Semantic index service URL (env: SCOUT_BACKEND_URL)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Retrieval config TOML file (env: SCOUT_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bound on each backend call in milliseconds (env: SCOUT_TIMEOUT_MS)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Semantic search fused with structural symbol matches
    Search(SearchArgs),

    /// Plain semantic search without structural matching
    Semantic(SemanticArgs),

    /// Show the resolved workspace and its index state
    Status(StatusArgs),

    /// Print the JSON schema of the search parameters
    Schema,
}

#[derive(Args)]
struct SearchArgs {
    /// Natural-language query
    query: String,

    /// Workspace root (default: current directory)
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Relative path prefix restricting results
    #[arg(long)]
    scope: Option<String>,

    /// functions|classes|imports|types|tests|config|all
    #[arg(long, default_value_t = Focus::All)]
    focus: Focus,

    /// Maximum number of matches (1-30)
    #[arg(short = 'n', long)]
    limit: Option<usize>,

    /// Lines of context around each match
    #[arg(short = 'c', long)]
    context_lines: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SemanticArgs {
    /// Natural-language query
    query: String,

    /// Workspace root (default: current directory)
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Relative path prefix restricting results
    #[arg(long)]
    scope: Option<String>,

    /// Keep only paths ending with this suffix (`rs` means `.rs`)
    #[arg(long)]
    file_type: Option<String>,

    /// Minimum similarity (0.15-1.0)
    #[arg(long)]
    min_score: Option<f32>,

    /// Maximum number of matches (1-50)
    #[arg(short = 'n', long)]
    limit: Option<usize>,

    /// Lines of context around each match
    #[arg(short = 'c', long)]
    context_lines: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct StatusArgs {
    /// Workspace root (default: current directory)
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub async fn main_entry() -> Result<ExitCode> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON consumers
    let json_output = match &cli.command {
        Commands::Search(args) => args.json,
        Commands::Semantic(args) => args.json,
        Commands::Status(args) => args.json,
        Commands::Schema => true,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // reqwest/hyper connection chatter is noise unless verbose
    if !cli.verbose {
        builder.filter_module("hyper_util", log::LevelFilter::Warn);
        builder.filter_module("reqwest", log::LevelFilter::Warn);
    }
    builder.target(env_logger::Target::Stderr).init();

    if matches!(cli.command, Commands::Schema) {
        print_schema()?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(&cli)?;
    let formatter = ResultFormatter::new(config.max_display_lines);
    let backend = HttpBackend::new(
        config.backend_url.clone(),
        Duration::from_millis(config.backend_timeout_ms),
    )
    .context("Failed to create backend client")?;
    log::debug!("Using semantic backend at {}", backend.base_url());
    let engine = RetrievalEngine::new(backend, config);
    let cancel = cancel_on_ctrl_c();

    let result = match cli.command {
        Commands::Search(args) => run_search(&engine, &formatter, args, &cancel).await,
        Commands::Semantic(args) => run_semantic(&engine, &formatter, args, &cancel).await,
        Commands::Status(args) => run_status(&engine, args, &cancel).await,
        Commands::Schema => Ok(ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => Ok(code),
        Err(err) => match err.downcast_ref::<SearchError>() {
            Some(search_err) => {
                report_search_error(&formatter, search_err, json_output)?;
                Ok(ExitCode::from(EXIT_FAILURE))
            }
            None => Err(err),
        },
    }
}

/// Built-in defaults, then the config file, then environment, then flags.
fn load_config(cli: &Cli) -> Result<RetrievalConfig> {
    let path = cli
        .config
        .clone()
        .or_else(|| env::var_os("SCOUT_CONFIG").map(PathBuf::from));
    let mut config = match path {
        Some(path) => RetrievalConfig::from_file(&path)?,
        None => RetrievalConfig::default(),
    };

    if let Ok(url) = env::var("SCOUT_BACKEND_URL") {
        if !url.trim().is_empty() {
            config.backend_url = url;
        }
    }
    if let Ok(raw) = env::var("SCOUT_TIMEOUT_MS") {
        config.backend_timeout_ms = raw
            .trim()
            .parse()
            .with_context(|| format!("SCOUT_TIMEOUT_MS must be a number of milliseconds, got '{raw}'"))?;
    }

    if let Some(url) = &cli.backend_url {
        config.backend_url = url.clone();
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.backend_timeout_ms = timeout_ms;
    }

    config.validate()?;
    Ok(config)
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling search");
            watcher.cancel();
        }
    });
    cancel
}

/// Absolute workspace path as the backend knows it.
fn workspace_arg(raw: Option<PathBuf>) -> Result<String> {
    let path = match raw {
        Some(path) => path,
        None => env::current_dir().context("Failed to read current directory")?,
    };
    let resolved = path.canonicalize().unwrap_or(path);
    Ok(resolved.to_string_lossy().into_owned())
}

async fn run_search(
    engine: &RetrievalEngine<HttpBackend>,
    formatter: &ResultFormatter,
    args: SearchArgs,
    cancel: &CancellationToken,
) -> Result<ExitCode> {
    let params = HybridSearchParams {
        query: args.query,
        workspace: Some(workspace_arg(args.workspace)?),
        scope: args.scope,
        focus: args.focus,
        limit: args.limit,
        context_lines: args.context_lines,
    };
    let outcome = engine.search(params, cancel).await?;
    emit_outcome(formatter, &outcome, args.json)
}

async fn run_semantic(
    engine: &RetrievalEngine<HttpBackend>,
    formatter: &ResultFormatter,
    args: SemanticArgs,
    cancel: &CancellationToken,
) -> Result<ExitCode> {
    let params = SemanticSearchParams {
        query: args.query,
        workspace: Some(workspace_arg(args.workspace)?),
        scope: args.scope,
        file_type: args.file_type,
        min_score: args.min_score,
        limit: args.limit,
        context_lines: args.context_lines,
    };
    let outcome = engine.search_semantic(params, cancel).await?;
    emit_outcome(formatter, &outcome, args.json)
}

async fn run_status(
    engine: &RetrievalEngine<HttpBackend>,
    args: StatusArgs,
    cancel: &CancellationToken,
) -> Result<ExitCode> {
    let workspace = workspace_arg(args.workspace)?;
    let Some(status) = engine.workspace_status(Path::new(&workspace), cancel).await? else {
        eprintln!("Status check cancelled.");
        return Ok(ExitCode::from(EXIT_CANCELLED));
    };

    if args.json {
        print_stdout(&serialize_json_pretty(&status)?)?;
    } else {
        print_stdout(&render_status(&status))?;
    }
    Ok(ExitCode::SUCCESS)
}

fn render_status(status: &WorkspaceStatus) -> String {
    let index = &status.status;
    let state = if index.vector_ready {
        "ready"
    } else if index.is_vector_indexing {
        "building"
    } else {
        "missing"
    };
    let count = |value: Option<u64>| value.map_or("n/a".to_string(), |v| v.to_string());
    format!(
        "Workspace {} ({})\n  vector index: {state}\n  files: {}\n  chunks: {}",
        status.workspace.id,
        status.workspace.path,
        count(index.file_count),
        count(index.chunk_count)
    )
}

fn emit_outcome(
    formatter: &ResultFormatter,
    outcome: &RetrievalOutcome,
    json: bool,
) -> Result<ExitCode> {
    if json {
        print_stdout(&serialize_json_pretty(outcome)?)?;
    } else {
        print_stdout(formatter.render(outcome).trim_end())?;
    }

    Ok(match outcome {
        RetrievalOutcome::Ready(_) => ExitCode::SUCCESS,
        RetrievalOutcome::IndexNotReady { .. } => ExitCode::from(EXIT_INDEX_NOT_READY),
        RetrievalOutcome::Cancelled { .. } => ExitCode::from(EXIT_CANCELLED),
    })
}

fn report_search_error(formatter: &ResultFormatter, err: &SearchError, json: bool) -> Result<()> {
    if json {
        let envelope = ErrorEnvelope {
            code: err.code().to_string(),
            message: err.to_string(),
            hint: Some(err.hint().to_string()),
        };
        print_stdout(&serialize_json_pretty(&envelope)?)
    } else {
        eprintln!("{}", formatter.render_error(err));
        Ok(())
    }
}

fn print_schema() -> Result<()> {
    let schema = serde_json::json!({
        "hybrid_search": schemars::schema_for!(HybridSearchParams),
        "semantic_search": schemars::schema_for!(SemanticSearchParams),
    });
    print_stdout(&serialize_json_pretty(&schema)?)
}
