//! Pilot Recorder - command line front end.
//!
//! Records scripted input against a headless layout, replays saved step
//! logs and compiles them into test files.

use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use pilot_core::{InputEvent, Size};
use pilot_harness::{HeadlessApp, Layout, LayoutFactory};
use pilot_recorder::{
    Pilot, RecorderConfig, ReplayEngine, ScriptCompiler, SessionController, StepLog, StepLogFile,
};

/// Pilot Recorder
#[derive(Parser)]
#[command(name = "pilot-recorder")]
#[command(about = "Record terminal UI interactions and turn them into tests")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a session from a file of input events (one JSON event per line)
    Record(RecordArgs),
    /// Replay a saved step log against a fresh instance
    Replay(ReplayArgs),
    /// Compile a saved step log into a test file
    Compile(CompileArgs),
}

#[derive(Args)]
struct RecordArgs {
    /// Layout file of the application (TOML or JSON)
    #[arg(short, long)]
    layout: PathBuf,

    /// Input events, one JSON object per line. `-` reads stdin.
    #[arg(short, long)]
    events: PathBuf,

    /// Step log to replay before recording starts
    #[arg(long)]
    steps: Option<PathBuf>,

    /// Where to write the generated test
    #[arg(short, long, env = "PILOT_RECORDER_OUTPUT")]
    output: Option<PathBuf>,

    /// Name of the generated test function
    #[arg(long)]
    test_name: Option<String>,

    /// Also write the step log next to the generated test
    #[arg(long)]
    export: bool,
}

#[derive(Args)]
struct ReplayArgs {
    /// Layout file of the application (TOML or JSON)
    #[arg(short, long)]
    layout: PathBuf,

    /// Step log to replay
    #[arg(short, long)]
    steps: PathBuf,
}

#[derive(Args)]
struct CompileArgs {
    /// Step log to compile
    #[arg(short, long)]
    steps: PathBuf,

    /// Terminal size as WIDTHxHEIGHT, defaults to the recorded size
    #[arg(long, value_parser = parse_size)]
    size: Option<Size>,

    /// Output file, stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Name of the generated test function
    #[arg(long)]
    test_name: Option<String>,
}

fn setup_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Parses `WIDTHxHEIGHT`.
fn parse_size(value: &str) -> Result<Size, String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value:?}"))?;
    let width = width
        .trim()
        .parse::<u16>()
        .map_err(|e| format!("invalid width {width:?}: {e}"))?;
    let height = height
        .trim()
        .parse::<u16>()
        .map_err(|e| format!("invalid height {height:?}: {e}"))?;
    if width == 0 || height == 0 {
        return Err("terminal size must not be empty".to_string());
    }
    Ok(Size::new(width, height))
}

/// Parses one input event per non-blank line. Lines starting with `#` are comments.
fn parse_events(source: &str) -> Result<Vec<InputEvent>> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(number, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Invalid event on line {}", number + 1))
        })
        .collect()
}

fn read_events(path: &Path) -> Result<Vec<InputEvent>> {
    let source = if path == Path::new("-") {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read events from stdin")?;
        source
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read events from {}", path.display()))?
    };
    parse_events(&source)
}

async fn read_steps(path: &Path) -> Result<StepLogFile> {
    StepLogFile::read(path)
        .await
        .with_context(|| format!("Failed to read step log {}", path.display()))
}

fn load_layout(path: &Path) -> Result<Layout> {
    Layout::load(path).with_context(|| format!("Failed to load layout {}", path.display()))
}

async fn record(config: RecorderConfig, args: RecordArgs) -> Result<()> {
    let export = config.output.export_steps || args.export;
    let mut config = config.with_export_steps(export);
    if let Some(output) = args.output {
        config = config.with_output_path(output);
    }
    if let Some(name) = args.test_name {
        config = config.with_test_name(name);
    }

    let layout = load_layout(&args.layout)?;
    let events = read_events(&args.events)?;

    let mut session = SessionController::new(LayoutFactory::new(layout), config)?;
    if let Some(steps) = &args.steps {
        session = session.with_log(StepLog::from(read_steps(steps).await?.steps));
    }

    let report = session.start().await?;
    info!(
        session_id = %session.session_id(),
        replayed = report.executed,
        events = events.len(),
        "Recording"
    );

    for event in &events {
        let outcome = session.dispatch(event).await?;
        tracing::debug!(event = %event, outcome = ?outcome, "Dispatched");
    }

    if session.saved_files().is_empty() {
        session.save().await?;
    }
    for path in session.saved_files() {
        println!("{}", path.display());
    }

    info!(
        steps = session.steps().len(),
        restarts = session.restarts(),
        "Recording finished"
    );
    session.stop().await?;
    Ok(())
}

async fn replay(config: RecorderConfig, args: ReplayArgs) -> Result<()> {
    let layout = load_layout(&args.layout)?;
    let file = read_steps(&args.steps).await?;

    let mut app = HeadlessApp::from_layout(&layout)?;
    let engine = ReplayEngine::from_config(&config.replay);
    let mut pilot = Pilot::new(&mut app).with_settle_yields(config.replay.settle_yields);
    let report = engine.replay(&file.steps, &mut pilot).await?;
    pilot.finish()?;

    for activation in app.activity() {
        println!("{activation}");
    }
    info!(
        executed = report.executed,
        skipped = report.skipped,
        "Replay finished"
    );
    Ok(())
}

async fn compile(config: RecorderConfig, args: CompileArgs) -> Result<()> {
    let config = match args.test_name {
        Some(name) => config.with_test_name(name),
        None => config,
    };
    config.validate()?;

    let file = read_steps(&args.steps).await?;
    let size = args.size.unwrap_or(file.terminal_size);
    let compiler = ScriptCompiler::new(&config.output.test_name, &config.output.app_path);
    let source = compiler.render(&file.steps, size);

    match args.output {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, source)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), steps = file.steps.len(), "Wrote test");
        }
        None => print!("{source}"),
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = RecorderConfig::resolve(cli.config.as_deref())?;
    match cli.command {
        Command::Record(args) => record(config, args).await,
        Command::Replay(args) => replay(config, args).await,
        Command::Compile(args) => compile(config, args).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, cli.json_logs);

    if let Err(e) = run(cli).await {
        error!("{e:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
