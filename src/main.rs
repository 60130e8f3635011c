use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, ValueEnum};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::Level;

use mtr_observer::config::{ConfigLoader, env};
use mtr_observer::observer::StatusReporter;
use mtr_observer::{Error, MtrStep, ObserverBuilder, Result, RunId};

#[derive(Parser)]
#[command(name = "mtr-observer")]
#[command(version, about = "Classify mysql-test-run output into failures, warning lists, and a summary")]
struct Cli {
    /// Harness output to read; stdin when omitted or `-`
    log: Option<PathBuf>,

    /// Path to a standalone mtr-observer.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run id passed to the sink
    #[arg(long)]
    run_id: Option<u64>,

    /// Max fail/warn entries shown in the summary
    #[arg(long)]
    text_limit: Option<usize>,

    /// Max display characters per test name
    #[arg(long)]
    test_name_limit: Option<usize>,

    /// Where results are written
    #[arg(long, value_enum, default_value_t = SinkFormat::Log)]
    format: SinkFormat,

    /// Show live progress on stderr
    #[cfg(feature = "progress")]
    #[arg(long)]
    progress: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SinkFormat {
    /// Log failures and warning lists
    Log,
    /// One JSON object per failure or warning list on stdout
    Json,
}

/// Status surface that mirrors summary changes into the log.
struct ConsoleStatus;

impl StatusReporter for ConsoleStatus {
    fn on_progress(&mut self, metric: &str, value: u64) {
        tracing::trace!(metric, value, "progress");
    }

    fn on_summary(&mut self, text: &str) {
        tracing::debug!("{}", text);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(cli: &Cli) {
    let level = if cli.quiet {
        Level::WARN
    } else {
        match cli.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut loader = ConfigLoader::new();
    if let Some(ref path) = cli.config {
        loader = loader.config_file(path);
    }
    let mut config = loader.load()?;
    for (name, value) in env::detect_active_overrides() {
        tracing::debug!("env override {}={}", name, value);
    }
    if let Some(limit) = cli.text_limit {
        config.summary.text_limit = limit;
    }
    if let Some(limit) = cli.test_name_limit {
        config.summary.test_name_limit = limit;
    }

    let mut builder = ObserverBuilder::new().with_config(config);
    if let Some(id) = cli.run_id {
        builder = builder.run_id(RunId(id));
    }
    builder = match cli.format {
        SinkFormat::Log => builder.log_sink(),
        SinkFormat::Json => builder.json_sink(io::stdout()),
    };
    builder = with_status(builder, &cli);

    let mut step = builder.start().await?;
    let reader = open_input(cli.log.as_deref()).await?;
    feed_input(&mut step, reader).await?;

    let outcome = step.finish().await;
    tracing::info!(
        run_id = %outcome.run_id,
        tests = outcome.tests,
        failures = outcome.failures,
        warning_batches = outcome.warning_batches,
        "run complete"
    );
    match cli.format {
        SinkFormat::Log => println!("{}", outcome.summary),
        SinkFormat::Json => eprintln!("{}", outcome.summary),
    }
    Ok(())
}

#[cfg(feature = "progress")]
fn with_status(builder: ObserverBuilder, cli: &Cli) -> ObserverBuilder {
    if cli.progress {
        builder.status(mtr_observer::progress::ProgressStatus::new())
    } else {
        builder.status(ConsoleStatus)
    }
}

#[cfg(not(feature = "progress"))]
fn with_status(builder: ObserverBuilder, _cli: &Cli) -> ObserverBuilder {
    builder.status(ConsoleStatus)
}

async fn open_input(path: Option<&Path>) -> Result<Box<dyn AsyncBufRead + Unpin>> {
    match path {
        None => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
        Some(p) if p == Path::new("-") => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
        Some(p) => {
            let file = tokio::fs::File::open(p).await.map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => Error::FileNotFound(p.to_path_buf()),
                _ => Error::Io(e),
            })?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

/// Feed `reader` to the step one `\n`-terminated chunk at a time.
async fn feed_input<R: AsyncBufRead + Unpin>(step: &mut MtrStep, mut reader: R) -> Result<()> {
    let mut chunk = Vec::new();
    loop {
        chunk.clear();
        if reader.read_until(b'\n', &mut chunk).await? == 0 {
            return Ok(());
        }
        step.feed_chunk(&chunk);
    }
}
