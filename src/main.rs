use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Local, TimeDelta};
use clap::Parser;
use console::style;
use tokio_util::sync::CancellationToken;

use gcloud_logs_client::{LoggingClient, MAX_PAGE_SIZE};
use gcloud_logs_query::{
    Formatter, LogPrinter, LogQuery, OutputSink, PAGE_SIZE, POLL_INTERVAL, ParsedTimestamp,
    TailOptions, parse_timestamp,
};
use gcloud_logs_types::{OutputFormat, TimeWindow};

/// How far back the default --from-date reaches
const DEFAULT_LOOKBACK: TimeDelta = TimeDelta::minutes(1);

/// Downloads and tails machine logs from Google Cloud
///
/// Uses your gcloud settings: log in with gcloud and set a default project
/// (or pass --project) before the first run.
#[derive(Parser, Debug)]
#[command(name = "gcloud-logs")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Machine names to pull logs from (all instances if none given)
    #[arg(value_name = "MACHINE_NAME")]
    machines: Vec<String>,

    /// Starts pulling logs from this date and time. Defaults to 1 minute ago
    #[arg(long, value_parser = parse_timestamp)]
    from_date: Option<ParsedTimestamp>,

    /// Streams logs until a specified date and time
    #[arg(long, value_parser = parse_timestamp, conflicts_with = "tail")]
    to_date: Option<ParsedTimestamp>,

    /// Streams log to output, like in the "tail" command
    #[arg(long)]
    tail: bool,

    /// Treats --from-date/--to-date as UTC timestamps instead of the local timezone
    #[arg(long)]
    utc: bool,

    /// Outputs results to file instead of the standard output
    #[arg(long, value_name = "PATH")]
    to_file: Option<PathBuf>,

    /// Outputs the API's JSON entries instead of log lines
    #[arg(long)]
    api: bool,

    /// Project to read logs from (defaults to gcloud's configured project)
    #[arg(long, value_name = "PROJECT_ID")]
    project: Option<String>,

    /// Number of log entries to fetch per request
    #[arg(long, default_value_t = PAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..=MAX_PAGE_SIZE as i64))]
    page_size: u32,

    /// Seconds to wait between polls when tailing
    #[arg(
        long,
        default_value_t = POLL_INTERVAL.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..),
        value_name = "SECONDS"
    )]
    poll_interval: u64,

    /// Disable coloured log lines
    #[arg(long)]
    no_color: bool,

    /// Cloud Logging API root (for proxies and emulators)
    #[arg(long, hide = true, value_name = "URL")]
    endpoint: Option<String>,
}

/// Validated run configuration, built once at startup
#[derive(Debug, Clone, PartialEq)]
struct RunConfig {
    instances: Vec<String>,
    from: DateTime<FixedOffset>,
    to: Option<DateTime<FixedOffset>>,
    tail: bool,
    output: Option<PathBuf>,
    format: OutputFormat,
    colored: bool,
    project: Option<String>,
    page_size: u32,
    poll_interval: Duration,
    endpoint: Option<String>,
}

impl RunConfig {
    /// Resolve command line arguments; `started` is the process start time
    fn from_args(args: Args, started: DateTime<FixedOffset>) -> Result<Self> {
        let from = match args.from_date {
            Some(ts) => ts.resolve(args.utc).context("Invalid --from-date")?,
            None => started - DEFAULT_LOOKBACK,
        };
        let to = args
            .to_date
            .map(|ts| ts.resolve(args.utc))
            .transpose()
            .context("Invalid --to-date")?;

        Ok(Self {
            instances: args.machines,
            from,
            to,
            tail: args.tail,
            output: args.to_file,
            format: if args.api {
                OutputFormat::Api
            } else {
                OutputFormat::Line
            },
            colored: !args.no_color,
            project: args.project,
            page_size: args.page_size,
            poll_interval: Duration::from_secs(args.poll_interval),
            endpoint: args.endpoint,
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let started = Local::now().fixed_offset();
    let args = Args::parse();

    // Logs go to stderr so stdout stays clean for piping
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match RunConfig::from_args(args, started) {
        Ok(config) => run(config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: RunConfig) -> Result<()> {
    // Open the sink first so a bad path fails before any query is sent
    let sink = OutputSink::open(config.output.as_deref())?;

    let mut client = LoggingClient::new(config.project.clone()).await?;
    if let Some(endpoint) = &config.endpoint {
        client = client.with_endpoint(endpoint.as_str());
    }
    tracing::debug!(project = client.project(), "using project");

    let formatter = Formatter::new(config.format, config.colored);
    let mut printer = LogPrinter::new(&client, LogQuery::new(config.instances), formatter, sink)
        .with_page_size(config.page_size);

    if config.tail {
        let cancel = CancellationToken::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            }
        });

        let options = TailOptions {
            poll_interval: config.poll_interval,
        };
        printer.tail(config.from, options, &cancel).await?;

        if cancel.is_cancelled() {
            eprintln!(
                "{}",
                style("CTRL+C pressed. Aborting.").red().bright().for_stderr()
            );
        }
    } else {
        printer
            .print_logs(&TimeWindow::new(config.from, config.to))
            .await?;
    }

    printer
        .into_inner()
        .flush()
        .context("Failed to flush output")
}
