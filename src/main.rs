use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use secpipe::harness::{AwsProbe, Validator, ValidatorSettings};
use secpipe::produce::{EventSink, ProduceOptions};
use secpipe_config::RuntimeConfig;
use secpipe_core::EventGenerator;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Operator tooling for the security event pipeline
#[derive(Parser)]
#[command(name = "secpipe")]
#[command(version)]
#[command(about = "Validate, load-test and replay the security event pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the end-to-end validation against the deployed pipeline
    Validate,
    /// Generate synthetic security events
    Produce {
        /// Events per second
        #[arg(long, default_value_t = 10)]
        rate: u32,

        /// How long to produce, in seconds
        #[arg(long, default_value_t = 60)]
        duration: u64,

        /// Write JSON lines to this file instead of stdout
        #[arg(short, long, value_name = "FILE", conflicts_with = "kinesis")]
        output: Option<PathBuf>,

        /// Put events on this Kinesis stream
        #[arg(long, value_name = "STREAM")]
        kinesis: Option<String>,
    },
    /// Process a file of raw events into local storage
    Process {
        /// JSON array, single JSON object or JSON lines
        input: PathBuf,

        /// Output directory (switches storage to the filesystem backend)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = secpipe::load_config(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }
    secpipe::init_tracing(&config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(async move {
        match cli.command {
            Commands::Validate => run_validate(&config).await,
            Commands::Produce {
                rate,
                duration,
                output,
                kinesis,
            } => run_produce(&config, rate, duration, output, kinesis).await,
            Commands::Process { input, output } => run_process(config, input, output).await,
        }
    })
}

async fn run_validate(config: &RuntimeConfig) -> Result<ExitCode> {
    config
        .harness
        .validate()
        .context("Invalid harness configuration")?;

    let probe = AwsProbe::from_config(&config.harness).await;
    let validator = Validator::new(probe, ValidatorSettings::from(&config.harness));

    match validator.run().await {
        Ok(report) if report.success() => Ok(ExitCode::SUCCESS),
        Ok(_) => Ok(ExitCode::FAILURE),
        Err(e) => {
            tracing::error!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_produce(
    config: &RuntimeConfig,
    rate: u32,
    duration: u64,
    output: Option<PathBuf>,
    kinesis: Option<String>,
) -> Result<ExitCode> {
    let sink = match (output, kinesis) {
        (_, Some(stream_name)) => {
            let mut harness = config.harness.clone();
            harness.stream_name = stream_name;
            EventSink::Stream(Box::new(AwsProbe::from_config(&harness).await))
        }
        (Some(path), None) => EventSink::File(path),
        (None, None) => EventSink::Stdout,
    };

    let options = ProduceOptions {
        rate,
        duration: Duration::from_secs(duration),
    };
    secpipe::produce::produce(&mut EventGenerator::new(), options, sink).await?;
    Ok(ExitCode::SUCCESS)
}

async fn run_process(
    mut config: RuntimeConfig,
    input: PathBuf,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    if let Some(dir) = &output {
        secpipe::process::use_output_dir(&mut config, dir);
    }

    let stats = secpipe::process::process_file(&config, &input).await?;
    println!("{}", stats.completion_message());

    Ok(if stats.failed_records == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
