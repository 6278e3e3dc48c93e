use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracegate_anonymizer::{
    extractor, Anonymizer, CaptureWriter, Mapping, Options, SpanReader, WriteError,
};
use tracegate_model::ui;

/// The background persistence interval is a safety net; the mapping is
/// always saved again when the run finishes.
const MAPPING_SAVE_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "tracegate-anonymizer", about = "Anonymize captured spans")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read a span capture, write captured/anonymized files and the name
    /// mapping.
    Anonymize(AnonymizeArgs),
    /// Extract one trace from an anonymized capture in UI form.
    Extract(ExtractArgs),
}

#[derive(Args)]
struct AnonymizeArgs {
    /// Capture file with one JSON span per line.
    #[arg(long)]
    input: PathBuf,
    /// Directory for captured.json, anonymized.json and mapping.json.
    #[arg(long)]
    output_dir: PathBuf,
    #[arg(long)]
    hash_standard_tags: bool,
    #[arg(long)]
    hash_custom_tags: bool,
    #[arg(long)]
    hash_logs: bool,
    #[arg(long)]
    hash_process: bool,
    /// Stop after this many spans.
    #[arg(long)]
    max_spans: Option<usize>,
}

#[derive(Args)]
struct ExtractArgs {
    /// The anonymized.json produced by a previous run.
    #[arg(long)]
    input: PathBuf,
    /// Hex trace id to extract.
    #[arg(long)]
    trace_id: String,
    #[arg(long)]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    match Cli::parse().command {
        Command::Anonymize(args) => anonymize(args).await,
        Command::Extract(args) => {
            extractor::extract_trace(&args.input, &args.trace_id, &args.output)
                .context("trace extraction failed")?;
            Ok(())
        }
    }
}

async fn anonymize(args: AnonymizeArgs) -> anyhow::Result<()> {
    std::fs::create_dir_all(&args.output_dir).context("failed to create the output dir")?;
    let mapping = Arc::new(
        Mapping::load_or_default(args.output_dir.join("mapping.json"))
            .context("failed to load the mapping file")?,
    );
    let anonymizer = Anonymizer::new(
        Arc::clone(&mapping),
        Options {
            hash_standard_tags: args.hash_standard_tags,
            hash_custom_tags: args.hash_custom_tags,
            hash_logs: args.hash_logs,
            hash_process: args.hash_process,
        },
    );
    let mut writer = CaptureWriter::create(
        &args.output_dir.join("captured.json"),
        &args.output_dir.join("anonymized.json"),
        args.max_spans,
    )
    .context("failed to create the capture files")?;

    let save_shutdown = CancellationToken::new();
    let save_handle = {
        let mapping = Arc::clone(&mapping);
        let shutdown = save_shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(MAPPING_SAVE_INTERVAL);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = mapping.save() {
                            tracing::error!(error = %err, "failed to persist the mapping");
                        }
                    }
                }
            }
        })
    };

    let mut reader = SpanReader::open(&args.input).context("failed to open the input file")?;
    loop {
        let span = match reader.next_span() {
            Ok(Some(span)) => span,
            Ok(None) => break,
            Err(err) => {
                save_shutdown.cancel();
                return Err(anyhow::Error::from(err).context("failed to read the capture"));
            }
        };
        let anonymized = anonymizer.anonymize_span(&span);
        match writer.write_span(&ui::Span::from_domain(&span), &anonymized) {
            Ok(()) => {}
            Err(WriteError::MaxSpansReached) => {
                tracing::info!(spans = writer.written(), "span limit reached, stopping");
                break;
            }
            Err(err) => {
                save_shutdown.cancel();
                return Err(anyhow::Error::from(err).context("failed to write spans"));
            }
        }
    }

    save_shutdown.cancel();
    let _ = save_handle.await;
    writer.close().context("failed to finalize the capture files")?;
    mapping.save().context("failed to save the mapping")?;
    tracing::info!(spans = writer.written(), "anonymization finished");
    Ok(())
}
