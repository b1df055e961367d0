//! toc-orchestrator: build tables of contents for every PDF in a directory.
//!
//! Usage:
//!   toc-orchestrator --input papers/ --output out/
//!   toc-orchestrator --input papers/ --output out/ --jobs 4 --chunk-size 6000

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use paper_chunker::{parse_backend, PdfBackend};
use toc_service::config::{ConfigOverrides, PipelineConfig};
use toc_service::{BatchReport, FileStatus, ProgressEvent, ServiceError, TocService};
use tracing::{error, info};

/// Extract a table of contents from each PDF with a language model.
#[derive(Parser, Debug)]
#[command(name = "toc-orchestrator", version)]
struct Args {
    /// Directory containing the PDFs (default: INPUT_DIR or data/input).
    #[arg(long)]
    input: Option<PathBuf>,

    /// Directory receiving one folder per document (default: OUTPUT_DIR or data/output).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Chat model id (default: OPENAI_MODEL or gpt-4-turbo-preview).
    #[arg(long)]
    model: Option<String>,

    /// Maximum chunk size in characters.
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Characters repeated between consecutive chunks (at most half the chunk size).
    #[arg(long)]
    chunk_overlap: Option<usize>,

    /// Per-request timeout for model calls.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Documents processed in parallel.
    #[arg(long)]
    jobs: Option<usize>,

    /// Pages two equal titles may differ by and still count as one entry.
    #[arg(long)]
    page_tolerance: Option<u32>,

    /// Password for encrypted PDFs.
    #[arg(long)]
    password: Option<String>,

    /// PDF reader backend: pure-pdf or pdfium.
    #[arg(long, value_parser = backend_arg)]
    backend: Option<PdfBackend>,

    /// Keep text in content-stream order instead of sorting top to bottom.
    #[arg(long)]
    keep_stream_order: bool,

    /// Skip table_of_contents.md.
    #[arg(long)]
    no_markdown: bool,

    /// Skip summary.json.
    #[arg(long)]
    no_summary: bool,

    /// Skip documents.json.
    #[arg(long)]
    no_documents: bool,

    /// API key (default: OPENAI_API_KEY).
    #[arg(long)]
    api_key: Option<String>,

    /// Base URL of an OpenAI-compatible server.
    #[arg(long)]
    base_url: Option<String>,
}

fn backend_arg(s: &str) -> Result<PdfBackend, String> {
    parse_backend(s).ok_or_else(|| format!("unknown backend '{s}' (expected pure-pdf or pdfium)"))
}

impl From<Args> for ConfigOverrides {
    fn from(a: Args) -> Self {
        ConfigOverrides {
            input_dir: a.input,
            output_dir: a.output,
            api_key: a.api_key,
            model: a.model,
            base_url: a.base_url,
            chunk_size: a.chunk_size,
            chunk_overlap: a.chunk_overlap,
            timeout_secs: a.timeout_secs,
            page_tolerance: a.page_tolerance,
            jobs: a.jobs,
            password: a.password,
            backend: a.backend,
            keep_stream_order: a.keep_stream_order,
            no_markdown: a.no_markdown,
            no_summary: a.no_summary,
            no_documents: a.no_documents,
        }
    }
}

const EXIT_FAILURES: u8 = 1;
const EXIT_CONFIG: u8 = 2;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_FAILURES)
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let cfg = match PipelineConfig::from_env(args.into()) {
        Ok(cfg) => cfg,
        Err(err) => return Ok(config_failure(&err)),
    };
    let service = match TocService::new(cfg) {
        Ok(svc) => svc,
        Err(err) => return Ok(config_failure(&err)),
    };
    let cfg = service.config();
    info!(
        input = %cfg.input_dir.display(),
        output = %cfg.output_dir.display(),
        model = %service.model_id(),
        chunk_size = cfg.chunk.max_size(),
        chunk_overlap = cfg.chunk.overlap(),
        jobs = cfg.jobs,
        "starting"
    );

    let report = match service.run_batch(Some(&print_progress)) {
        Ok(report) => report,
        Err(err @ ServiceError::Configuration(_)) => return Ok(config_failure(&err)),
        Err(err) => return Err(err.into()),
    };
    print_summary(&report);

    Ok(if report.all_succeeded() { ExitCode::SUCCESS } else { ExitCode::from(EXIT_FAILURES) })
}

fn config_failure(err: &dyn std::fmt::Display) -> ExitCode {
    eprintln!("configuration error: {err}");
    ExitCode::from(EXIT_CONFIG)
}

fn print_progress(event: ProgressEvent) {
    match event {
        ProgressEvent::BatchStart { total_files } => println!("Found {total_files} PDF file(s)"),
        ProgressEvent::DocumentFinished { report } => match report.status {
            FileStatus::Success => {
                let entries = report.entries.unwrap_or_default();
                let skipped = report.skipped_chunks.map(|n| format!(", {n} chunk(s) skipped")).unwrap_or_default();
                println!("[ok]     {} -> {} ({entries} entries{skipped})", report.file, report.document_id);
            }
            FileStatus::Failed => {
                println!("[failed] {}: {}", report.file, report.error.as_deref().unwrap_or("unknown error"));
            }
        },
        ProgressEvent::State { .. } | ProgressEvent::ChunkSkipped { .. } => {}
    }
}

fn print_summary(report: &BatchReport) {
    println!();
    println!("Processed {} file(s): {} succeeded, {} failed", report.results.len(), report.successful(), report.failed());
    for r in report.results.iter().filter(|r| r.status == FileStatus::Failed) {
        println!("  {}: {}", r.file, r.error.as_deref().unwrap_or("unknown error"));
    }
}
