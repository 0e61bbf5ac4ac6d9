use clap::Parser;
use core::time::Duration;
use docparse_dispatch::dispatch::{self, Target};
use docparse_dispatch::discover;
use docparse_dispatch::result::{Job, persist_results};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "docparse-dispatch")]
#[command(version)]
#[command(about = "Dispatches a batch of documents to the parsing tier")]
struct Args {
    /// Prefix naming this batch; the result file is named after it
    #[arg(long, env = "DOCPARSE_PREFIX", default_value = "part_0")]
    prefix: String,

    /// Root directory scanned recursively for input PDFs
    #[arg(long, env = "DOCPARSE_INPUT_DIR")]
    input_dir: PathBuf,

    /// Maximal number of concurrent job submissions
    #[arg(long, env = "DOCPARSE_N_JOBS", default_value_t = 8)]
    n_jobs: usize,

    /// Host address of the processing tier
    #[arg(long, env = "DOCPARSE_HOST", default_value = "localhost")]
    host: String,

    /// Port of the processing tier
    #[arg(long, env = "DOCPARSE_PORT", default_value_t = 8000)]
    port: u16,

    /// Directory the aggregated result file is written to
    #[arg(long, env = "DOCPARSE_SAVE_DIR", default_value = "process_data")]
    save_dir: PathBuf,

    /// Readiness probe attempts before giving up
    #[arg(long, default_value_t = 10)]
    max_attempts: usize,

    /// Seconds between readiness probe attempts
    #[arg(long, default_value_t = 10)]
    retry_delay_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let files = discover::find_documents(&args.input_dir)?;
    tracing::info!("Found {} PDF files", files.len());

    let jobs: Vec<Job> = files.into_iter().map(Job::new).collect();

    let target = Target {
        host: args.host,
        port: args.port,
        max_attempts: args.max_attempts,
        retry_delay: Duration::from_secs(args.retry_delay_secs),
    };

    let results = dispatch::run(jobs, &target, args.n_jobs).await?;

    let failed = results.iter().filter(|r| r.is_failed()).count();
    tracing::info!(
        "Batch complete: {} jobs, {} failed",
        results.len(),
        failed
    );

    let path = persist_results(&results, &args.save_dir, &args.prefix)?;
    tracing::info!("Saved results to {}", path.display());

    Ok(())
}
