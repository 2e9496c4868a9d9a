use tracing_subscriber::EnvFilter;

use pgit::batch::BatchRunner;
use pgit::cli::{Args, OutputFormat};
use pgit::discovery::discover_repositories;
use pgit::worker::OutputSink;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Diagnostics go to stderr so they never mix with task output on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse_normalized(std::env::args());
    if args.format == OutputFormat::Table {
        println!("pgit v{}", env!("CARGO_PKG_VERSION"));
    }

    let config = args.to_config();
    config.validate()?;

    let repos = discover_repositories(&config.root, &config.exclude)?;
    tracing::info!(
        root = %config.root.display(),
        repositories = repos.len(),
        "Discovered repositories"
    );

    let (output, sink) = OutputSink::stdio();
    let summary = BatchRunner::new(config).run(repos, output).await?;
    // Every handle is gone once the pool has stopped; wait for the last writes.
    // A closed stdout (`pgit status | head`) must not hide the summary or
    // change the exit code.
    if let Err(e) = OutputSink::finish(sink).await {
        tracing::error!(error = %e, "Failed to write command output");
    }

    match args.format {
        OutputFormat::Table => print!("{}", summary),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary.report())?),
    }

    std::process::exit(summary.exit_code());
}
