//! blobsize-sim - run the size engine against a simulated account
//!
//! Loads a JSON catalog (container name -> blob records) into the
//! in-memory storage backend and runs the full worker pool over it.
//! Useful for exercising expansion, pagination, retries, and
//! cancellation without a cloud account.
//!
//! ```bash
//! blobsize-sim --catalog demo.json photos logs/2024/
//! blobsize-sim --catalog demo.json -w 4 --page-size 2 --fail-pages 2 ''
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use blobsize::config::{SizeConfig, DEFAULT_WORKERS};
use blobsize::locator::Locator;
use blobsize::progress::{print_header, print_summary, ProgressReporter};
use blobsize::sizer::SizeCoordinator;
use blobsize::storage::MemoryStorage;

/// Compute the aggregate size of simulated blob storage locators
#[derive(Parser, Debug)]
#[command(
    name = "blobsize-sim",
    version,
    about = "Compute the aggregate size of blob-storage locators against a JSON catalog",
    after_help = "EXAMPLES:\n    \
        blobsize-sim --catalog demo.json photos\n    \
        blobsize-sim --catalog demo.json photos/raw/ logs\n    \
        blobsize-sim --catalog demo.json -w 4 --page-size 2 ''"
)]
struct CliArgs {
    /// Locators: 'container/prefix' is concrete, 'container' is a
    /// name-prefix expanded against the whole account
    #[arg(value_name = "LOCATOR", required = true)]
    locators: Vec<String>,

    /// JSON catalog file (container name -> [{name, size}, ...])
    #[arg(short = 'c', long, value_name = "FILE")]
    catalog: PathBuf,

    /// Number of worker threads
    #[arg(short = 'w', long, default_value_t = DEFAULT_WORKERS, value_name = "NUM")]
    workers: usize,

    /// Listing page size for the simulated account
    #[arg(long, value_name = "NUM")]
    page_size: Option<usize>,

    /// Inject this many transient listing failures before succeeding
    #[arg(long, default_value = "0", value_name = "NUM")]
    fail_pages: u32,

    /// Quiet mode - suppress header and summary
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();

    setup_logging(args.verbose)?;

    let config = SizeConfig {
        worker_count: args.workers,
        show_progress: !args.quiet,
        ..SizeConfig::default()
    }
    .validated()
    .context("Invalid configuration")?;

    let mut store = MemoryStorage::from_catalog_file(&args.catalog)
        .with_context(|| format!("Failed to load catalog '{}'", args.catalog.display()))?;
    if let Some(page_size) = args.page_size {
        store = store.with_page_size(page_size);
    }
    store.fail_next(args.fail_pages);

    let catalog_size = std::fs::metadata(&args.catalog).ok().map(|m| m.len());

    let locators: Vec<Locator> = args.locators.iter().map(|s| Locator::parse(s)).collect();

    if config.show_progress {
        print_header(
            &args.catalog.display().to_string(),
            config.worker_count,
            &args.locators,
        );
    }

    let coordinator = SizeCoordinator::new(config.clone(), Arc::new(store));

    // Graceful shutdown: ctrl-c cancels the pool instead of killing the
    // process mid-computation
    let cancel = coordinator.cancel_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, cancelling...");
        cancel.set();
    })
    .context("Failed to set signal handler")?;

    let progress = config.show_progress.then(ProgressReporter::new);
    if let Some(ref p) = progress {
        p.set_status("Listing containers and blobs...");
    }

    let result = coordinator.run(locators);

    match result {
        Ok(report) => {
            if let Some(ref p) = progress {
                p.finish_and_clear();
            }
            if config.show_progress {
                print_summary(&report, &args.catalog.display().to_string(), catalog_size);
            }
            println!("Total size: {}", report.format_total());
            Ok(())
        }
        Err(e) => {
            if let Some(ref p) = progress {
                p.finish("Size computation failed");
            }
            Err(e).context("Size computation failed")
        }
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("blobsize=debug,warn")
    } else {
        EnvFilter::new("blobsize=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
