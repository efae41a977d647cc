//! Split command handler.
//!
//! Runs the streaming splitter on a blocking thread while Ctrl-C flips the
//! cancellation flag, so an interrupted run still closes every category file.

use clap::Args;
use kbsplit_core::{config::AppConfig, AppError, AppResult};
use kbsplit_splitter::{
    split_file, ProgressEvent, ProgressReporter, RuleTable, SplitOptions, SplitReport,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Split an input file into one JSON array per category
#[derive(Args, Debug)]
pub struct SplitCommand {
    /// Input file holding a JSON array of documents
    #[arg(env = "KBSPLIT_INPUT")]
    pub input: Option<PathBuf>,

    /// Output directory for `<category>.json` files
    #[arg(short, long, env = "KBSPLIT_OUTPUT_DIR")]
    pub output: Option<PathBuf>,

    /// Read chunk size in bytes
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Do not create files for categories that receive no documents
    #[arg(long)]
    pub skip_empty: bool,

    /// Print progress lines to stderr
    #[arg(long)]
    pub progress: bool,

    /// Output the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl SplitCommand {
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        let config = config.with_overrides(
            self.input.clone(),
            self.output.clone(),
            self.chunk_size,
            self.skip_empty,
            None,
            false,
            false,
        );
        config.validate()?;

        let input = config.require_input()?.to_path_buf();
        let output_dir = config.output_dir.clone();
        let table = RuleTable::from_app_config(&config)?;
        let options = SplitOptions::from_config(&config);

        tracing::info!(
            "Executing split command: {:?} -> {:?} ({} categories)",
            input,
            output_dir,
            table.category_names().len()
        );

        let progress = if self.progress {
            ProgressReporter::new(Arc::new(|event: ProgressEvent| eprintln!("{}", event)))
        } else {
            ProgressReporter::noop()
        };

        let cancel = Arc::new(AtomicBool::new(false));
        let interrupt = cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received; closing category files");
                interrupt.store(true, Ordering::Relaxed);
            }
        });

        let run = tokio::task::spawn_blocking(move || {
            split_file(&input, &output_dir, &table, &options, &progress, &cancel)
        })
        .await;
        watcher.abort();

        let report = run.map_err(|e| AppError::Other(format!("Split task failed: {}", e)))??;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_summary(&report);
        }

        report.check()
    }
}

fn print_summary(report: &SplitReport) {
    for count in &report.categories {
        if !count.created {
            continue;
        }
        if count.dropped > 0 {
            println!(
                "Wrote {} items to {} ({} dropped)",
                count.count, count.location, count.dropped
            );
        } else {
            println!("Wrote {} items to {}", count.count, count.location);
        }
    }

    println!(
        "Processed {} objects ({} classified, {} skipped) from {} bytes in {:.2}s",
        report.objects_extracted,
        report.objects_parsed,
        report.objects_skipped,
        report.bytes_read,
        report.duration_secs
    );

    if let Some(err) = &report.structural_error {
        println!("Input is malformed ({}); the files above hold only the objects before it", err);
    } else if report.cancelled {
        println!("Run was cancelled; the files above hold only the objects read so far");
    }
}
