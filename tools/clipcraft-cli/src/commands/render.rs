//! Render the latest post once.

use std::io::Write;
use std::path::PathBuf;

use clipcraft_common::error::PipelineResult;
use clipcraft_common::{cancel_pair, ProgressSink};
use clipcraft_model::AppSettings;
use clipcraft_pipeline::PipelineCoordinator;

use super::spawn_progress_printer;

pub async fn run(
    settings: AppSettings,
    base_dir: PathBuf,
    url: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let url = url
        .or_else(|| settings.general.watch_url.clone())
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("No URL given and no general.watchUrl configured"))?;

    let progress = ProgressSink::new();
    // With --json, stdout carries only the final document.
    let out: Box<dyn Write + Send> = if json {
        Box::new(std::io::stderr())
    } else {
        Box::new(std::io::stdout())
    };
    let printer = spawn_progress_printer(&progress, out);
    let coordinator = PipelineCoordinator::new(base_dir, progress);
    let (cancel, signal) = cancel_pair();

    let result = {
        let run = coordinator.run_target(&url, &settings, &signal);
        tokio::pin!(run);
        tokio::select! {
            result = &mut run => result,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("Interrupted, cancelling...");
                cancel.cancel();
                run.await
            }
        }
    };

    // Closing the channel lets the printer drain and exit.
    drop(coordinator);
    let _ = printer.await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    match result {
        PipelineResult::Success { output_path } => {
            if !json {
                println!("Render complete: {}", output_path.display());
            }
            Ok(())
        }
        PipelineResult::Failure { kind, message } => {
            anyhow::bail!("Render failed ({}): {message}", kind.as_str())
        }
    }
}
