//! Run the scheduler until interrupted.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clipcraft_common::config::SettingsStore;
use clipcraft_common::ProgressSink;
use clipcraft_model::AppSettings;
use clipcraft_pipeline::{PipelineCoordinator, Scheduler, SchedulerState};

use super::spawn_progress_printer;

pub async fn run(
    store: SettingsStore,
    settings: AppSettings,
    base_dir: PathBuf,
    reload_secs: u64,
) -> anyhow::Result<()> {
    let progress = ProgressSink::new();
    let printer = spawn_progress_printer(&progress, std::io::stdout());
    let coordinator = Arc::new(PipelineCoordinator::new(base_dir, progress.clone()));
    let mut scheduler = Scheduler::new(coordinator, progress.clone(), settings);

    if scheduler.state() == SchedulerState::Idle {
        println!(
            "Scheduler is disabled in {}; waiting for it to be enabled.",
            store.path().display()
        );
    }
    println!("Press Ctrl-C to stop.");

    let mut reload = tokio::time::interval(Duration::from_secs(reload_secs.max(1)));
    reload.tick().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = reload.tick() => {
                let latest = store.load();
                if latest != *scheduler.settings() {
                    tracing::info!(config = %store.path().display(), "Config changed, applying");
                    scheduler.update_settings(latest);
                }
            }
        }
    }

    println!("Stopping scheduler...");
    scheduler.shutdown();
    drop(scheduler);
    drop(progress);
    // In-flight runs may still hold the sink briefly while they wind down.
    let _ = tokio::time::timeout(Duration::from_secs(10), printer).await;
    Ok(())
}
