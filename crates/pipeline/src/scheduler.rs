//! Periodic pipeline runs.
//!
//! The scheduler is either idle (no timer) or armed (one timer task). All
//! settings changes go through [`Scheduler::update_settings`], which swaps
//! the settings snapshot and re-derives the timer. At most one run is in
//! flight; a tick that fires during a run is skipped and reported.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clipcraft_common::error::{ErrorKind, PipelineResult};
use clipcraft_common::{cancel_pair, CancelHandle, ProgressSink};
use clipcraft_model::AppSettings;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::coordinator::PipelineRunner;

/// Progress line reported for a tick skipped because a run is in flight.
pub const SKIPPED_MESSAGE: &str = "Scheduler: previous run still in progress; skipping this tick";

/// Progress line reported for a tick with no watch URL configured.
pub const NO_TARGET_MESSAGE: &str = "Scheduler: no watchUrl configured; skipping";

/// Failure message for a run whose runner panicked.
pub const PANICKED_MESSAGE: &str = "scheduled run panicked";

/// Timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No timer.
    Idle,
    /// Timer active, firing every `interval`.
    Armed { interval: Duration },
}

/// What a single tick did.
#[derive(Debug)]
pub enum TickOutcome {
    /// A run was started; the handle resolves to its result.
    Started(JoinHandle<PipelineResult>),
    /// A previous run is still in flight.
    Skipped,
    /// No watch URL is configured.
    NoTarget,
}

struct Shared {
    runner: Arc<dyn PipelineRunner>,
    progress: ProgressSink,
    settings: watch::Sender<Arc<AppSettings>>,
    in_flight: AtomicBool,
    /// Cancel handle of the run in flight, if any. Each run gets a fresh one.
    current_run: watch::Sender<Option<CancelHandle>>,
}

/// Clears the run slot when the run finishes, panics included.
struct RunGuard(Arc<Shared>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.current_run.send_replace(None);
        self.0.in_flight.store(false, Ordering::Release);
    }
}

impl Shared {
    fn tick(self: &Arc<Self>) -> TickOutcome {
        let settings = self.settings.borrow().clone();
        let url = match settings.general.watch_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => {
                tracing::info!("Scheduler tick without a target");
                self.progress.emit(NO_TARGET_MESSAGE);
                return TickOutcome::NoTarget;
            }
        };

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Scheduler tick skipped, previous run still in flight");
            self.progress.emit(SKIPPED_MESSAGE);
            return TickOutcome::Skipped;
        }
        let (cancel, signal) = cancel_pair();
        self.current_run.send_replace(Some(cancel));
        let guard = RunGuard(Arc::clone(self));

        let runner = Arc::clone(&self.runner);
        let progress = self.progress.clone();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            progress.emit(format!("Scheduler: ingest {url}"));

            // The run gets its own task so a panic surfaces as a JoinError here.
            let run = tokio::spawn(async move {
                runner.run_target(&url, &settings, &signal).await
            });
            let result = match run.await {
                Ok(result) => result,
                Err(err) if err.is_panic() => {
                    tracing::error!("Scheduled run panicked");
                    PipelineResult::failure(ErrorKind::Internal, PANICKED_MESSAGE)
                }
                Err(_) => PipelineResult::failure(ErrorKind::Cancelled, "scheduled run aborted"),
            };
            match &result {
                PipelineResult::Success { output_path } => {
                    tracing::info!(output = %output_path.display(), "Scheduled run finished");
                }
                PipelineResult::Failure { kind, message } => {
                    tracing::warn!(kind = kind.as_str(), %message, "Scheduled run failed");
                }
            }
            progress.emit(format!("Scheduler: {result}"));
            result
        });
        TickOutcome::Started(handle)
    }

    /// Cancel the run in flight. Later runs are unaffected.
    fn cancel_current(&self) {
        if let Some(cancel) = self.current_run.borrow().as_ref() {
            cancel.cancel();
        }
    }
}

/// Drives the pipeline on a timer derived from [`AppSettings::scheduler`].
pub struct Scheduler {
    shared: Arc<Shared>,
    state: SchedulerState,
    timer: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Create a scheduler and apply `settings`. Must be called inside a
    /// tokio runtime when the settings enable the scheduler.
    pub fn new(
        runner: Arc<dyn PipelineRunner>,
        progress: ProgressSink,
        settings: AppSettings,
    ) -> Self {
        let settings = Arc::new(settings);
        let (settings_tx, _) = watch::channel(Arc::clone(&settings));
        let (current_run, _) = watch::channel(None);
        let mut scheduler = Self {
            shared: Arc::new(Shared {
                runner,
                progress,
                settings: settings_tx,
                in_flight: AtomicBool::new(false),
                current_run,
            }),
            state: SchedulerState::Idle,
            timer: None,
        };
        scheduler.apply(&settings);
        scheduler
    }

    /// Replace the settings snapshot and re-derive the timer.
    ///
    /// A run already in flight keeps the snapshot it started with.
    pub fn update_settings(&mut self, settings: AppSettings) {
        let settings = Arc::new(settings);
        self.shared.settings.send_replace(Arc::clone(&settings));
        self.apply(&settings);
    }

    fn apply(&mut self, settings: &AppSettings) {
        let desired = if settings.scheduler.enabled {
            SchedulerState::Armed {
                interval: settings.scheduler.interval(),
            }
        } else {
            SchedulerState::Idle
        };
        if desired == self.state {
            return;
        }

        self.disarm();
        if let SchedulerState::Armed { interval } = desired {
            self.arm(interval);
        }
        self.state = desired;
    }

    fn arm(&mut self, interval: Duration) {
        tracing::info!(interval_secs = interval.as_secs(), "Scheduler armed");
        self.shared.progress.emit(format!(
            "Scheduler: running every {} minute(s)",
            interval.as_secs() / 60
        ));

        let shared = Arc::clone(&self.shared);
        self.timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                // Each run reports its own outcome.
                let _ = shared.tick();
            }
        }));
    }

    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            tracing::info!("Scheduler disarmed");
            self.shared.progress.emit("Scheduler: stopped");
        }
    }

    /// Fire one tick now, independent of the timer.
    pub fn tick(&self) -> TickOutcome {
        self.shared.tick()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Current settings snapshot.
    pub fn settings(&self) -> Arc<AppSettings> {
        Arc::clone(&self.shared.settings.borrow())
    }

    /// Whether a run is in flight.
    pub fn is_running(&self) -> bool {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Stop the timer and cancel any run in flight. The scheduler can be
    /// re-armed afterwards through [`Scheduler::update_settings`].
    pub fn shutdown(&mut self) {
        self.disarm();
        self.state = SchedulerState::Idle;
        self.shared.cancel_current();
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clipcraft_common::{CancelSignal, ProgressEvent};
    use clipcraft_model::MAX_INTERVAL_MINUTES;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::{broadcast, Notify, Semaphore};

    /// Runner that blocks until released and counts invocations.
    struct GatedRunner {
        calls: AtomicUsize,
        entered: Notify,
        gate: Semaphore,
    }

    impl GatedRunner {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                entered: Notify::new(),
                gate: Semaphore::new(0),
            }
        }

        fn open() -> Self {
            let runner = Self::new();
            runner.gate.add_permits(Semaphore::MAX_PERMITS / 2);
            runner
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PipelineRunner for GatedRunner {
        async fn run_target(
            &self,
            url: &str,
            _settings: &AppSettings,
            cancel: &CancelSignal,
        ) -> PipelineResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            match cancel.guard(self.gate.acquire()).await {
                Some(Ok(permit)) => {
                    permit.forget();
                    PipelineResult::success(PathBuf::from(format!("/out/{url}.mp4")))
                }
                _ => PipelineResult::failure(ErrorKind::Cancelled, "cancelled"),
            }
        }
    }

    fn settings(enabled: bool, minutes: u64, url: Option<&str>) -> AppSettings {
        let mut settings = AppSettings::default();
        settings.scheduler.enabled = enabled;
        settings.scheduler.interval_minutes = minutes;
        settings.general.watch_url = url.map(str::to_string);
        settings
    }

    fn drain(rx: &mut broadcast::Receiver<ProgressEvent>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(event) = rx.try_recv() {
            lines.push(event.text);
        }
        lines
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_skipped() {
        let runner = Arc::new(GatedRunner::new());
        let progress = ProgressSink::new();
        let mut rx = progress.subscribe();
        let scheduler = Scheduler::new(
            runner.clone(),
            progress,
            settings(false, 60, Some("target")),
        );

        let TickOutcome::Started(first) = scheduler.tick() else {
            panic!("first tick should start a run");
        };
        runner.entered.notified().await;
        assert!(scheduler.is_running());

        assert!(matches!(scheduler.tick(), TickOutcome::Skipped));
        assert_eq!(runner.calls(), 1);

        runner.gate.add_permits(1);
        let result = first.await.unwrap();
        assert_eq!(result, PipelineResult::success("/out/target.mp4"));
        assert!(!scheduler.is_running());

        let lines = drain(&mut rx);
        assert_eq!(lines.iter().filter(|l| *l == SKIPPED_MESSAGE).count(), 1);

        // The flag is released, so the next tick runs again.
        runner.gate.add_permits(1);
        let TickOutcome::Started(second) = scheduler.tick() else {
            panic!("tick after completion should start a run");
        };
        assert!(second.await.unwrap().is_success());
        assert_eq!(runner.calls(), 2);
    }

    #[tokio::test]
    async fn test_no_target_is_reported() {
        let runner = Arc::new(GatedRunner::open());
        let progress = ProgressSink::new();
        let mut rx = progress.subscribe();
        let scheduler = Scheduler::new(runner.clone(), progress, settings(false, 60, Some("  ")));

        assert!(matches!(scheduler.tick(), TickOutcome::NoTarget));
        assert_eq!(runner.calls(), 0);
        assert_eq!(drain(&mut rx), vec![NO_TARGET_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let runner = Arc::new(GatedRunner::open());
        let mut scheduler = Scheduler::new(runner, ProgressSink::new(), settings(false, 60, None));
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        scheduler.update_settings(settings(true, 30, None));
        assert_eq!(
            scheduler.state(),
            SchedulerState::Armed {
                interval: Duration::from_secs(30 * 60)
            }
        );

        scheduler.update_settings(settings(true, 5, None));
        assert_eq!(
            scheduler.state(),
            SchedulerState::Armed {
                interval: Duration::from_secs(5 * 60)
            }
        );
        assert_eq!(scheduler.settings().scheduler.interval_minutes, 5);

        // Zero minutes is clamped to one.
        scheduler.update_settings(settings(true, 0, None));
        assert_eq!(
            scheduler.state(),
            SchedulerState::Armed {
                interval: Duration::from_secs(60)
            }
        );

        scheduler.update_settings(settings(false, 5, None));
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_armed_timer_fires_each_interval() {
        let runner = Arc::new(GatedRunner::open());
        let scheduler = Scheduler::new(
            runner.clone(),
            ProgressSink::new(),
            settings(true, 1, Some("target")),
        );

        tokio::time::timeout(Duration::from_secs(61), runner.entered.notified())
            .await
            .expect("first tick within one interval");
        tokio::time::timeout(Duration::from_secs(61), runner.entered.notified())
            .await
            .expect("second tick within the next interval");
        assert_eq!(runner.calls(), 2);
        drop(scheduler);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabling_stops_the_timer() {
        let runner = Arc::new(GatedRunner::open());
        let mut scheduler = Scheduler::new(
            runner.clone(),
            ProgressSink::new(),
            settings(true, 1, Some("target")),
        );
        scheduler.update_settings(settings(false, 1, Some("target")));

        tokio::time::sleep(Duration::from_secs(10 * 60)).await;
        assert_eq!(runner.calls(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_in_flight_run() {
        let runner = Arc::new(GatedRunner::new());
        let mut scheduler = Scheduler::new(
            runner.clone(),
            ProgressSink::new(),
            settings(true, 60, Some("target")),
        );
        let TickOutcome::Started(run) = scheduler.tick() else {
            panic!("tick should start a run");
        };
        runner.entered.notified().await;

        scheduler.shutdown();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        let result = run.await.unwrap();
        assert!(matches!(
            result,
            PipelineResult::Failure {
                kind: ErrorKind::Cancelled,
                ..
            }
        ));
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_rearm_after_shutdown_runs_normally() {
        let runner = Arc::new(GatedRunner::new());
        let mut scheduler = Scheduler::new(
            runner.clone(),
            ProgressSink::new(),
            settings(true, 60, Some("target")),
        );
        scheduler.shutdown();
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        scheduler.update_settings(settings(true, 60, Some("target")));
        assert!(matches!(scheduler.state(), SchedulerState::Armed { .. }));

        runner.gate.add_permits(1);
        let TickOutcome::Started(run) = scheduler.tick() else {
            panic!("tick should start a run");
        };
        assert_eq!(run.await.unwrap(), PipelineResult::success("/out/target.mp4"));
    }

    #[tokio::test]
    async fn test_shutdown_only_cancels_the_current_run() {
        let runner = Arc::new(GatedRunner::new());
        let mut scheduler = Scheduler::new(
            runner.clone(),
            ProgressSink::new(),
            settings(false, 60, Some("target")),
        );
        let TickOutcome::Started(first) = scheduler.tick() else {
            panic!("tick should start a run");
        };
        runner.entered.notified().await;
        scheduler.shutdown();
        assert!(!first.await.unwrap().is_success());

        runner.gate.add_permits(1);
        let TickOutcome::Started(second) = scheduler.tick() else {
            panic!("tick after shutdown should start a run");
        };
        assert!(second.await.unwrap().is_success());
    }

    struct PanickingRunner;

    #[async_trait]
    impl PipelineRunner for PanickingRunner {
        async fn run_target(
            &self,
            _url: &str,
            _settings: &AppSettings,
            _cancel: &CancelSignal,
        ) -> PipelineResult {
            panic!("runner blew up");
        }
    }

    #[tokio::test]
    async fn test_panicking_run_is_reported() {
        let progress = ProgressSink::new();
        let mut rx = progress.subscribe();
        let scheduler = Scheduler::new(
            Arc::new(PanickingRunner),
            progress,
            settings(false, 60, Some("target")),
        );

        let TickOutcome::Started(run) = scheduler.tick() else {
            panic!("tick should start a run");
        };
        let result = run.await.unwrap();
        assert_eq!(
            result,
            PipelineResult::failure(ErrorKind::Internal, PANICKED_MESSAGE)
        );
        assert!(!scheduler.is_running());

        let lines = drain(&mut rx);
        assert_eq!(
            lines.last().map(String::as_str),
            Some("Scheduler: failed (internal): scheduled run panicked")
        );

        // The slot is free again.
        assert!(matches!(scheduler.tick(), TickOutcome::Started(_)));
    }

    #[tokio::test]
    async fn test_huge_interval_is_capped() {
        let runner = Arc::new(GatedRunner::open());
        let scheduler = Scheduler::new(
            runner,
            ProgressSink::new(),
            settings(true, u64::MAX, Some("target")),
        );
        assert_eq!(
            scheduler.state(),
            SchedulerState::Armed {
                interval: Duration::from_secs(MAX_INTERVAL_MINUTES * 60)
            }
        );
    }
}
