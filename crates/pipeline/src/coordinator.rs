//! Single-run pipeline coordination.
//!
//! One run: resolve media, probe dimensions, build the filter graph, encode.
//! This is the only place that decides which sub-failures abort the run and
//! which narrow it; currently only a failed overlay video probe is tolerated.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use clipcraft_common::error::{ClipcraftError, ClipcraftResult, PipelineResult};
use clipcraft_common::{CancelSignal, ProgressSink};
use clipcraft_model::{AppSettings, PostData, RenderSettings};
use clipcraft_render_engine::{
    build_filter_graph, EncodeJob, Encoder, FfmpegEncoder, FfprobeProber, MediaProbe, STAGE_VIDEO,
};

use crate::download::{default_download_dir, download_destination, Downloader, HttpDownloader};
use crate::ingest::{mock_asset_dir, provider_for, IngestProvider};

/// Anything that can run the pipeline for a watch URL.
#[async_trait]
pub trait PipelineRunner: Send + Sync {
    async fn run_target(
        &self,
        url: &str,
        settings: &AppSettings,
        cancel: &CancelSignal,
    ) -> PipelineResult;
}

/// Background clip to use for `render`, falling back to the bundled one.
pub fn resolve_background(render: &RenderSettings, base_dir: &Path) -> PathBuf {
    if render.background_video_path.as_os_str().is_empty() {
        mock_asset_dir(base_dir).join("short.mp4")
    } else {
        render.background_video_path.clone()
    }
}

/// Timestamped output file inside `dir`.
pub fn output_file_path(dir: &Path) -> PathBuf {
    dir.join(format!("output_{}.mp4", Utc::now().timestamp_millis()))
}

/// Sequences one pipeline run over pluggable collaborators.
pub struct PipelineCoordinator {
    prober: Arc<dyn MediaProbe>,
    encoder: Arc<dyn Encoder>,
    downloader: Arc<dyn Downloader>,
    ingest: Option<Arc<dyn IngestProvider>>,
    progress: ProgressSink,
    base_dir: PathBuf,
    download_dir: PathBuf,
}

impl PipelineCoordinator {
    /// Coordinator using `ffprobe`, `ffmpeg`, HTTP downloads, and the
    /// provider named in each run's settings. Bundled assets are resolved
    /// relative to `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>, progress: ProgressSink) -> Self {
        Self {
            prober: Arc::new(FfprobeProber::new()),
            encoder: Arc::new(FfmpegEncoder::new()),
            downloader: Arc::new(HttpDownloader::new()),
            ingest: None,
            progress,
            base_dir: base_dir.into(),
            download_dir: default_download_dir(),
        }
    }

    pub fn with_prober(mut self, prober: Arc<dyn MediaProbe>) -> Self {
        self.prober = prober;
        self
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn Encoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_downloader(mut self, downloader: Arc<dyn Downloader>) -> Self {
        self.downloader = downloader;
        self
    }

    /// Always use `provider`, ignoring the ingest section of the settings.
    pub fn with_ingest(mut self, provider: Arc<dyn IngestProvider>) -> Self {
        self.ingest = Some(provider);
        self
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    pub fn progress(&self) -> &ProgressSink {
        &self.progress
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Fetch the latest post for `url` and render it.
    pub async fn run_target(
        &self,
        url: &str,
        settings: &AppSettings,
        cancel: &CancelSignal,
    ) -> PipelineResult {
        let provider = self
            .ingest
            .clone()
            .unwrap_or_else(|| provider_for(&settings.ingest, &self.base_dir));

        self.progress
            .emit(format!("Fetching latest post from {url} ({})", provider.name()));
        let post = match cancel.guard(provider.get_latest_post(url)).await {
            Some(Ok(post)) => post,
            Some(Err(err)) => {
                let err = match err {
                    ClipcraftError::Ingest { .. } => err,
                    other => ClipcraftError::ingest(other.to_string()),
                };
                return self.finish(Err(err));
            }
            None => return self.finish(Err(ClipcraftError::Cancelled)),
        };
        tracing::info!(post_id = %post.id, author = %post.author, "Fetched post");

        self.run(post, settings, cancel).await
    }

    /// Render `post` with `settings`. Never panics or returns an error; every
    /// outcome is reported to the progress sink and returned.
    pub async fn run(
        &self,
        post: PostData,
        settings: &AppSettings,
        cancel: &CancelSignal,
    ) -> PipelineResult {
        let outcome = self.execute(post, settings, cancel).await;
        self.finish(outcome)
    }

    fn finish(&self, outcome: ClipcraftResult<PathBuf>) -> PipelineResult {
        match &outcome {
            Ok(path) => tracing::info!(output = %path.display(), "Pipeline run succeeded"),
            Err(err) => tracing::error!(error = %err, kind = err.kind().as_str(), "Pipeline run failed"),
        }
        let result = PipelineResult::from(outcome);
        self.progress.emit(result.to_string());
        result
    }

    async fn execute(
        &self,
        mut post: PostData,
        settings: &AppSettings,
        cancel: &CancelSignal,
    ) -> ClipcraftResult<PathBuf> {
        if let Some(url) = post.remote_video_url().map(str::to_string) {
            let destination = download_destination(&self.download_dir);
            self.progress.emit(format!(
                "Downloading video from {url} to {}",
                destination.display()
            ));
            let local = cancel
                .guard(self.downloader.download_file(&url, &destination))
                .await
                .ok_or(ClipcraftError::Cancelled)??;
            post.video_path = Some(local.to_string_lossy().into_owned());
        }

        let render = &settings.render;
        let background = resolve_background(render, &self.base_dir);
        let output_dir = &settings.general.output_path;
        tokio::fs::create_dir_all(output_dir).await?;
        let output_path = output_file_path(output_dir);

        let video_path = post.local_video_path();
        self.progress.emit("Probing media dimensions");
        let (background_dims, screenshot_dims, video_dims) = cancel
            .guard(async {
                tokio::join!(
                    self.prober.probe(&background),
                    self.prober.probe(&post.screenshot_path),
                    async {
                        match &video_path {
                            Some(path) => Some(self.prober.probe(path).await),
                            None => None,
                        }
                    },
                )
            })
            .await
            .ok_or(ClipcraftError::Cancelled)?;

        let background_dims = background_dims?;
        let screenshot_dims = screenshot_dims?;
        let video_dims = match video_dims {
            Some(Ok(dims)) => Some(dims),
            Some(Err(err)) => {
                tracing::warn!(error = %err, "Overlay video probe failed, continuing without it");
                self.progress
                    .emit(format!("Skipping overlay video: {err}"));
                None
            }
            None => None,
        };

        let graph = build_filter_graph(
            background_dims,
            screenshot_dims,
            video_dims,
            &post.text,
            render,
        )?;
        tracing::debug!(graph = %graph, "Built filter graph");

        let mut inputs = vec![background, post.screenshot_path.clone()];
        if graph.has_stage(STAGE_VIDEO) {
            if let Some(path) = video_path {
                inputs.push(path);
            }
        }

        let job = EncodeJob {
            inputs,
            graph,
            quality: render.quality_preset,
            loop_background: render.loop_background,
            output_path,
        };

        self.progress.emit(format!(
            "Encoding {} with {} ({} preset)",
            job.output_path.display(),
            self.encoder.name(),
            job.quality.as_str()
        ));
        let output = self.encoder.encode(&job, &self.progress, cancel).await?;
        Ok(output)
    }
}

#[async_trait]
impl PipelineRunner for PipelineCoordinator {
    async fn run_target(
        &self,
        url: &str,
        settings: &AppSettings,
        cancel: &CancelSignal,
    ) -> PipelineResult {
        PipelineCoordinator::run_target(self, url, settings, cancel).await
    }
}
