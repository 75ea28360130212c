//! Encoding through `ffmpeg`.
//!
//! The encoder receives the serialized filter graph plus its inputs in a
//! fixed order (background, screenshot, optional overlay video) and streams
//! every line the tool prints on stdout or stderr to a [`ProgressSink`].

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use clipcraft_common::error::EncodeError;
use clipcraft_common::{CancelSignal, ProgressSink};
use clipcraft_model::QualityPreset;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::filter_graph::FilterGraph;
use crate::tool::ToolCommand;

/// Software video codec used for every output.
pub const VIDEO_CODEC: &str = "libx264";

/// Number of trailing stderr lines kept for failure diagnostics.
const STDERR_TAIL_LINES: usize = 20;

/// Encoder parameters derived from a [`QualityPreset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderQuality {
    /// Constant rate factor (quantizer).
    pub crf: u8,
    /// x264 speed profile.
    pub preset: &'static str,
}

/// Fixed preset table.
pub fn map_quality(preset: QualityPreset) -> EncoderQuality {
    match preset {
        QualityPreset::Low => EncoderQuality {
            crf: 28,
            preset: "veryfast",
        },
        QualityPreset::Standard => EncoderQuality {
            crf: 23,
            preset: "fast",
        },
        QualityPreset::High => EncoderQuality {
            crf: 18,
            preset: "slow",
        },
    }
}

/// Everything needed for one encoder invocation.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    /// Input files in graph order: background, screenshot, optional video.
    pub inputs: Vec<PathBuf>,
    pub graph: FilterGraph,
    pub quality: QualityPreset,
    /// Loop the background (first input) indefinitely.
    pub loop_background: bool,
    pub output_path: PathBuf,
}

/// Build the ffmpeg argument list for `job`.
///
/// Order matters: the loop flag applies only to the input that follows it.
pub fn build_encode_args(job: &EncodeJob) -> Vec<OsString> {
    let quality = map_quality(job.quality);
    let mut args: Vec<OsString> = vec!["-y".into()];

    for (index, input) in job.inputs.iter().enumerate() {
        if index == 0 && job.loop_background {
            args.push("-stream_loop".into());
            args.push("-1".into());
        }
        args.push("-i".into());
        args.push(input.as_os_str().to_owned());
    }

    args.push("-filter_complex".into());
    args.push(job.graph.serialize().into());
    args.push("-map".into());
    args.push(format!("[{}]", job.graph.terminal_label()).into());
    args.push("-c:v".into());
    args.push(VIDEO_CODEC.into());
    args.push("-crf".into());
    args.push(quality.crf.to_string().into());
    args.push("-preset".into());
    args.push(quality.preset.into());
    args.push(job.output_path.as_os_str().to_owned());
    args
}

/// A video encoder backend.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Run `job` to completion, forwarding tool output to `progress`.
    /// Resolves to the output path on success.
    async fn encode(
        &self,
        job: &EncodeJob,
        progress: &ProgressSink,
        cancel: &CancelSignal,
    ) -> Result<PathBuf, EncodeError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// [`Encoder`] backed by the `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    tool: ToolCommand,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self::with_tool(ToolCommand::new("ffmpeg"))
    }

    pub fn with_tool(tool: ToolCommand) -> Self {
        Self { tool }
    }

    pub fn tool(&self) -> &ToolCommand {
        &self.tool
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode(
        &self,
        job: &EncodeJob,
        progress: &ProgressSink,
        cancel: &CancelSignal,
    ) -> Result<PathBuf, EncodeError> {
        if cancel.is_cancelled() {
            return Err(EncodeError::Cancelled);
        }

        let args = build_encode_args(job);
        tracing::debug!(args = ?args, "Running ffmpeg");

        let mut child = self
            .tool
            .command()
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EncodeError::SpawnFailure {
                message: e.to_string(),
            })?;

        tracing::info!(
            pid = child.id(),
            inputs = job.inputs.len(),
            output = %job.output_path.display(),
            "ffmpeg process started"
        );

        let stdout = child.stdout.take().ok_or_else(|| EncodeError::Io {
            message: "failed to capture ffmpeg stdout".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| EncodeError::Io {
            message: "failed to capture ffmpeg stderr".to_string(),
        })?;

        // Both pipes are drained concurrently so the child never blocks on a full pipe.
        let stdout_task = tokio::spawn(pump_lines(stdout, progress.clone()));
        let stderr_task = tokio::spawn(pump_lines(stderr, progress.clone()));

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            status = child.wait() => Some(status),
        };

        let Some(status) = status else {
            tracing::info!(pid = child.id(), "Cancelling ffmpeg");
            if let Err(err) = child.kill().await {
                tracing::warn!(error = %err, "Failed to kill ffmpeg");
            }
            stdout_task.abort();
            stderr_task.abort();
            return Err(EncodeError::Cancelled);
        };

        let status = status.map_err(|e| EncodeError::Io {
            message: format!("failed to wait on ffmpeg: {e}"),
        })?;

        let _ = stdout_task.await;
        let stderr_tail = stderr_task.await.unwrap_or_default();

        if !status.success() {
            let stderr_text = Vec::from(stderr_tail).join("\n");
            tracing::warn!(
                exit_code = ?status.code(),
                stderr = %stderr_text,
                "ffmpeg failed"
            );
            return Err(EncodeError::ToolFailure {
                exit_code: status.code(),
            });
        }

        tracing::info!(output = %job.output_path.display(), "ffmpeg finished");
        Ok(job.output_path.clone())
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Read `reader` to EOF, emitting each line to `progress`. Returns the last
/// few lines seen.
async fn pump_lines<R>(mut reader: R, progress: ProgressSink) -> VecDeque<String>
where
    R: AsyncRead + Unpin,
{
    let mut splitter = LineSplitter::default();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    let mut buf = [0u8; 4096];

    let forward = |line: String, tail: &mut VecDeque<String>| {
        progress.emit(line.clone());
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    };

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                for line in splitter.push(&buf[..n]) {
                    forward(line, &mut tail);
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed reading ffmpeg output");
                break;
            }
        }
    }
    if let Some(line) = splitter.finish() {
        forward(line, &mut tail);
    }
    tail
}

/// Incremental line splitter treating both `\n` and `\r` as terminators.
///
/// ffmpeg rewrites its stats line in place with carriage returns, so each
/// refresh becomes its own line. Empty lines are dropped.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    /// Feed a chunk, returning every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                self.flush_into(&mut lines);
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// Flush any unterminated trailing line.
    pub fn finish(&mut self) -> Option<String> {
        let mut lines = Vec::new();
        self.flush_into(&mut lines);
        lines.pop()
    }

    fn flush_into(&mut self, lines: &mut Vec<String>) {
        if self.pending.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.pending).trim_end().to_string();
        self.pending.clear();
        if !line.is_empty() {
            lines.push(line);
        }
    }
}
