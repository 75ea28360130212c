//! Error types shared across ClipCraft crates.
//!
//! Each component reports a narrow error enum. `ClipcraftError` unifies
//! them for propagation, and `PipelineResult` is the terminal value handed
//! back to whichever layer invoked a pipeline run.

use std::fmt;
use std::path::PathBuf;

use clipcraft_model::OverlayPosition;
use serde::{Deserialize, Serialize};

/// Failures while computing overlay geometry or building the filter graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    #[error("zero-size canvas")]
    ZeroSizeCanvas,

    #[error("overlay position '{}' is not implemented", .position.as_str())]
    UnsupportedAnchor { position: OverlayPosition },
}

/// Failures while probing media dimensions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("No video stream found in {}", .path.display())]
    NoStream { path: PathBuf },

    #[error("Failed to parse ffprobe output for {}: {message}", .path.display())]
    ParseFailure { path: PathBuf, message: String },

    #[error("ffprobe exited with {}: {}", exit_label(.exit_code), .stderr.trim())]
    ToolFailure {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to start ffprobe process: {message}")]
    SpawnFailure { message: String },
}

/// Failures while running the encoder.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("ffmpeg exited with {}", exit_label(.exit_code))]
    ToolFailure { exit_code: Option<i32> },

    #[error("Failed to start ffmpeg: {message}")]
    SpawnFailure { message: String },

    #[error("Encoding was cancelled")]
    Cancelled,

    #[error("Encoder I/O error: {message}")]
    Io { message: String },
}

/// Failures while downloading remote media.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DownloadError {
    #[error("Failed to download file: HTTP Status Code {status} ({url})")]
    Status { url: String, status: u16 },

    #[error("Failed to make HTTP request to {url}: {message}")]
    Request { url: String, message: String },

    #[error("Failed to save file {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },
}

/// Top-level error type for ClipCraft operations.
#[derive(Debug, thiserror::Error)]
pub enum ClipcraftError {
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    #[error("Ingest error: {message}")]
    Ingest { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Pipeline run was cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ClipcraftError.
pub type ClipcraftResult<T> = Result<T, ClipcraftError>;

impl ClipcraftError {
    pub fn ingest(msg: impl Into<String>) -> Self {
        Self::Ingest {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Flat classification used in reported failures.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Geometry(_) => ErrorKind::Geometry,
            Self::Probe(_) => ErrorKind::Probe,
            Self::Encode(EncodeError::Cancelled) | Self::Cancelled => ErrorKind::Cancelled,
            Self::Encode(_) => ErrorKind::Encode,
            Self::Download(_) => ErrorKind::Download,
            Self::Ingest { .. } => ErrorKind::Ingest,
            Self::Config { .. } => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
            Self::Json(_) | Self::Other(_) => ErrorKind::Internal,
        }
    }
}

/// Serializable error discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Geometry,
    Probe,
    Encode,
    Download,
    Ingest,
    Config,
    Cancelled,
    Io,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Geometry => "geometry",
            Self::Probe => "probe",
            Self::Encode => "encode",
            Self::Download => "download",
            Self::Ingest => "ingest",
            Self::Config => "config",
            Self::Cancelled => "cancelled",
            Self::Io => "io",
            Self::Internal => "internal",
        }
    }
}

/// Terminal value of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PipelineResult {
    Success {
        #[serde(rename = "outputPath")]
        output_path: PathBuf,
    },
    Failure {
        #[serde(rename = "errorKind")]
        kind: ErrorKind,
        message: String,
    },
}

impl PipelineResult {
    pub fn success(output_path: impl Into<PathBuf>) -> Self {
        Self::Success {
            output_path: output_path.into(),
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn output_path(&self) -> Option<&PathBuf> {
        match self {
            Self::Success { output_path } => Some(output_path),
            Self::Failure { .. } => None,
        }
    }
}

impl From<&ClipcraftError> for PipelineResult {
    fn from(err: &ClipcraftError) -> Self {
        Self::failure(err.kind(), err.to_string())
    }
}

impl From<ClipcraftResult<PathBuf>> for PipelineResult {
    fn from(result: ClipcraftResult<PathBuf>) -> Self {
        match result {
            Ok(path) => Self::success(path),
            Err(err) => Self::from(&err),
        }
    }
}

impl fmt::Display for PipelineResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { output_path } => write!(f, "done -> {}", output_path.display()),
            Self::Failure { kind, message } => write!(f, "failed ({}): {message}", kind.as_str()),
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
