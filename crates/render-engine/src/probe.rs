//! Media dimension probing through `ffprobe`.

use std::ffi::OsString;
use std::path::Path;

use async_trait::async_trait;
use clipcraft_common::error::ProbeError;
use clipcraft_model::Dimensions;
use serde::Deserialize;

use crate::tool::ToolCommand;

/// Something that can report the pixel dimensions of a media file.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Dimensions of the first video stream in `path`.
    async fn probe(&self, path: &Path) -> Result<Dimensions, ProbeError>;
}

/// [`MediaProbe`] backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    tool: ToolCommand,
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new()
    }
}

impl FfprobeProber {
    pub fn new() -> Self {
        Self::with_tool(ToolCommand::new("ffprobe"))
    }

    pub fn with_tool(tool: ToolCommand) -> Self {
        Self { tool }
    }

    pub fn tool(&self) -> &ToolCommand {
        &self.tool
    }
}

/// Arguments selecting the first video stream's width and height as JSON.
pub fn probe_args(path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-v",
        "error",
        "-select_streams",
        "v:0",
        "-show_entries",
        "stream=width,height",
        "-of",
        "json",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    args.push(path.as_os_str().to_owned());
    args
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: u32,
    height: u32,
}

/// Interpret ffprobe's JSON output for `path`.
pub fn parse_probe_output(path: &Path, stdout: &str) -> Result<Dimensions, ProbeError> {
    let output: ProbeOutput =
        serde_json::from_str(stdout).map_err(|e| ProbeError::ParseFailure {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    output
        .streams
        .first()
        .map(|stream| Dimensions::new(stream.width, stream.height))
        .ok_or_else(|| ProbeError::NoStream {
            path: path.to_path_buf(),
        })
}

#[async_trait]
impl MediaProbe for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<Dimensions, ProbeError> {
        tracing::debug!(path = %path.display(), "Probing media dimensions");
        let output = self
            .tool
            .command()
            .args(probe_args(path))
            .output()
            .await
            .map_err(|e| ProbeError::SpawnFailure {
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ProbeError::ToolFailure {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let dims = parse_probe_output(path, &stdout)?;
        tracing::debug!(path = %path.display(), %dims, "Probed media");
        Ok(dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_probe_args_shape() {
        let args = probe_args(Path::new("/media/bg.mp4"));
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height",
                "-of",
                "json",
                "/media/bg.mp4"
            ]
        );
    }

    #[test]
    fn test_parse_first_stream() {
        let json = r#"{"programs":[],"streams":[{"width":1920,"height":1080},{"width":640,"height":360}]}"#;
        let dims = parse_probe_output(Path::new("a.mp4"), json).unwrap();
        assert_eq!(dims, Dimensions::new(1920, 1080));
    }

    #[test]
    fn test_parse_empty_streams() {
        for json in [r#"{"streams":[]}"#, "{}"] {
            let err = parse_probe_output(Path::new("a.png"), json).unwrap_err();
            assert_eq!(
                err,
                ProbeError::NoStream {
                    path: PathBuf::from("a.png")
                }
            );
        }
    }

    #[test]
    fn test_parse_garbage() {
        let err = parse_probe_output(Path::new("a.mp4"), "not json").unwrap_err();
        assert!(matches!(err, ProbeError::ParseFailure { .. }));
    }

    #[cfg(unix)]
    mod process {
        use super::*;

        fn script_prober(dir: &tempfile::TempDir, body: &str) -> FfprobeProber {
            let script = dir.path().join("ffprobe.sh");
            std::fs::write(&script, body).unwrap();
            FfprobeProber::with_tool(ToolCommand::new("sh").with_leading_args([script]))
        }

        #[tokio::test]
        async fn test_probe_success() {
            let dir = tempfile::tempdir().unwrap();
            let prober = script_prober(
                &dir,
                r#"printf '{"streams":[{"width":800,"height":600}]}'"#,
            );
            let dims = prober.probe(Path::new("shot.png")).await.unwrap();
            assert_eq!(dims, Dimensions::new(800, 600));
        }

        #[tokio::test]
        async fn test_probe_receives_path_last() {
            let dir = tempfile::tempdir().unwrap();
            let prober = script_prober(
                &dir,
                r#"for last; do :; done; [ "$last" = "/in/clip.mp4" ] || exit 9
printf '{"streams":[{"width":1,"height":2}]}'"#,
            );
            assert_eq!(
                prober.probe(Path::new("/in/clip.mp4")).await.unwrap(),
                Dimensions::new(1, 2)
            );
        }

        #[tokio::test]
        async fn test_probe_tool_failure_carries_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let prober = script_prober(&dir, "echo 'No such file' >&2; exit 1");
            let err = prober.probe(Path::new("missing.mp4")).await.unwrap_err();
            match err {
                ProbeError::ToolFailure { exit_code, stderr } => {
                    assert_eq!(exit_code, Some(1));
                    assert!(stderr.contains("No such file"));
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_probe_no_stream_and_parse_failure() {
            let dir = tempfile::tempdir().unwrap();
            let prober = script_prober(&dir, r#"printf '{"streams":[]}'"#);
            assert!(matches!(
                prober.probe(Path::new("a.mp3")).await,
                Err(ProbeError::NoStream { .. })
            ));

            let prober = script_prober(&dir, "echo garbage");
            assert!(matches!(
                prober.probe(Path::new("a.mp4")).await,
                Err(ProbeError::ParseFailure { .. })
            ));
        }

        #[tokio::test]
        async fn test_probe_spawn_failure() {
            let prober =
                FfprobeProber::with_tool(ToolCommand::new("/nonexistent/clipcraft-ffprobe"));
            assert!(matches!(
                prober.probe(Path::new("a.mp4")).await,
                Err(ProbeError::SpawnFailure { .. })
            ));
        }
    }
}
