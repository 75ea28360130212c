//! Ingested post data.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post fetched by an ingest provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostData {
    /// Unique post identifier.
    pub id: String,

    /// Display name of the author.
    pub author: String,

    /// Post body, rendered as the caption.
    pub text: String,

    /// Local path to the captured screenshot image.
    pub screenshot_path: PathBuf,

    /// Attached video, either a local path or a remote URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,

    /// When the post was created.
    pub created_at: DateTime<Utc>,
}

impl PostData {
    /// The attached video URL, if it still points at a remote location.
    pub fn remote_video_url(&self) -> Option<&str> {
        self.video_path.as_deref().filter(|p| is_remote_url(p))
    }

    /// The attached video as a local path, if it is not remote.
    pub fn local_video_path(&self) -> Option<PathBuf> {
        self.video_path
            .as_deref()
            .filter(|p| !p.is_empty() && !is_remote_url(p))
            .map(PathBuf::from)
    }
}

/// Whether a media reference is an `http://` or `https://` URL.
pub fn is_remote_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(video: Option<&str>) -> PostData {
        PostData {
            id: "p1".to_string(),
            author: "someone".to_string(),
            text: "hello".to_string(),
            screenshot_path: PathBuf::from("/tmp/shot.png"),
            video_path: video.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_remote_video_detection() {
        assert_eq!(
            post(Some("https://video.example/a.mp4")).remote_video_url(),
            Some("https://video.example/a.mp4")
        );
        assert_eq!(post(Some("/data/a.mp4")).remote_video_url(), None);
        assert_eq!(post(None).remote_video_url(), None);
    }

    #[test]
    fn test_local_video_path() {
        assert_eq!(
            post(Some("/data/a.mp4")).local_video_path(),
            Some(PathBuf::from("/data/a.mp4"))
        );
        assert_eq!(post(Some("http://x/a.mp4")).local_video_path(), None);
        assert_eq!(post(Some("")).local_video_path(), None);
    }

    #[test]
    fn test_post_json_uses_camel_case() {
        let json = serde_json::to_value(post(None)).unwrap();
        assert!(json.get("screenshotPath").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("videoPath").is_none());
    }
}
