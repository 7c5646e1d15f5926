//! Media classification via container probing.
//!
//! A file counts as media when `ffprobe` can read it and its first stream is
//! audio or video. Anything else — unreadable, unsupported, corrupt, or a
//! container with no usable stream — is `NotMedia`, never an error: per-file
//! validation failures must not take down a batch run.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

/// Classification of a probed file.
///
/// A tagged variant instead of (valid, audio) booleans, so the nonsensical
/// combination "audio but not valid" cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    NotMedia,
    Audio,
    Video,
}

impl MediaKind {
    pub fn is_media(self) -> bool {
        !matches!(self, Self::NotMedia)
    }
}

/// A discovered file classified as processable media.
///
/// Immutable once created; consumed exactly once by the batch runner.
#[derive(Debug, Clone)]
pub struct MediaCandidate {
    pub path: PathBuf,
    pub kind: MediaKind,
}

impl MediaCandidate {
    /// Build a candidate from a classification; `NotMedia` yields `None`.
    pub fn from_classification(path: impl Into<PathBuf>, kind: MediaKind) -> Option<Self> {
        if !kind.is_media() {
            return None;
        }
        Some(Self {
            path: path.into(),
            kind,
        })
    }

    /// Whether the file is audio-only and can skip audio extraction.
    pub fn is_audio(&self) -> bool {
        self.kind == MediaKind::Audio
    }
}

/// Probe a file's container metadata and classify it.
///
/// Probe errors are classification results, not failures.
pub fn classify(path: &Path) -> MediaKind {
    match probe_streams(path) {
        Ok(probe) => kind_from_probe(&probe),
        Err(err) => {
            debug!("probe failed for '{}': {err:#}", path.display());
            MediaKind::NotMedia
        }
    }
}

/// Run `ffprobe` against the file and return its stream listing as JSON.
fn probe_streams(path: &Path) -> Result<Value> {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-show_streams", "-of", "json"])
        .arg(path)
        .output()
        .context("failed to run ffprobe")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "ffprobe exited with {}: {}",
            output.status,
            stderr.trim()
        );
    }

    serde_json::from_slice(&output.stdout).context("ffprobe produced invalid JSON")
}

/// Classify from probe JSON: the first stream's `codec_type` decides.
pub(crate) fn kind_from_probe(probe: &Value) -> MediaKind {
    let Some(first) = probe
        .get("streams")
        .and_then(|s| s.as_array())
        .and_then(|streams| streams.first())
    else {
        return MediaKind::NotMedia;
    };

    match first.get("codec_type").and_then(|t| t.as_str()) {
        Some("audio") => MediaKind::Audio,
        Some("video") => MediaKind::Video,
        _ => MediaKind::NotMedia,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_audio_stream_classifies_as_audio() {
        let probe = json!({ "streams": [{ "codec_type": "audio", "codec_name": "mp3" }] });
        assert_eq!(kind_from_probe(&probe), MediaKind::Audio);
    }

    #[test]
    fn first_video_stream_classifies_as_video() {
        let probe = json!({
            "streams": [
                { "codec_type": "video", "codec_name": "h264" },
                { "codec_type": "audio", "codec_name": "aac" },
            ]
        });
        assert_eq!(kind_from_probe(&probe), MediaKind::Video);
    }

    #[test]
    fn empty_or_missing_streams_are_not_media() {
        assert_eq!(kind_from_probe(&json!({ "streams": [] })), MediaKind::NotMedia);
        assert_eq!(kind_from_probe(&json!({})), MediaKind::NotMedia);
    }

    #[test]
    fn non_av_streams_are_not_media() {
        let probe = json!({ "streams": [{ "codec_type": "data" }] });
        assert_eq!(kind_from_probe(&probe), MediaKind::NotMedia);
    }

    #[test]
    fn candidate_cannot_be_built_from_not_media() {
        assert!(MediaCandidate::from_classification("x.bin", MediaKind::NotMedia).is_none());

        let candidate = MediaCandidate::from_classification("x.mp3", MediaKind::Audio)
            .expect("audio is a candidate");
        assert!(candidate.is_audio());

        let candidate = MediaCandidate::from_classification("x.mkv", MediaKind::Video)
            .expect("video is a candidate");
        assert!(!candidate.is_audio());
    }
}
