//! Audio extraction through ffmpeg.
//!
//! The extractor turns any media file into a mono 16 kHz MP3 sized for fast
//! hand-off to the speech engine. The parameter set is declarative
//! ([`ExtractionRequest`]) and fixed where the engine's input contract demands
//! it: changing channels or sample rate degrades transcription quality or
//! breaks the engine outright.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use tracing::{debug, error};

use crate::stopwatch::Stopwatch;

/// Stopwatch label covering each ffmpeg invocation.
pub const EXTRACTION_LABEL: &str = "Audio Extraction";

/// Declarative transcoding parameters for one extraction.
///
/// `Default` carries the engine-facing contract: mono, 16 kHz, VBR MP3 at the
/// highest quality setting, all CPU threads, fast seeking.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Output audio codec.
    pub codec: String,
    /// Output channel count. Fixed at 1 for the speech engine.
    pub channels: u32,
    /// Output sample rate. Fixed at 16 kHz for the speech engine.
    pub sample_rate_hz: u32,
    /// LAME VBR quality (0 = best).
    pub vbr_quality: u32,
    /// Worker threads for ffmpeg; 0 means all available cores.
    pub threads: u32,
    /// Input thread queue size, raised for throughput.
    pub thread_queue_size: u32,
    /// Enable fast seeking on the input.
    pub fast_seek: bool,
}

impl Default for ExtractionRequest {
    fn default() -> Self {
        Self {
            codec: "libmp3lame".to_owned(),
            channels: 1,
            sample_rate_hz: 16_000,
            vbr_quality: 0,
            threads: 0,
            thread_queue_size: 1024,
            fast_seek: true,
        }
    }
}

impl ExtractionRequest {
    /// Full ffmpeg argument list for extracting `source` into `artifact`.
    ///
    /// Input options (seek flags) must precede `-i`; everything after applies
    /// to the output.
    fn command_args(&self, source: &Path, artifact: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-loglevel".into(),
            "error".into(),
        ];

        if self.fast_seek {
            args.push("-fflags".into());
            args.push("+fastseek".into());
        }

        args.push("-i".into());
        args.push(source.into());

        args.push("-acodec".into());
        args.push(self.codec.as_str().into());
        args.push("-ac".into());
        args.push(self.channels.to_string().into());
        args.push("-ar".into());
        args.push(self.sample_rate_hz.to_string().into());
        args.push("-q:a".into());
        args.push(self.vbr_quality.to_string().into());
        args.push("-threads".into());
        args.push(self.threads.to_string().into());
        args.push("-thread_queue_size".into());
        args.push(self.thread_queue_size.to_string().into());

        args.push("-y".into());
        args.push(artifact.into());

        args
    }
}

/// The result of one extraction attempt.
///
/// Both variants carry the derived artifact path: the path is deterministic
/// and known before ffmpeg runs, and callers branch on the variant instead of
/// probing the filesystem to learn whether extraction worked.
#[derive(Debug)]
pub enum ExtractionOutcome {
    Extracted(PathBuf),
    Failed { path: PathBuf, reason: anyhow::Error },
}

impl ExtractionOutcome {
    pub fn artifact_path(&self) -> &Path {
        match self {
            Self::Extracted(path) => path,
            Self::Failed { path, .. } => path,
        }
    }
}

/// Derive the audio artifact path for a source file: `audio-{stem}.mp3`.
pub fn artifact_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .unwrap_or(source.as_os_str())
        .to_string_lossy();
    PathBuf::from(format!("audio-{stem}.mp3"))
}

/// Extract the audio track of `source` into its derived artifact path.
///
/// Never returns an error: failures are logged and reported through
/// [`ExtractionOutcome::Failed`]. The whole invocation is timed under
/// [`EXTRACTION_LABEL`].
pub fn extract_audio(
    source: &Path,
    request: &ExtractionRequest,
    stopwatch: &mut Stopwatch,
) -> ExtractionOutcome {
    stopwatch.start(EXTRACTION_LABEL);
    let artifact = artifact_path(source);
    let result = run_ffmpeg(source, request, &artifact);
    stopwatch.stop(EXTRACTION_LABEL);

    match result {
        Ok(()) => {
            debug!(
                "extracted '{}' -> '{}'",
                source.display(),
                artifact.display()
            );
            ExtractionOutcome::Extracted(artifact)
        }
        Err(reason) => {
            error!(
                "audio extraction failed for '{}': {reason:#}",
                source.display()
            );
            ExtractionOutcome::Failed {
                path: artifact,
                reason,
            }
        }
    }
}

fn run_ffmpeg(source: &Path, request: &ExtractionRequest, artifact: &Path) -> Result<()> {
    let output = Command::new("ffmpeg")
        .args(request.command_args(source, artifact))
        .output()
        .context("failed to run ffmpeg")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("ffmpeg exited with {}: {}", output.status, stderr.trim());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_path_derives_from_source_stem() {
        assert_eq!(
            artifact_path(Path::new("/media/show/episode-01.mkv")),
            PathBuf::from("audio-episode-01.mp3")
        );
        assert_eq!(
            artifact_path(Path::new("talk.mp3")),
            PathBuf::from("audio-talk.mp3")
        );
    }

    #[test]
    fn default_request_matches_engine_input_contract() {
        let request = ExtractionRequest::default();
        assert_eq!(request.channels, 1);
        assert_eq!(request.sample_rate_hz, 16_000);
        assert_eq!(request.codec, "libmp3lame");
    }

    #[test]
    fn command_args_keep_input_options_before_the_input() {
        let request = ExtractionRequest::default();
        let args = request.command_args(Path::new("in.mkv"), Path::new("audio-in.mp3"));

        let pos = |needle: &str| {
            args.iter()
                .position(|a| a == needle)
                .unwrap_or_else(|| panic!("missing arg {needle}"))
        };

        assert!(pos("-fflags") < pos("-i"));
        assert!(pos("-i") < pos("-acodec"));
        assert_eq!(args[pos("-ac") + 1], "1");
        assert_eq!(args[pos("-ar") + 1], "16000");
        assert_eq!(args[pos("-q:a") + 1], "0");
        assert_eq!(args[pos("-thread_queue_size") + 1], "1024");
        assert_eq!(args.last().unwrap(), "audio-in.mp3");
    }

    #[test]
    fn fast_seek_can_be_disabled() {
        let request = ExtractionRequest {
            fast_seek: false,
            ..Default::default()
        };
        let args = request.command_args(Path::new("in.mkv"), Path::new("out.mp3"));
        assert!(!args.iter().any(|a| a == "-fflags"));
    }

    #[test]
    fn failed_outcome_still_carries_the_derived_path() {
        let outcome = ExtractionOutcome::Failed {
            path: artifact_path(Path::new("clip.mkv")),
            reason: anyhow::anyhow!("boom"),
        };
        assert_eq!(outcome.artifact_path(), Path::new("audio-clip.mp3"));
    }
}
